//! Status comment texts written back to the task.

use tasks::{preview, AgentSummary, DispatchOutcome, DispatchResult, RetryState, PREVIEW_CHARS};

/// Posted before dispatching. Retries carry the attempt number.
pub fn announce(state: RetryState) -> String {
    if state.failures() > 0 {
        format!(
            "Working on it... (attempt {}/{})",
            state.attempt(),
            state.max_retries()
        )
    } else {
        "Working on it...".to_string()
    }
}

pub fn done(summary: &AgentSummary) -> String {
    let mut body = match summary.result.as_deref().map(str::trim) {
        Some(result) if !result.is_empty() => preview(result, PREVIEW_CHARS),
        _ => "Completed.".to_string(),
    };
    if let Some(cost) = summary.cost {
        body.push_str(&format!("\n\nCost: {cost}"));
    }
    format!("Done. Ready for review.\n\n{body}")
}

pub fn retry(attempt: u32, max_retries: u32, details: &str) -> String {
    format!("Failed (attempt {attempt}/{max_retries}). Will retry.\n\n{details}")
}

pub fn give_up(attempts: u32, details: &str) -> String {
    format!("Failed after {attempts} attempts. Giving up.\n\n{details}")
}

/// Why a dispatch failed: exit status or timeout, then previews of stderr and
/// of the agent's own output.
pub fn failure_details(result: &DispatchResult) -> String {
    let mut parts = vec![match &result.outcome {
        DispatchOutcome::Timeout { after } => format!("Timed out after {}s", after.as_secs()),
        DispatchOutcome::FailureExitCode { code: Some(code) } => format!("Exit code {code}"),
        DispatchOutcome::FailureExitCode { code: None } => "Killed by signal".to_string(),
        DispatchOutcome::AgentMissing { program } => format!("'{program}' command not found"),
        DispatchOutcome::Success => "Exit code 0".to_string(),
    }];
    let stderr = result.stderr.trim();
    if !stderr.is_empty() {
        parts.push(format!("stderr: {}", preview(stderr, PREVIEW_CHARS)));
    }
    let output = result
        .summary
        .result
        .as_deref()
        .unwrap_or(result.stdout.as_str())
        .trim();
    if !output.is_empty() {
        parts.push(format!("output: {}", preview(output, PREVIEW_CHARS)));
    }
    parts.join("\n")
}

//! The agent port: one task in, one bounded agent run out.
//!
//! Implementations live in the `agent` crate. The controller only sees
//! [`AgentDispatcher`] and the immutable [`DispatchResult`] it returns.

use std::time::Duration;

use async_trait::async_trait;

use crate::{DispatchError, TaskId, UsdCost};

/// Maximum number of characters of agent output quoted back into a comment.
pub const PREVIEW_CHARS: usize = 500;

/// Everything the dispatcher needs to know about one task.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub task_id: TaskId,
    /// Verbatim task title.
    pub title: String,
    /// Optional task description.
    pub description: Option<String>,
    /// Wall-clock budget for the whole agent run.
    pub timeout: Duration,
}

/// How one dispatch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Exit status 0.
    Success,
    /// Non-zero exit. `code` is `None` when the agent died from a signal.
    FailureExitCode { code: Option<i32> },
    /// The timeout elapsed and the process group was terminated.
    Timeout { after: Duration },
    /// The agent binary could not be found.
    AgentMissing { program: String },
}

/// The machine-readable summary an agent may print on success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentSummary {
    /// Human-readable result text.
    pub result: Option<String>,
    pub cost: Option<UsdCost>,
}

impl AgentSummary {
    pub fn is_empty(&self) -> bool {
        self.result.as_deref().map_or(true, str::is_empty) && self.cost.is_none()
    }
}

/// Result of one dispatch attempt. Created once, consumed once.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub outcome: DispatchOutcome,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
    /// Parsed from `stdout`; empty when absent or malformed.
    pub summary: AgentSummary,
}

impl DispatchResult {
    /// A result for an agent that never ran.
    pub fn agent_missing(program: impl Into<String>) -> Self {
        Self {
            outcome: DispatchOutcome::AgentMissing {
                program: program.into(),
            },
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::ZERO,
            summary: AgentSummary::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, DispatchOutcome::Success)
    }
}

/// Runs the external agent for one task.
///
/// Implementations must bound the run by `request.timeout` and must not leave
/// any process behind when they return, whatever the outcome.
#[async_trait]
pub trait AgentDispatcher: Send + Sync {
    /// Runs the agent to completion, failure or timeout.
    ///
    /// Returns `Err` only when no outcome exists: shutdown interrupted the run,
    /// or the process could not be started or waited on.
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchResult, DispatchError>;
}

/// Truncates `text` to at most `limit` characters, appending `...` when cut.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

use std::io;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nix::sys::signal::Signal;
use tasks::{
    AgentDispatcher, DispatchError, DispatchOutcome, DispatchRequest, DispatchResult,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::command::{build_command, build_prompt};
use crate::output::{capture, parse_summary, Captured, ProgressReporter};
use crate::process::{wait_bounded, Exit, GroupGuard, ProcessGroup};
use crate::AgentSettings;

/// How long to wait for the output readers once the group is gone.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs the agent CLI for one task at a time.
#[derive(Debug, Clone)]
pub struct ClaudeDispatcher {
    settings: AgentSettings,
    shutdown: CancellationToken,
}

impl ClaudeDispatcher {
    /// `shutdown` interrupts an in-flight run; the child group is torn down
    /// before [`AgentDispatcher::dispatch`] returns.
    pub fn new(settings: AgentSettings, shutdown: CancellationToken) -> Self {
        Self { settings, shutdown }
    }
}

#[async_trait]
impl AgentDispatcher for ClaudeDispatcher {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchResult, DispatchError> {
        if self.shutdown.is_cancelled() {
            return Err(DispatchError::Interrupted);
        }
        let settings = &self.settings;
        let prompt = build_prompt(&request.title, request.description.as_deref());
        let mut command = build_command(settings, &prompt);

        info!(
            program = %settings.program,
            timeout_s = request.timeout.as_secs(),
            "Dispatching to agent"
        );
        let started = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                error!(program = %settings.program, "Agent executable not found");
                return Ok(DispatchResult::agent_missing(settings.program.clone()));
            }
            Err(e) => {
                return Err(DispatchError::Spawn {
                    program: settings.program.clone(),
                    message: e.to_string(),
                })
            }
        };
        let group = ProcessGroup::of(&child)
            .ok_or_else(|| DispatchError::Io("agent exited before its pid was read".into()))?;
        let _guard = GroupGuard::new(group);

        let mut reporter = settings
            .stream_progress
            .then(|| ProgressReporter::new(&settings.workdir));
        let stdout = tokio::spawn(
            capture(child.stdout.take(), settings.output_limit, move |line| {
                if let Some(reporter) = reporter.as_mut() {
                    reporter.observe(line);
                }
            })
            .instrument(Span::current()),
        );
        let stderr = tokio::spawn(capture(child.stderr.take(), settings.output_limit, |_| {}));

        let exit = wait_bounded(
            &mut child,
            group,
            request.timeout,
            settings.kill_grace,
            &self.shutdown,
        )
        .await
        .map_err(|e| DispatchError::Io(e.to_string()))?;

        // Descendants that outlived the leader still hold the pipes open.
        group.signal(Signal::SIGKILL);
        let stdout = drain("stdout", stdout).await;
        let stderr = drain("stderr", stderr).await;
        let elapsed = started.elapsed();

        let outcome = match exit {
            Exit::Exited(status) if status.success() => DispatchOutcome::Success,
            Exit::Exited(status) => DispatchOutcome::FailureExitCode {
                code: status.code(),
            },
            Exit::TimedOut => DispatchOutcome::Timeout {
                after: request.timeout,
            },
            Exit::Interrupted => {
                warn!(elapsed_ms = elapsed.as_millis() as u64, "Agent interrupted by shutdown");
                return Err(DispatchError::Interrupted);
            }
        };
        let summary = parse_summary(&stdout.text);
        debug!(
            ?outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            stdout_bytes = stdout.text.len(),
            stderr_bytes = stderr.text.len(),
            "Agent finished"
        );

        Ok(DispatchResult {
            outcome,
            stdout: stdout.text,
            stderr: stderr.text,
            elapsed,
            summary,
        })
    }
}

async fn drain(stream: &'static str, mut reader: JoinHandle<io::Result<Captured>>) -> Captured {
    match tokio::time::timeout(DRAIN_TIMEOUT, &mut reader).await {
        Ok(Ok(Ok(captured))) => {
            if captured.truncated {
                warn!(stream, "Agent output exceeded the capture limit and was truncated");
            }
            captured
        }
        Ok(Ok(Err(e))) => {
            warn!(stream, error = %e, "Failed to read agent output");
            Captured::default()
        }
        Ok(Err(e)) => {
            warn!(stream, error = %e, "Agent output reader panicked");
            Captured::default()
        }
        Err(_) => {
            reader.abort();
            warn!(stream, "Agent output still open after the process group was killed");
            Captured::default()
        }
    }
}

use std::sync::Arc;

use tasks::{
    AgentDispatcher, DispatchOutcome, DispatchRequest, Eligibility, FailureDisposition,
    PollCycleId, ProjectId, RetryState, StoreError, StoreErrorKind, Task, TaskId, TaskStore,
    WorkerConfig, WorkerError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::comments;

/// Everything a poll cycle needs, passed explicitly.
#[derive(Clone)]
pub struct WorkerContext {
    pub store: Arc<dyn TaskStore>,
    pub dispatcher: Arc<dyn AgentDispatcher>,
    pub config: WorkerConfig,
    /// Resolved once at startup from `config.project`.
    pub project: ProjectId,
    pub shutdown: CancellationToken,
}

/// Tally of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: PollCycleId,
    /// Tasks selected for dispatch.
    pub eligible: usize,
    /// Open tasks filtered out as done, failed or exhausted.
    pub skipped: usize,
    pub succeeded: usize,
    pub retried: usize,
    pub given_up: usize,
    /// Tasks deleted in the store while being processed.
    pub vanished: usize,
    /// Shutdown was requested before every eligible task ran.
    pub interrupted: bool,
}

impl CycleReport {
    fn new(cycle: PollCycleId) -> Self {
        Self {
            cycle,
            eligible: 0,
            skipped: 0,
            succeeded: 0,
            retried: 0,
            given_up: 0,
            vanished: 0,
            interrupted: false,
        }
    }

    /// At least one dispatch failed, whether it will be retried or not.
    pub fn any_failed(&self) -> bool {
        self.retried > 0 || self.given_up > 0
    }
}

/// What happened to one dispatched task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Succeeded,
    Retrying { attempt: u32 },
    GaveUp { attempts: u32 },
    Vanished,
}

/// Runs poll cycles against one project.
pub struct Controller {
    ctx: WorkerContext,
}

impl Controller {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Fetches open tasks and processes every eligible one in store order.
    ///
    /// # Errors
    ///
    /// - [`WorkerError::Store`] when listing fails, or a label write fails for
    ///   any reason other than the task having been deleted.
    /// - [`WorkerError::AgentMissing`] as soon as the agent cannot be found;
    ///   no further tasks are attempted.
    /// - [`WorkerError::Interrupted`] when shutdown arrives mid-dispatch.
    pub async fn run_cycle(&self) -> Result<CycleReport, WorkerError> {
        let cycle = PollCycleId::new_random();
        let span = info_span!("poll_cycle", %cycle, project = %self.ctx.config.project);
        self.run_cycle_inner(cycle).instrument(span).await
    }

    async fn run_cycle_inner(&self, cycle: PollCycleId) -> Result<CycleReport, WorkerError> {
        let config = &self.ctx.config;
        let mut report = CycleReport::new(cycle);

        let open = self.ctx.store.list_open_tasks(&self.ctx.project).await?;
        let mut eligible = Vec::new();
        for task in open {
            match config.labels.classify(&task.labels, config.max_retries) {
                Eligibility::Eligible(state) => eligible.push((task, state)),
                other => {
                    debug!(task_id = %task.id, status = ?other, "Skipping task");
                    report.skipped += 1;
                }
            }
        }
        report.eligible = eligible.len();

        if eligible.is_empty() {
            info!("No pending tasks.");
            return Ok(report);
        }
        info!(count = eligible.len(), "Found pending tasks");

        for (task, state) in &eligible {
            if self.ctx.shutdown.is_cancelled() {
                info!("Shutdown requested, leaving remaining tasks for the next run");
                report.interrupted = true;
                break;
            }
            let span = info_span!("task", task_id = %task.id);
            match self.process(task, *state).instrument(span).await? {
                TaskOutcome::Succeeded => report.succeeded += 1,
                TaskOutcome::Retrying { .. } => report.retried += 1,
                TaskOutcome::GaveUp { .. } => report.given_up += 1,
                TaskOutcome::Vanished => report.vanished += 1,
            }
        }

        info!(
            succeeded = report.succeeded,
            retried = report.retried,
            given_up = report.given_up,
            "Poll cycle finished"
        );
        Ok(report)
    }

    async fn process(&self, task: &Task, state: RetryState) -> Result<TaskOutcome, WorkerError> {
        let store = &self.ctx.store;
        let config = &self.ctx.config;

        info!(title = %task.title, attempt = state.attempt(), max = state.max_retries(), "Task");
        store
            .comment_best_effort(&task.id, &comments::announce(state))
            .await;

        let request = DispatchRequest {
            task_id: task.id.clone(),
            title: task.title.clone(),
            description: task.context().map(str::to_string),
            timeout: config.task_timeout,
        };
        let result = self.ctx.dispatcher.dispatch(&request).await?;

        match &result.outcome {
            DispatchOutcome::AgentMissing { program } => {
                return Err(WorkerError::AgentMissing {
                    program: program.clone(),
                })
            }
            DispatchOutcome::Success => {
                info!(elapsed_ms = result.elapsed.as_millis() as u64, "Done. Left open for review");
                store
                    .comment_best_effort(&task.id, &comments::done(&result.summary))
                    .await;
                let labels = config.labels.mark_done(&task.labels);
                if !self.write_labels(&task.id, &labels).await? {
                    return Ok(TaskOutcome::Vanished);
                }
                if config.close_on_success {
                    self.close(&task.id).await?;
                }
                return Ok(TaskOutcome::Succeeded);
            }
            DispatchOutcome::FailureExitCode { .. } | DispatchOutcome::Timeout { .. } => {}
        }

        let details = comments::failure_details(&result);
        let (text, labels, outcome) = match state.after_failure() {
            FailureDisposition::Retry { attempt } => {
                warn!(attempt, max = state.max_retries(), %details, "Failed, will retry next run");
                (
                    comments::retry(attempt, state.max_retries(), &details),
                    config.labels.mark_retry(&task.labels, attempt),
                    TaskOutcome::Retrying { attempt },
                )
            }
            FailureDisposition::GiveUp { attempts } => {
                error!(attempts, %details, "Failed permanently");
                (
                    comments::give_up(attempts, &details),
                    config.labels.mark_failed(&task.labels),
                    TaskOutcome::GaveUp { attempts },
                )
            }
        };
        store.comment_best_effort(&task.id, &text).await;
        if !self.write_labels(&task.id, &labels).await? {
            return Ok(TaskOutcome::Vanished);
        }
        Ok(outcome)
    }

    /// Replaces the task's labels. `Ok(false)` when the task no longer exists.
    async fn write_labels(&self, task: &TaskId, labels: &[String]) -> Result<bool, StoreError> {
        match self.ctx.store.set_labels(task, labels).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind == StoreErrorKind::NotFound => {
                warn!(task_id = %task, error = %err, "Task disappeared before its labels were written");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn close(&self, task: &TaskId) -> Result<(), StoreError> {
        match self.ctx.store.complete_task(task).await {
            Err(err) if err.kind != StoreErrorKind::NotFound => Err(err),
            Err(err) => {
                warn!(task_id = %task, error = %err, "Task disappeared before it could be closed");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }
}

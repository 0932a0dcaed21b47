//! Worker configuration, built once at startup.
//!
//! A [`WorkerConfig`] never changes for the lifetime of the process; changing
//! any value requires a restart.

use std::time::Duration;

use crate::{LabelVocabulary, ProjectName, WorkerError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Upper bound for the watch loop's back-off after store errors.
pub const DEFAULT_BACKOFF_CEILING: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Project (queue) this worker serves.
    pub project: ProjectName,
    /// Poll continuously instead of running a single cycle.
    pub watch: bool,
    /// Sleep between cycles in watch mode.
    pub poll_interval: Duration,
    /// Budget for one agent run.
    pub task_timeout: Duration,
    /// Failed attempts after which a task is marked terminally failed.
    pub max_retries: u32,
    pub verbose: bool,
    pub labels: LabelVocabulary,
    /// Also close the task in the store after a successful run. Off by default
    /// so finished work stays visible for review.
    pub close_on_success: bool,
    pub backoff_ceiling: Duration,
}

impl WorkerConfig {
    /// Creates a configuration with every default applied.
    pub fn new(project: ProjectName) -> Self {
        Self {
            project,
            watch: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            verbose: false,
            labels: LabelVocabulary::default(),
            close_on_success: false,
            backoff_ceiling: DEFAULT_BACKOFF_CEILING,
        }
    }

    /// Checks the invariants the controller relies on.
    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.poll_interval.is_zero() {
            return Err(WorkerError::configuration("poll interval must be positive"));
        }
        if self.task_timeout.is_zero() {
            return Err(WorkerError::configuration("task timeout must be positive"));
        }
        if self.max_retries == 0 {
            return Err(WorkerError::configuration("max retries must be at least 1"));
        }
        Ok(())
    }
}

//! Error and retry-policy types for the worker domain.
//!
//! [`WorkerError`] covers conditions that end a poll cycle or the whole run.
//! [`StoreError`] and [`DispatchError`] are produced by the two ports and are
//! wrapped by [`WorkerError`] when they escape a cycle.
//!
//! [`RetryPolicy`] is a cross-cutting concern: the watch loop asks a failed
//! cycle's error for its policy to decide between backing off and stopping.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ProjectName;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// ## Rules
///
/// - `Retryable` errors: request timeouts, connection failures, 5xx responses,
///   rate limiting.
/// - `NonRetryable` errors: rejected credentials, unknown resources, malformed
///   responses, configuration problems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying (e.g.
    /// derived from a `Retry-After` response header).
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetryPolicy::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Task store errors
// ---------------------------------------------------------------------------

/// Classification of a failed task-store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorKind {
    /// Timeout, connection refused, reset, DNS failure.
    Transport,
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    Server,
    /// HTTP 401/403: the credential is wrong or revoked.
    Unauthorized,
    /// HTTP 404: the project or task does not exist (any more).
    NotFound,
    /// Any other 4xx.
    Rejected,
    /// The response body did not have the expected shape.
    Decode,
}

/// A failed task-store operation.
#[derive(Debug, Clone, Error)]
#[error("task store {operation} failed ({kind:?}): {message}")]
pub struct StoreError {
    /// Short name of the operation, e.g. `"list tasks"`.
    pub operation: String,
    pub kind: StoreErrorKind,
    pub message: String,
    /// Server-provided minimum delay, when one was sent.
    pub retry_after: Option<Duration>,
}

impl StoreError {
    pub fn new(operation: impl Into<String>, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, after: Option<Duration>) -> Self {
        self.retry_after = after;
        self
    }

    /// Maps an HTTP status code to an error kind.
    pub fn kind_for_status(status: u16) -> StoreErrorKind {
        match status {
            401 | 403 => StoreErrorKind::Unauthorized,
            404 => StoreErrorKind::NotFound,
            408 => StoreErrorKind::Transport,
            429 => StoreErrorKind::RateLimited,
            500..=599 => StoreErrorKind::Server,
            _ => StoreErrorKind::Rejected,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match self.kind {
            StoreErrorKind::Transport | StoreErrorKind::RateLimited | StoreErrorKind::Server => {
                RetryPolicy::Retryable {
                    after: self.retry_after,
                }
            }
            StoreErrorKind::Unauthorized
            | StoreErrorKind::NotFound
            | StoreErrorKind::Rejected
            | StoreErrorKind::Decode => RetryPolicy::NonRetryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retry_policy().is_retryable()
    }
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

/// A dispatch that produced no [`crate::DispatchResult`] at all.
///
/// Ordinary agent failures (non-zero exit, timeout, missing binary) are
/// *outcomes*, not errors; see [`crate::DispatchOutcome`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The worker is shutting down; the child's process group was terminated.
    #[error("dispatch interrupted by shutdown")]
    Interrupted,

    /// The agent binary exists but could not be started.
    #[error("failed to start '{program}': {message}")]
    Spawn { program: String, message: String },

    /// Waiting on the child failed.
    #[error("agent process i/o failed: {0}")]
    Io(String),
}

// ---------------------------------------------------------------------------
// Worker-level errors
// ---------------------------------------------------------------------------

/// Errors that end a poll cycle or the whole run.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Missing credential, invalid flag combination and the like.
    ///
    /// Produced at startup; the worker never polls with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// No project with the configured name exists in the store.
    #[error("No '{name}' project found in the task store")]
    ProjectNotFound { name: ProjectName },

    /// The agent binary is not installed. An environment problem, so it stops
    /// the run instead of burning retries on every task.
    #[error("Agent binary '{program}' not found")]
    AgentMissing { program: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dispatch(DispatchError),

    /// A shutdown signal arrived.
    #[error("Interrupted")]
    Interrupted,
}

impl From<DispatchError> for WorkerError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Interrupted => WorkerError::Interrupted,
            other => WorkerError::Dispatch(other),
        }
    }
}

impl WorkerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        WorkerError::Configuration {
            message: message.into(),
        }
    }

    /// Only transient store failures are worth another poll.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            WorkerError::Store(e) => e.retry_policy(),
            _ => RetryPolicy::NonRetryable,
        }
    }
}

//! Shared value types for the worker domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (costs are finite and non-negative) or
//! aggregate the fields the worker reads from the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProjectId, TaskId};

// ---------------------------------------------------------------------------
// Cost
// ---------------------------------------------------------------------------

/// Monetary cost of one agent run, expressed in US dollars.
///
/// Reported by the agent in its trailing JSON summary; the worker only echoes
/// it back into the task's status comment.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct UsdCost(f64);

impl UsdCost {
    /// Creates a [`UsdCost`] from a raw float value (USD).
    ///
    /// Returns `None` if `value` is negative, infinite, or NaN.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 0.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the underlying `f64` value (USD).
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for UsdCost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.4}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Parses an RFC 3339 string, returning `None` for anything else.
    pub fn parse_rfc3339(raw: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Store records
// ---------------------------------------------------------------------------

/// A project (queue) in the task store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
}

/// An open task as last fetched from the store.
///
/// The worker never keeps one of these across poll cycles; every cycle
/// re-fetches and re-derives retry and completion state from `labels`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    /// Verbatim instruction text passed to the agent.
    pub title: String,

    /// Optional extra context, appended to the prompt when non-empty.
    pub description: Option<String>,

    /// Full label set. Labels outside the worker's vocabulary are opaque and
    /// must survive every label write.
    pub labels: Vec<String>,

    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl Task {
    /// Creates a task with no description, labels or timestamps.
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            labels: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Returns the description if it contains anything besides whitespace.
    pub fn context(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_rejects_negative_and_non_finite() {
        assert!(UsdCost::new(-0.01).is_none());
        assert!(UsdCost::new(f64::NAN).is_none());
        assert!(UsdCost::new(f64::INFINITY).is_none());
        assert_eq!(UsdCost::new(0.05).unwrap().to_string(), "$0.0500");
    }

    #[test]
    fn timestamp_parses_rfc3339_only() {
        let ts = Timestamp::parse_rfc3339("2025-03-01T09:30:00.000000Z").unwrap();
        assert_eq!(ts.to_string(), "2025-03-01T09:30:00+00:00");
        assert!(Timestamp::parse_rfc3339("yesterday").is_none());
    }

    #[test]
    fn blank_description_is_not_context() {
        let mut task = Task::new(TaskId::new("1").unwrap(), "Write X");
        assert_eq!(task.context(), None);
        task.description = Some("   \n".into());
        assert_eq!(task.context(), None);
        task.description = Some("  for the launch  ".into());
        assert_eq!(task.context(), Some("for the launch"));
    }
}

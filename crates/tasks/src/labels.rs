//! Label vocabulary shared by the read path (filtering, retry counting) and the
//! write path (status updates).
//!
//! The worker keeps no state of its own: whether a task is finished and how
//! often it has failed is encoded entirely in the task's labels. Every label
//! string the worker parses or produces goes through [`LabelVocabulary`] so the
//! two paths cannot drift apart.
//!
//! ## Owned labels
//!
//! | Label | Meaning |
//! |-------|---------|
//! | `<prefix>done` | Terminal success |
//! | `<prefix>failed` | Terminal failure, retries exhausted |
//! | `<prefix>retry-N` | `N` failed attempts so far |
//!
//! Anything else on a task is opaque and is carried through every write
//! unchanged. Label writes replace the whole set, so every `mark_*` method
//! returns the complete new set.

use serde::{Deserialize, Serialize};

/// Default prefix for all labels owned by the worker.
pub const DEFAULT_LABEL_PREFIX: &str = "agent-";

/// The label names owned by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVocabulary {
    done: String,
    failed: String,
    retry_prefix: String,
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_LABEL_PREFIX)
    }
}

impl LabelVocabulary {
    /// Builds the vocabulary `<prefix>done`, `<prefix>failed`, `<prefix>retry-N`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            done: format!("{prefix}done"),
            failed: format!("{prefix}failed"),
            retry_prefix: format!("{prefix}retry-"),
        }
    }

    /// The terminal success label.
    pub fn done(&self) -> &str {
        &self.done
    }

    /// The terminal failure label.
    pub fn failed(&self) -> &str {
        &self.failed
    }

    /// Formats the retry label for `count` failed attempts.
    pub fn retry_label(&self, count: u32) -> String {
        format!("{}{count}", self.retry_prefix)
    }

    /// Parses a retry label, returning its count.
    ///
    /// Labels that merely share the prefix (`agent-retry-soon`) are not retry
    /// labels and stay opaque.
    pub fn parse_retry(&self, label: &str) -> Option<u32> {
        label
            .strip_prefix(&self.retry_prefix)
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
    }

    /// Returns `true` for labels the worker writes and therefore may remove.
    pub fn is_owned(&self, label: &str) -> bool {
        label == self.done || label == self.failed || self.parse_retry(label).is_some()
    }

    /// Number of failed attempts recorded on a task.
    ///
    /// Takes the largest retry label so duplicates left behind by a manual edit
    /// can never lower the count.
    pub fn retry_count(&self, labels: &[String]) -> u32 {
        labels
            .iter()
            .filter_map(|l| self.parse_retry(l))
            .max()
            .unwrap_or(0)
    }

    /// Decides whether a task should be dispatched this cycle.
    pub fn classify(&self, labels: &[String], max_retries: u32) -> Eligibility {
        if labels.iter().any(|l| *l == self.done) {
            return Eligibility::Done;
        }
        if labels.iter().any(|l| *l == self.failed) {
            return Eligibility::Failed;
        }
        let state = RetryState::new(self.retry_count(labels), max_retries);
        if state.is_exhausted() {
            Eligibility::Exhausted(state)
        } else {
            Eligibility::Eligible(state)
        }
    }

    /// Label set after a successful dispatch.
    pub fn mark_done(&self, labels: &[String]) -> Vec<String> {
        self.replace_owned(labels, self.done.clone())
    }

    /// Label set after the final permitted failure.
    pub fn mark_failed(&self, labels: &[String]) -> Vec<String> {
        self.replace_owned(labels, self.failed.clone())
    }

    /// Label set after a failure that will be retried.
    pub fn mark_retry(&self, labels: &[String], count: u32) -> Vec<String> {
        self.replace_owned(labels, self.retry_label(count))
    }

    fn replace_owned(&self, labels: &[String], label: String) -> Vec<String> {
        let mut next: Vec<String> = labels
            .iter()
            .filter(|l| !self.is_owned(l))
            .cloned()
            .collect();
        next.push(label);
        next
    }
}

// ---------------------------------------------------------------------------
// Retry state
// ---------------------------------------------------------------------------

/// Retry accounting derived from a task's labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    failures: u32,
    max_retries: u32,
}

/// What a failed dispatch turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Record `attempt` failures and try again next cycle.
    Retry { attempt: u32 },
    /// The budget is spent; the task becomes terminally failed.
    GiveUp { attempts: u32 },
}

impl RetryState {
    pub fn new(failures: u32, max_retries: u32) -> Self {
        Self {
            failures,
            max_retries,
        }
    }

    /// Failed attempts recorded so far.
    pub fn failures(self) -> u32 {
        self.failures
    }

    pub fn max_retries(self) -> u32 {
        self.max_retries
    }

    /// 1-based number of the attempt about to run.
    pub fn attempt(self) -> u32 {
        self.failures.saturating_add(1)
    }

    pub fn is_exhausted(self) -> bool {
        self.failures >= self.max_retries
    }

    /// Applies one more failure. The count only ever increases.
    pub fn after_failure(self) -> FailureDisposition {
        let attempts = self.failures.saturating_add(1);
        if attempts >= self.max_retries {
            FailureDisposition::GiveUp { attempts }
        } else {
            FailureDisposition::Retry { attempt: attempts }
        }
    }
}

/// Result of [`LabelVocabulary::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Not terminal; dispatch with the given retry state.
    Eligible(RetryState),
    /// Carries the terminal success label.
    Done,
    /// Carries the terminal failure label.
    Failed,
    /// Retry budget already spent although the failure label is missing
    /// (for example after a partially applied write). Skipped silently.
    Exhausted(RetryState),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible(_))
    }
}

//! Core domain for the agent worker.
//!
//! This crate contains every domain concept, newtype identifier, value type and
//! error type used by the worker. Infrastructure crates implement the traits
//! defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* the worker needs from a task store and an agent; the
//! `todoist` and `agent` crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`TaskId`, `ProjectId`, `PollCycleId`, etc.) |
//! | [`types`] | Shared value types (`Task`, `UsdCost`, `Timestamp`) |
//! | [`labels`] | Label vocabulary and label-derived retry state |
//! | [`dispatch`] | Dispatch request/result types and the [`AgentDispatcher`] port |
//! | [`store`] | The [`TaskStore`] port |
//! | [`paging`] | Transport-free lazy pagination |
//! | [`config`] | Immutable [`WorkerConfig`] |
//! | [`errors`] | Store, dispatch and top-level error types plus [`RetryPolicy`] |

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod identifiers;
pub mod labels;
pub mod paging;
pub mod store;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::WorkerConfig;
pub use dispatch::{
    preview, AgentDispatcher, AgentSummary, DispatchOutcome, DispatchRequest, DispatchResult,
    PREVIEW_CHARS,
};
pub use errors::{DispatchError, RetryPolicy, StoreError, StoreErrorKind, WorkerError};
pub use identifiers::{PageCursor, PollCycleId, ProjectId, ProjectName, TaskId};
pub use labels::{Eligibility, FailureDisposition, LabelVocabulary, RetryState};
pub use paging::{Page, PageSource, Pages};
pub use store::TaskStore;
pub use types::{Project, Task, Timestamp, UsdCost};

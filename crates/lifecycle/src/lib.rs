//! Task lifecycle controller.
//!
//! Drives each eligible task through `Fetched → Announced → Dispatched →
//! {Succeeded | Retrying | GaveUp}` and writes the outcome back to the store as
//! a comment and a label replacement. The remote store is the only state: the
//! controller keeps nothing between cycles.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The controller sequences calls between the domain
//! rules in [`tasks`] and the [`tasks::TaskStore`] / [`tasks::AgentDispatcher`]
//! ports. It contains no transport or process code of its own.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`controller`] | [`WorkerContext`], [`Controller::run_cycle`], [`CycleReport`] |
//! | [`watch`] | Continuous polling with back-off after store errors |
//! | [`backoff`] | Exponential back-off schedule |
//! | [`comments`] | Status comment texts |

pub mod backoff;
pub mod comments;
pub mod controller;
pub mod watch;

pub use backoff::Backoff;
pub use controller::{Controller, CycleReport, WorkerContext};
pub use watch::watch;

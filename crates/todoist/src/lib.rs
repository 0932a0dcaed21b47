//! Todoist adapter for the worker's task store.
//!
//! Implements [`tasks::TaskStore`] over the Todoist REST API (v1). All transport
//! details live here: bearer authentication, cursor pagination, status-code
//! classification and in-request retries. The `tasks` crate never sees them.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Which labels
//! to write and when is decided by the `lifecycle` crate.

mod client;
mod models;

pub use client::{ClientOptions, TodoistClient, DEFAULT_API_BASE, TOKEN_ENV};

//! The task-store port.
//!
//! The remote tracker is the only source of truth: the worker reads tasks and
//! writes comments and labels, nothing else. Implementations handle transport,
//! authentication and pagination; callers see whole results.

use async_trait::async_trait;
use tracing::warn;

use crate::{ProjectId, ProjectName, StoreError, Task, TaskId};

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Finds a project by name, ignoring case.
    ///
    /// If several projects share the name the first one the store returns
    /// wins; callers get no indication that others exist.
    async fn find_project(&self, name: &ProjectName) -> Result<Option<ProjectId>, StoreError>;

    /// Lists all open tasks of a project, following pagination to the end.
    ///
    /// Order is whatever the store returns and is not stable across calls.
    async fn list_open_tasks(&self, project: &ProjectId) -> Result<Vec<Task>, StoreError>;

    /// Appends a comment to a task.
    async fn append_comment(&self, task: &TaskId, text: &str) -> Result<(), StoreError>;

    /// Replaces the task's entire label set with `labels`.
    async fn set_labels(&self, task: &TaskId, labels: &[String]) -> Result<(), StoreError>;

    /// Marks the task complete in the store.
    async fn complete_task(&self, task: &TaskId) -> Result<(), StoreError>;

    /// Appends a comment, logging and discarding any failure.
    ///
    /// A lost status comment never aborts or retries a dispatch.
    async fn comment_best_effort(&self, task: &TaskId, text: &str) {
        if let Err(err) = self.append_comment(task, text).await {
            warn!(task_id = %task, error = %err, "Failed to add comment");
        }
    }
}

//! Wire types for the Todoist REST API v1.
//!
//! Only the fields the worker reads are declared; everything else in the
//! payloads is ignored.

use serde::{Deserialize, Deserializer, Serialize};
use tasks::{PageCursor, Project, ProjectId, StoreError, StoreErrorKind, Task, TaskId, Timestamp};

/// Envelope of every list endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Paginated<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<T> Paginated<T> {
    pub fn next(&self) -> Option<PageCursor> {
        self.next_cursor.clone().and_then(PageCursor::new)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

impl ProjectRecord {
    pub fn into_project(self) -> Result<Project, StoreError> {
        let id = ProjectId::new(self.id).ok_or_else(|| empty_id("project"))?;
        Ok(Project {
            id,
            name: self.name,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl TaskRecord {
    pub fn into_task(self) -> Result<Task, StoreError> {
        let id = TaskId::new(self.id).ok_or_else(|| empty_id("task"))?;
        Ok(Task {
            id,
            title: self.content,
            description: self.description.filter(|d| !d.is_empty()),
            labels: self.labels,
            created_at: self.added_at.as_deref().and_then(Timestamp::parse_rfc3339),
            updated_at: self.updated_at.as_deref().and_then(Timestamp::parse_rfc3339),
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NewComment<'a> {
    pub task_id: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct LabelUpdate<'a> {
    pub labels: &'a [String],
}

fn empty_id(what: &str) -> StoreError {
    StoreError::new(
        "decode response",
        StoreErrorKind::Decode,
        format!("{what} without id"),
    )
}

/// Older API versions sent numeric ids; accept both.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

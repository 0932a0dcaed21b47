use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tasks::{
    Page, PageCursor, PageSource, Pages, Project, ProjectId, ProjectName, StoreError,
    StoreErrorKind, Task, TaskId, TaskStore,
};
use tracing::{debug, warn};

use crate::models::{LabelUpdate, NewComment, Paginated, ProjectRecord, TaskRecord};

pub const DEFAULT_API_BASE: &str = "https://api.todoist.com/api/v1";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "TODOIST_API_TOKEN";

const PAGE_LIMIT: &str = "200";
const ATTEMPT_HEADER: &str = "x-request-attempt";
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
const ERROR_BODY_CHARS: usize = 300;

/// Transport settings for [`TodoistClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_base: String,
    pub request_timeout: Duration,
    /// Attempts per request, including the first.
    pub max_attempts: usize,
    pub retry_base_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Todoist REST client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct TodoistClient {
    http: reqwest::Client,
    api_base: String,
    max_attempts: usize,
    retry_base_delay: Duration,
}

impl TodoistClient {
    pub fn new(token: &str, options: ClientOptions) -> Result<Self, StoreError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|_| {
            StoreError::new(
                "build client",
                StoreErrorKind::Rejected,
                "API token contains characters not allowed in a header",
            )
        })?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| {
                StoreError::new("build client", StoreErrorKind::Transport, e.to_string())
            })?;

        Ok(Self {
            http,
            api_base: options.api_base.trim_end_matches('/').to_string(),
            max_attempts: options.max_attempts.max(1),
            retry_base_delay: options.retry_base_delay,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn fetch_projects(&self, cursor: Option<&PageCursor>) -> Result<Page<Project>, StoreError> {
        let mut query = vec![("limit", PAGE_LIMIT.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        let page: Paginated<ProjectRecord> = self
            .request_json("list projects", || self.http.get(self.url("/projects")).query(&query))
            .await?;
        let next = page.next();
        let items = page
            .results
            .into_iter()
            .map(ProjectRecord::into_project)
            .collect::<Result<_, _>>()?;
        Ok(Page { items, next })
    }

    async fn fetch_tasks(
        &self,
        project: &ProjectId,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<Task>, StoreError> {
        let mut query = vec![
            ("project_id", project.to_string()),
            ("limit", PAGE_LIMIT.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        let page: Paginated<TaskRecord> = self
            .request_json("list tasks", || self.http.get(self.url("/tasks")).query(&query))
            .await?;
        let next = page.next();
        let items = page
            .results
            .into_iter()
            .map(TaskRecord::into_task)
            .collect::<Result<_, _>>()?;
        Ok(Page { items, next })
    }

    async fn request_json<T, F>(&self, operation: &str, build: F) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let response = self.execute(operation, build).await?;
        response.json::<T>().await.map_err(|e| {
            StoreError::new(operation, StoreErrorKind::Decode, e.to_string())
        })
    }

    async fn request_empty<F>(&self, operation: &str, build: F) -> Result<(), StoreError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        self.execute(operation, build).await.map(|_| ())
    }

    /// Sends a request, retrying transient failures up to `max_attempts`.
    async fn execute<F>(&self, operation: &str, build: F) -> Result<Response, StoreError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0_usize;
        loop {
            attempt += 1;
            let err = match build()
                .header(ATTEMPT_HEADER, (attempt - 1).to_string())
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    StoreError::new(
                        operation,
                        StoreError::kind_for_status(status),
                        format!("status {status}: {}", tasks::preview(body.trim(), ERROR_BODY_CHARS)),
                    )
                    .with_retry_after(retry_after)
                }
                Err(e) => StoreError::new(operation, transport_kind(&e), e.to_string()),
            };

            if attempt >= self.max_attempts || !err.is_retryable() {
                return Err(err);
            }
            let delay = self.retry_delay(attempt, err.retry_after);
            warn!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Task store request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn retry_delay(&self, attempt: usize, retry_after: Option<Duration>) -> Duration {
        let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let backoff = self.retry_base_delay.saturating_mul(1_u32 << exponent);
        backoff.max(retry_after.unwrap_or_default()).min(MAX_RETRY_DELAY)
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn transport_kind(err: &reqwest::Error) -> StoreErrorKind {
    if err.is_builder() {
        StoreErrorKind::Rejected
    } else if err.is_decode() {
        StoreErrorKind::Decode
    } else {
        StoreErrorKind::Transport
    }
}

// ---------------------------------------------------------------------------
// Page sources
// ---------------------------------------------------------------------------

struct ProjectPages {
    client: TodoistClient,
}

#[async_trait]
impl PageSource for ProjectPages {
    type Item = Project;

    async fn fetch_page(&self, cursor: Option<&PageCursor>) -> Result<Page<Project>, StoreError> {
        self.client.fetch_projects(cursor).await
    }
}

struct TaskPages {
    client: TodoistClient,
    project: ProjectId,
}

#[async_trait]
impl PageSource for TaskPages {
    type Item = Task;

    async fn fetch_page(&self, cursor: Option<&PageCursor>) -> Result<Page<Task>, StoreError> {
        self.client.fetch_tasks(&self.project, cursor).await
    }
}

// ---------------------------------------------------------------------------
// TaskStore
// ---------------------------------------------------------------------------

#[async_trait]
impl TaskStore for TodoistClient {
    async fn find_project(&self, name: &ProjectName) -> Result<Option<ProjectId>, StoreError> {
        let mut pages = Pages::new(ProjectPages {
            client: self.clone(),
        });
        let found = pages.try_find(|project| name.matches(&project.name)).await?;
        if let Some(project) = &found {
            debug!(project = %project.name, project_id = %project.id, "Project resolved");
        }
        Ok(found.map(|p| p.id))
    }

    async fn list_open_tasks(&self, project: &ProjectId) -> Result<Vec<Task>, StoreError> {
        Pages::new(TaskPages {
            client: self.clone(),
            project: project.clone(),
        })
        .try_collect()
        .await
    }

    async fn append_comment(&self, task: &TaskId, text: &str) -> Result<(), StoreError> {
        let body = NewComment {
            task_id: task.as_str(),
            content: text,
        };
        self.request_empty("add comment", || self.http.post(self.url("/comments")).json(&body))
            .await
    }

    async fn set_labels(&self, task: &TaskId, labels: &[String]) -> Result<(), StoreError> {
        let body = LabelUpdate { labels };
        let url = self.url(&format!("/tasks/{task}"));
        self.request_empty("update labels", || self.http.post(&url).json(&body))
            .await
    }

    async fn complete_task(&self, task: &TaskId) -> Result<(), StoreError> {
        let url = self.url(&format!("/tasks/{task}/close"));
        self.request_empty("close task", || self.http.post(&url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: Duration) -> TodoistClient {
        TodoistClient::new(
            "token",
            ClientOptions {
                retry_base_delay: base,
                ..ClientOptions::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn retry_delay_doubles_and_honours_retry_after() {
        let c = client(Duration::from_millis(100));
        assert_eq!(c.retry_delay(1, None), Duration::from_millis(100));
        assert_eq!(c.retry_delay(2, None), Duration::from_millis(200));
        assert_eq!(c.retry_delay(3, None), Duration::from_millis(400));
        assert_eq!(
            c.retry_delay(1, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(c.retry_delay(40, None), MAX_RETRY_DELAY);
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let err = TodoistClient::new("abc\ndef", ClientOptions::default()).unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Rejected);
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base() {
        let c = TodoistClient::new(
            "t",
            ClientOptions {
                api_base: "http://localhost:1/api/v1/".into(),
                ..ClientOptions::default()
            },
        )
        .unwrap();
        assert_eq!(c.url("/tasks"), "http://localhost:1/api/v1/tasks");
    }
}

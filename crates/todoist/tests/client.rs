use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use tasks::{ProjectName, StoreErrorKind, TaskId, TaskStore};
use todoist::{ClientOptions, TodoistClient};

fn client(server: &MockServer) -> TodoistClient {
    TodoistClient::new(
        "secret-token",
        ClientOptions {
            api_base: server.base_url(),
            request_timeout: Duration::from_secs(5),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(1),
        },
    )
    .expect("client")
}

fn task_id(raw: &str) -> TaskId {
    TaskId::new(raw).unwrap()
}

#[tokio::test]
async fn list_open_tasks_follows_cursor_and_keeps_store_order() {
    let server = MockServer::start_async().await;
    // Registered first so the cursor-specific mock wins for the second request.
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/tasks")
                .query_param("project_id", "p1")
                .query_param("cursor", "c2");
            then.status(200).json_body(json!({
                "results": [{ "id": "t3", "content": "Third", "labels": [] }],
                "next_cursor": null
            }));
        })
        .await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/tasks")
                .query_param("project_id", "p1")
                .header("authorization", "Bearer secret-token");
            then.status(200).json_body(json!({
                "results": [
                    { "id": "t2", "content": "Second", "description": "ctx", "labels": ["agent-retry-1"] },
                    { "id": "t1", "content": "First", "labels": [] }
                ],
                "next_cursor": "c2"
            }));
        })
        .await;

    let tasks = client(&server)
        .list_open_tasks(&tasks::ProjectId::new("p1").unwrap())
        .await
        .expect("tasks");

    let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Second", "First", "Third"]);
    assert_eq!(tasks[0].description.as_deref(), Some("ctx"));
    assert_eq!(tasks[0].labels, vec!["agent-retry-1"]);
    assert_eq!(first.hits_async().await, 1);
    assert_eq!(second.hits_async().await, 1);
}

#[tokio::test]
async fn find_project_matches_case_insensitively_and_first_match_wins() {
    let server = MockServer::start_async().await;
    let later = server
        .mock_async(|when, then| {
            when.method(GET).path("/projects").query_param("cursor", "next");
            then.status(200).json_body(json!({
                "results": [{ "id": "p9", "name": "demo" }],
                "next_cursor": null
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/projects");
            then.status(200).json_body(json!({
                "results": [
                    { "id": "p0", "name": "Inbox" },
                    { "id": "p1", "name": "DEMO" },
                    { "id": "p2", "name": "Demo" }
                ],
                "next_cursor": "next"
            }));
        })
        .await;

    let found = client(&server)
        .find_project(&ProjectName::new("Demo").unwrap())
        .await
        .expect("lookup");

    assert_eq!(found.unwrap().as_str(), "p1");
    assert_eq!(later.hits_async().await, 0, "stops paging after a match");
}

#[tokio::test]
async fn find_project_returns_none_when_absent() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/projects");
            then.status(200)
                .json_body(json!({ "results": [{ "id": "p0", "name": "Inbox" }] }));
        })
        .await;

    let found = client(&server)
        .find_project(&ProjectName::new("Demo").unwrap())
        .await
        .expect("lookup");
    assert!(found.is_none());
}

#[tokio::test]
async fn transient_failures_are_retried_within_a_request() {
    let server = MockServer::start_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/tasks")
                .header("x-request-attempt", "0");
            then.status(503).header("retry-after", "0").body("busy");
        })
        .await;
    let ok = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/tasks")
                .header("x-request-attempt", "1");
            then.status(200).json_body(json!({ "results": [] }));
        })
        .await;

    let tasks = client(&server)
        .list_open_tasks(&tasks::ProjectId::new("p1").unwrap())
        .await
        .expect("eventually succeeds");
    assert!(tasks.is_empty());
    assert_eq!(failing.hits_async().await, 1);
    assert_eq!(ok.hits_async().await, 1);
}

#[tokio::test]
async fn exhausted_retries_surface_a_retryable_error() {
    let server = MockServer::start_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/tasks");
            then.status(502).body("bad gateway");
        })
        .await;

    let err = client(&server)
        .list_open_tasks(&tasks::ProjectId::new("p1").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind, StoreErrorKind::Server);
    assert!(err.is_retryable());
    assert_eq!(failing.hits_async().await, 3);
}

#[tokio::test]
async fn unauthorized_is_fatal_and_not_retried() {
    let server = MockServer::start_async().await;
    let denied = server
        .mock_async(|when, then| {
            when.method(GET).path("/projects");
            then.status(401).body("Unauthorized");
        })
        .await;

    let err = client(&server)
        .find_project(&ProjectName::new("Demo").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind, StoreErrorKind::Unauthorized);
    assert!(!err.is_retryable());
    assert_eq!(denied.hits_async().await, 1);
}

#[tokio::test]
async fn set_labels_sends_the_complete_set() {
    let server = MockServer::start_async().await;
    let update = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/tasks/t1")
                .json_body(json!({ "labels": ["client-a", "agent-retry-2"] }));
            then.status(200).json_body(json!({ "id": "t1", "content": "x" }));
        })
        .await;

    client(&server)
        .set_labels(
            &task_id("t1"),
            &["client-a".to_string(), "agent-retry-2".to_string()],
        )
        .await
        .expect("labels written");
    update.assert_async().await;
}

#[tokio::test]
async fn set_labels_on_deleted_task_reports_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/tasks/gone");
            then.status(404).body("Task not found");
        })
        .await;

    let err = client(&server)
        .set_labels(&task_id("gone"), &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind, StoreErrorKind::NotFound);
}

#[tokio::test]
async fn append_comment_posts_task_and_content() {
    let server = MockServer::start_async().await;
    let comment = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/comments")
                .json_body(json!({ "task_id": "t1", "content": "Working on it..." }));
            then.status(200).json_body(json!({ "id": "c1" }));
        })
        .await;

    client(&server)
        .append_comment(&task_id("t1"), "Working on it...")
        .await
        .expect("comment");
    comment.assert_async().await;
}

#[tokio::test]
async fn best_effort_comment_swallows_failures() {
    let server = MockServer::start_async().await;
    let comment = server
        .mock_async(|when, then| {
            when.method(POST).path("/comments");
            then.status(400).body("bad");
        })
        .await;

    client(&server)
        .comment_best_effort(&task_id("t1"), "Done.")
        .await;
    assert_eq!(comment.hits_async().await, 1);
}

#[tokio::test]
async fn complete_task_closes_it() {
    let server = MockServer::start_async().await;
    let close = server
        .mock_async(|when, then| {
            when.method(POST).path("/tasks/t1/close");
            then.status(204);
        })
        .await;

    client(&server)
        .complete_task(&task_id("t1"))
        .await
        .expect("closed");
    close.assert_async().await;
}

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lifecycle::{Controller, WorkerContext};
use tasks::{
    AgentDispatcher, AgentSummary, DispatchError, DispatchOutcome, DispatchRequest,
    DispatchResult, ProjectId, ProjectName, StoreError, StoreErrorKind, Task, TaskId, TaskStore,
    UsdCost, WorkerConfig,
};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    tasks: Vec<Task>,
    comments: Vec<(TaskId, String)>,
    label_writes: Vec<(TaskId, Vec<String>)>,
    closed: Vec<TaskId>,
    list_failures: VecDeque<StoreError>,
    list_calls: Vec<tokio::time::Instant>,
    fail_comments: bool,
    deleted: HashSet<TaskId>,
    cancel_after_lists: Option<(usize, CancellationToken)>,
}

/// A task store that keeps label writes, so consecutive cycles see them.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn with_tasks(tasks: Vec<Task>) -> Arc<Self> {
        let store = Self::default();
        store.state.lock().unwrap().tasks = tasks;
        Arc::new(store)
    }

    pub fn fail_next_lists(&self, errors: Vec<StoreError>) {
        self.state.lock().unwrap().list_failures.extend(errors);
    }

    pub fn fail_comments(&self) {
        self.state.lock().unwrap().fail_comments = true;
    }

    /// Label writes and closes on `task` answer `NotFound`.
    pub fn delete_during_cycle(&self, task: &str) {
        self.state
            .lock()
            .unwrap()
            .deleted
            .insert(TaskId::new(task).unwrap());
    }

    /// Cancels `token` once `lists` listings have been served.
    pub fn cancel_after_lists(&self, lists: usize, token: CancellationToken) {
        self.state.lock().unwrap().cancel_after_lists = Some((lists, token));
    }

    pub fn labels(&self, task: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .tasks
            .iter()
            .find(|t| t.id.as_str() == task)
            .map(|t| t.labels.clone())
            .unwrap_or_default()
    }

    pub fn comments(&self, task: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .comments
            .iter()
            .filter(|(id, _)| id.as_str() == task)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn label_writes(&self) -> Vec<(TaskId, Vec<String>)> {
        self.state.lock().unwrap().label_writes.clone()
    }

    pub fn write_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.comments.len() + state.label_writes.len() + state.closed.len()
    }

    pub fn closed(&self) -> Vec<TaskId> {
        self.state.lock().unwrap().closed.clone()
    }

    pub fn list_calls(&self) -> Vec<tokio::time::Instant> {
        self.state.lock().unwrap().list_calls.clone()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn find_project(&self, name: &ProjectName) -> Result<Option<ProjectId>, StoreError> {
        Ok(name.matches("Demo").then(|| ProjectId::new("p1").unwrap()))
    }

    async fn list_open_tasks(&self, _project: &ProjectId) -> Result<Vec<Task>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls.push(tokio::time::Instant::now());
        if let Some((after, token)) = &state.cancel_after_lists {
            if state.list_calls.len() >= *after {
                token.cancel();
            }
        }
        if let Some(err) = state.list_failures.pop_front() {
            return Err(err);
        }
        let closed = state.closed.clone();
        Ok(state
            .tasks
            .iter()
            .filter(|t| !closed.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn append_comment(&self, task: &TaskId, text: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_comments {
            return Err(StoreError::new("add comment", StoreErrorKind::Server, "down"));
        }
        state.comments.push((task.clone(), text.to_string()));
        Ok(())
    }

    async fn set_labels(&self, task: &TaskId, labels: &[String]) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.deleted.contains(task) {
            return Err(StoreError::new("update labels", StoreErrorKind::NotFound, "gone"));
        }
        state.label_writes.push((task.clone(), labels.to_vec()));
        if let Some(stored) = state.tasks.iter_mut().find(|t| &t.id == task) {
            stored.labels = labels.to_vec();
        }
        Ok(())
    }

    async fn complete_task(&self, task: &TaskId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.deleted.contains(task) {
            return Err(StoreError::new("close task", StoreErrorKind::NotFound, "gone"));
        }
        state.closed.push(task.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scripted dispatcher
// ---------------------------------------------------------------------------

/// One canned dispatcher reply.
#[derive(Clone)]
pub enum Reply {
    Result(DispatchResult),
    Interrupted,
}

/// Replays replies in order; the last one repeats forever.
pub struct ScriptedDispatcher {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<DispatchRequest>>,
}

impl ScriptedDispatcher {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn always(reply: Reply) -> Arc<Self> {
        Self::new(vec![reply])
    }

    pub fn requests(&self) -> Vec<DispatchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentDispatcher for ScriptedDispatcher {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchResult, DispatchError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = {
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            }
        };
        match reply.expect("scripted dispatcher has no replies") {
            Reply::Result(result) => Ok(result),
            Reply::Interrupted => Err(DispatchError::Interrupted),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn task(id: &str, title: &str, labels: &[&str]) -> Task {
    let mut task = Task::new(TaskId::new(id).unwrap(), title);
    task.labels = labels.iter().map(|l| l.to_string()).collect();
    task
}

fn result(outcome: DispatchOutcome, stdout: &str, stderr: &str, summary: AgentSummary) -> Reply {
    Reply::Result(DispatchResult {
        outcome,
        stdout: stdout.into(),
        stderr: stderr.into(),
        elapsed: Duration::from_millis(10),
        summary,
    })
}

pub fn success(text: &str, cost: f64) -> Reply {
    result(
        DispatchOutcome::Success,
        "",
        "",
        AgentSummary {
            result: Some(text.into()),
            cost: UsdCost::new(cost),
        },
    )
}

pub fn exit_code(code: i32, stderr: &str) -> Reply {
    result(
        DispatchOutcome::FailureExitCode { code: Some(code) },
        "",
        stderr,
        AgentSummary::default(),
    )
}

pub fn timeout(after: Duration) -> Reply {
    result(
        DispatchOutcome::Timeout { after },
        "",
        "",
        AgentSummary::default(),
    )
}

pub fn agent_missing() -> Reply {
    Reply::Result(DispatchResult::agent_missing("claude"))
}

pub fn config() -> WorkerConfig {
    WorkerConfig::new(ProjectName::new("Demo").unwrap())
}

pub fn controller(
    store: Arc<MemoryStore>,
    dispatcher: Arc<ScriptedDispatcher>,
    config: WorkerConfig,
    shutdown: CancellationToken,
) -> Controller {
    Controller::new(WorkerContext {
        store,
        dispatcher,
        config,
        project: ProjectId::new("p1").unwrap(),
        shutdown,
    })
}

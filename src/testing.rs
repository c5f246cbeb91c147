//! Test Support
//!
//! `MockApi` is an in-memory stand-in for the tracker server. It records
//! every call as `"METHOD /path"`, can fail calls by prefix, and can hold
//! calls at a gate so a test can act while a request is outstanding.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use async_trait::async_trait;

use crate::commands::{
    sprint_complete_path, sprint_path, sprint_start_path, sprint_task_path, task_path,
    task_status_path, NewSprint, NewTask, RemoteApi, SprintPatch, TaskPatch, SPRINTS_PATH,
    TASKS_PATH,
};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Board, BoardId, Sprint, SprintId, SprintStatus, Task, TaskId, TaskQuery, TaskStatus,
};

// ========================
// Gate
// ========================

#[derive(Default)]
struct GateState {
    open: bool,
    waiters: Vec<Waker>,
}

/// Holds requests until opened
#[derive(Clone, Default)]
pub struct Gate {
    state: Rc<RefCell<GateState>>,
}

impl Gate {
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        let waiters = {
            let mut state = self.state.borrow_mut();
            state.open = true;
            std::mem::take(&mut state.waiters)
        };
        for waker in waiters {
            waker.wake();
        }
    }

    pub fn wait(&self) -> GateWait {
        GateWait { gate: self.clone() }
    }
}

pub struct GateWait {
    gate: Gate,
}

impl Future for GateWait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.gate.state.borrow_mut();
        if state.open {
            return Poll::Ready(());
        }
        state.waiters.push(cx.waker().clone());
        Poll::Pending
    }
}

// ========================
// Mock Server
// ========================

#[derive(Default)]
struct ServerState {
    tasks: BTreeMap<TaskId, Task>,
    sprints: BTreeMap<SprintId, Sprint>,
    boards: BTreeMap<BoardId, Board>,
}

/// In-memory `RemoteApi`
#[derive(Default)]
pub struct MockApi {
    state: RefCell<ServerState>,
    calls: RefCell<Vec<String>>,
    failures: RefCell<Vec<(String, ApiError)>>,
    gate: RefCell<Option<Gate>>,
    next_id: Cell<u32>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1000),
            ..Default::default()
        }
    }

    pub fn with_tasks(self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.state
            .borrow_mut()
            .tasks
            .extend(tasks.into_iter().map(|t| (t.id, t)));
        self
    }

    pub fn with_sprints(self, sprints: impl IntoIterator<Item = Sprint>) -> Self {
        self.state
            .borrow_mut()
            .sprints
            .extend(sprints.into_iter().map(|s| (s.id, s)));
        self
    }

    pub fn with_board(self, board: Board) -> Self {
        self.state.borrow_mut().boards.insert(board.id, board);
        self
    }

    /// Fail every call whose `"METHOD /path"` starts with `prefix`
    pub fn fail_when(&self, prefix: &str, error: ApiError) {
        self.failures.borrow_mut().push((prefix.to_string(), error));
    }

    pub fn clear_failures(&self) {
        self.failures.borrow_mut().clear();
    }

    /// Hold every following call until the returned gate opens
    pub fn hold(&self) -> Gate {
        let gate = Gate::closed();
        *self.gate.borrow_mut() = Some(gate.clone());
        gate
    }

    pub fn release(&self) {
        if let Some(gate) = self.gate.borrow_mut().take() {
            gate.open();
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Number of recorded calls starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn server_task(&self, id: TaskId) -> Option<Task> {
        self.state.borrow().tasks.get(&id).cloned()
    }

    pub fn server_sprint(&self, id: SprintId) -> Option<Sprint> {
        self.state.borrow().sprints.get(&id).cloned()
    }

    async fn enter(&self, call: String) -> ApiResult<()> {
        self.calls.borrow_mut().push(call.clone());

        let gate = self.gate.borrow().clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }

        let failure = self
            .failures
            .borrow()
            .iter()
            .find(|(prefix, _)| call.starts_with(prefix.as_str()))
            .map(|(_, err)| err.clone());
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn not_found(what: &str) -> ApiError {
        ApiError::Status {
            status: 404,
            message: format!("{} not found", what),
        }
    }

    fn alloc_id(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

#[async_trait(?Send)]
impl RemoteApi for MockApi {
    async fn list_tasks(&self, query: &TaskQuery) -> ApiResult<Vec<Task>> {
        self.enter(format!("GET {}", TASKS_PATH)).await?;
        let state = self.state.borrow();
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| query.sprint_id.map_or(true, |s| t.sprint_id == Some(s)))
            .filter(|t| query.column_id.map_or(true, |c| t.column_id == c))
            .filter(|t| query.status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.column_id, t.order, t.id));
        Ok(tasks)
    }

    async fn get_task(&self, id: TaskId) -> ApiResult<Task> {
        self.enter(format!("GET {}", task_path(id))).await?;
        self.server_task(id).ok_or_else(|| Self::not_found("task"))
    }

    async fn create_task(&self, args: &NewTask) -> ApiResult<Task> {
        self.enter(format!("POST {}", TASKS_PATH)).await?;
        let mut state = self.state.borrow_mut();
        let order = state
            .tasks
            .values()
            .filter(|t| t.column_id == args.column_id)
            .count() as i32;
        let task = Task {
            id: self.alloc_id(),
            title: args.title.clone(),
            description: args.description.clone(),
            status: args.status,
            priority: args.priority,
            column_id: args.column_id,
            sprint_id: args.sprint_id,
            order,
            sprint_order: 0,
            assignee_id: args.assignee_id,
            labels: args.labels.clone(),
            due_date: args.due_date.clone(),
        };
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> ApiResult<Task> {
        self.enter(format!("PUT {}", task_path(id))).await?;
        let mut state = self.state.borrow_mut();
        let task = state.tasks.get_mut(&id).ok_or_else(|| Self::not_found("task"))?;
        patch.apply(task);
        Ok(task.clone())
    }

    async fn update_task_status(&self, id: TaskId, status: TaskStatus) -> ApiResult<Task> {
        self.enter(format!("PUT {}", task_status_path(id))).await?;
        let mut state = self.state.borrow_mut();
        let task = state.tasks.get_mut(&id).ok_or_else(|| Self::not_found("task"))?;
        task.status = status;
        Ok(task.clone())
    }

    async fn delete_task(&self, id: TaskId) -> ApiResult<()> {
        self.enter(format!("DELETE {}", task_path(id))).await?;
        self.state
            .borrow_mut()
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found("task"))
    }

    async fn get_board(&self, id: BoardId) -> ApiResult<Board> {
        self.enter(format!("GET /boards/{}", id)).await?;
        self.state
            .borrow()
            .boards
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::not_found("board"))
    }

    async fn list_sprints(&self) -> ApiResult<Vec<Sprint>> {
        self.enter(format!("GET {}", SPRINTS_PATH)).await?;
        Ok(self.state.borrow().sprints.values().cloned().collect())
    }

    async fn create_sprint(&self, args: &NewSprint) -> ApiResult<Sprint> {
        self.enter(format!("POST {}", SPRINTS_PATH)).await?;
        let sprint = Sprint {
            id: self.alloc_id(),
            name: args.name.clone(),
            goal: args.goal.clone(),
            status: SprintStatus::Planning,
            task_ids: Vec::new(),
            start_date: args.start_date.clone(),
            end_date: args.end_date.clone(),
        };
        self.state
            .borrow_mut()
            .sprints
            .insert(sprint.id, sprint.clone());
        Ok(sprint)
    }

    async fn update_sprint(&self, id: SprintId, patch: &SprintPatch) -> ApiResult<Sprint> {
        self.enter(format!("PUT {}", sprint_path(id))).await?;
        let mut state = self.state.borrow_mut();
        let sprint = state.sprints.get_mut(&id).ok_or_else(|| Self::not_found("sprint"))?;
        patch.apply(sprint);
        Ok(sprint.clone())
    }

    async fn delete_sprint(&self, id: SprintId) -> ApiResult<()> {
        self.enter(format!("DELETE {}", sprint_path(id))).await?;
        let mut state = self.state.borrow_mut();
        state.sprints.remove(&id).ok_or_else(|| Self::not_found("sprint"))?;
        for task in state.tasks.values_mut().filter(|t| t.sprint_id == Some(id)) {
            task.sprint_id = None;
        }
        Ok(())
    }

    async fn start_sprint(&self, id: SprintId) -> ApiResult<Sprint> {
        self.enter(format!("PUT {}", sprint_start_path(id))).await?;
        let mut state = self.state.borrow_mut();
        let sprint = state.sprints.get_mut(&id).ok_or_else(|| Self::not_found("sprint"))?;
        sprint.status = SprintStatus::Active;
        Ok(sprint.clone())
    }

    async fn complete_sprint(&self, id: SprintId) -> ApiResult<Sprint> {
        self.enter(format!("PUT {}", sprint_complete_path(id))).await?;
        let mut state = self.state.borrow_mut();
        let sprint = state.sprints.get_mut(&id).ok_or_else(|| Self::not_found("sprint"))?;
        sprint.status = SprintStatus::Completed;
        Ok(sprint.clone())
    }

    async fn add_task_to_sprint(&self, sprint_id: SprintId, task_id: TaskId) -> ApiResult<()> {
        self.enter(format!("POST {}", sprint_task_path(sprint_id, task_id)))
            .await?;
        let mut state = self.state.borrow_mut();
        for sprint in state.sprints.values_mut() {
            sprint.task_ids.retain(|&id| id != task_id);
        }
        let sprint = state
            .sprints
            .get_mut(&sprint_id)
            .ok_or_else(|| Self::not_found("sprint"))?;
        sprint.task_ids.push(task_id);
        if let Some(task) = state.tasks.get_mut(&task_id) {
            task.sprint_id = Some(sprint_id);
        }
        Ok(())
    }

    async fn remove_task_from_sprint(&self, sprint_id: SprintId, task_id: TaskId) -> ApiResult<()> {
        self.enter(format!("DELETE {}", sprint_task_path(sprint_id, task_id)))
            .await?;
        let mut state = self.state.borrow_mut();
        let sprint = state
            .sprints
            .get_mut(&sprint_id)
            .ok_or_else(|| Self::not_found("sprint"))?;
        sprint.task_ids.retain(|&id| id != task_id);
        if let Some(task) = state.tasks.get_mut(&task_id) {
            task.sprint_id = None;
        }
        Ok(())
    }
}

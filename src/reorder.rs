//! Drag-and-Drop Reorder Protocol
//!
//! One drag gesture is an explicit state value plus a pending snapshot:
//!
//! ```text
//! Idle -> Dragging -> Dropping -> Committing  -> Idle
//!                              -> RollingBack -> Idle
//! ```
//!
//! A drop checks admission, applies the move to the local store, then
//! persists it. Success invalidates the query caches. Failure puts back the
//! exact records the move replaced.
//!
//! Only one move per task may be outstanding across all protocol instances
//! sharing an [`InFlightMoves`] registry. Cancelling a task's entry (view
//! unmounted, user navigated away) makes the pending resolution a no-op.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::admission::check_admission;
use crate::cache::CacheManager;
use crate::commands::{RemoteApi, TaskPatch};
use crate::error::{ApiError, SyncError, SyncResult};
use crate::models::{BoardColumn, Container, Sprint, SprintId, Task, TaskId, TaskStatus};
use crate::positioning::plan_move;
use crate::sprint::ensure_open;
use crate::store::NormalizedStore;
use crate::Shared;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReorderPhase {
    #[default]
    Idle,
    Dragging,
    Dropping,
    Committing,
    RollingBack,
}

/// Where the dragged task started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveSnapshot {
    pub task_id: TaskId,
    pub source: Container,
    pub source_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Dropped where it started; nothing sent
    Unchanged,
    /// Persisted; carries the moved task as now stored
    Committed(Task),
}

// ========================
// In-flight Registry
// ========================

#[derive(Debug, Default)]
struct InFlightState {
    next_token: u64,
    active: HashMap<TaskId, u64>,
}

/// Outstanding moves by task id, shared between protocol instances
#[derive(Debug, Clone, Default)]
pub struct InFlightMoves {
    state: Rc<RefCell<InFlightState>>,
}

impl InFlightMoves {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self, task_id: TaskId) -> bool {
        self.state.borrow().active.contains_key(&task_id)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the pending move of `task_id` from applying its resolution
    pub fn cancel(&self, task_id: TaskId) -> bool {
        let cancelled = self.state.borrow_mut().active.remove(&task_id).is_some();
        if cancelled {
            debug!(task_id, "in-flight move cancelled");
        }
        cancelled
    }

    pub fn cancel_all(&self) {
        self.state.borrow_mut().active.clear();
    }

    fn acquire(&self, task_id: TaskId) -> Option<u64> {
        let mut state = self.state.borrow_mut();
        if state.active.contains_key(&task_id) {
            return None;
        }
        state.next_token += 1;
        let token = state.next_token;
        state.active.insert(task_id, token);
        Some(token)
    }

    fn is_current(&self, task_id: TaskId, token: u64) -> bool {
        self.state.borrow().active.get(&task_id) == Some(&token)
    }

    fn release(&self, task_id: TaskId, token: u64) {
        let mut state = self.state.borrow_mut();
        if state.active.get(&task_id) == Some(&token) {
            state.active.remove(&task_id);
        }
    }
}

// ========================
// Protocol
// ========================

#[derive(Debug, Default)]
struct GestureState {
    phase: ReorderPhase,
    snapshot: Option<MoveSnapshot>,
}

/// Records replaced by an optimistic move
struct Undo {
    tasks: Vec<Task>,
    sprints: Vec<Sprint>,
}

pub struct ReorderProtocol {
    tasks: Shared<CacheManager<Task>>,
    sprints: Shared<CacheManager<Sprint>>,
    columns: Shared<NormalizedStore<BoardColumn>>,
    api: Rc<dyn RemoteApi>,
    in_flight: InFlightMoves,
    gesture: RefCell<GestureState>,
}

impl ReorderProtocol {
    pub fn new(
        tasks: Shared<CacheManager<Task>>,
        sprints: Shared<CacheManager<Sprint>>,
        columns: Shared<NormalizedStore<BoardColumn>>,
        api: Rc<dyn RemoteApi>,
        in_flight: InFlightMoves,
    ) -> Self {
        Self {
            tasks,
            sprints,
            columns,
            api,
            in_flight,
            gesture: RefCell::new(GestureState::default()),
        }
    }

    pub fn phase(&self) -> ReorderPhase {
        self.gesture.borrow().phase
    }

    pub fn snapshot(&self) -> Option<MoveSnapshot> {
        self.gesture.borrow().snapshot
    }

    fn set_phase(&self, phase: ReorderPhase) {
        self.gesture.borrow_mut().phase = phase;
    }

    /// Start dragging `task_id` from position `source_index` of `source`
    pub fn begin(&self, task_id: TaskId, source: Container, source_index: usize) -> SyncResult<()> {
        if self.phase() != ReorderPhase::Idle {
            return Err(SyncError::DragInProgress);
        }
        if self.in_flight.is_in_flight(task_id) {
            warn!(task_id, "drag rejected: previous move unresolved");
            return Err(SyncError::MoveInFlight { task_id });
        }
        {
            let tasks = self.tasks.borrow();
            let task = tasks
                .store()
                .get(&task_id)
                .ok_or(SyncError::UnknownTask(task_id))?;
            if !task.is_in(source) {
                return Err(SyncError::NotInContainer {
                    task_id,
                    container: source,
                });
            }
        }

        let mut gesture = self.gesture.borrow_mut();
        gesture.snapshot = Some(MoveSnapshot {
            task_id,
            source,
            source_index,
        });
        gesture.phase = ReorderPhase::Dragging;
        debug!(task_id, %source, source_index, "drag started");
        Ok(())
    }

    /// Abandon the gesture before dropping
    pub fn cancel_drag(&self) -> bool {
        let mut gesture = self.gesture.borrow_mut();
        if gesture.phase != ReorderPhase::Dragging {
            return false;
        }
        gesture.phase = ReorderPhase::Idle;
        gesture.snapshot = None;
        true
    }

    /// Drop the dragged task at `target_index` of `target`
    ///
    /// Always leaves the protocol idle.
    pub async fn drop(&self, target: Container, target_index: usize) -> SyncResult<DropOutcome> {
        let snapshot = {
            let mut gesture = self.gesture.borrow_mut();
            if gesture.phase != ReorderPhase::Dragging {
                return Err(SyncError::NotDragging);
            }
            let snapshot = gesture.snapshot.take().ok_or(SyncError::NotDragging)?;
            gesture.phase = ReorderPhase::Dropping;
            snapshot
        };

        let result = self.settle(snapshot, target, target_index).await;
        self.set_phase(ReorderPhase::Idle);
        result
    }

    async fn settle(
        &self,
        snapshot: MoveSnapshot,
        target: Container,
        target_index: usize,
    ) -> SyncResult<DropOutcome> {
        let MoveSnapshot {
            task_id,
            source,
            source_index,
        } = snapshot;

        if target == source && target_index == source_index {
            debug!(task_id, "dropped in place");
            return Ok(DropOutcome::Unchanged);
        }

        let column_status = self.guard(task_id, source, target)?;

        let changed = plan_move(
            self.tasks.borrow().store(),
            task_id,
            source,
            target,
            target_index,
            column_status,
        )
        .ok_or(SyncError::UnknownTask(task_id))?;
        if changed.is_empty() {
            debug!(task_id, "drop leaves order unchanged");
            return Ok(DropOutcome::Unchanged);
        }

        let moved = changed
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
            .or_else(|| self.tasks.borrow().store().get(&task_id).cloned())
            .ok_or(SyncError::UnknownTask(task_id))?;
        let calls = remote_calls(&moved, source, target, column_status);

        let token = self
            .in_flight
            .acquire(task_id)
            .ok_or(SyncError::MoveInFlight { task_id })?;

        let undo = self.apply(task_id, source, target, changed);
        let persisted = self.persist(task_id, calls).await;

        if !self.in_flight.is_current(task_id, token) {
            debug!(task_id, "move resolved after cancellation; ignored");
            return Err(SyncError::Superseded { task_id });
        }

        let result = match persisted {
            Ok(()) => {
                self.set_phase(ReorderPhase::Committing);
                self.invalidate_queries();
                info!(task_id, from = %source, to = %target, rank = moved.rank_in(target), "move committed");
                Ok(DropOutcome::Committed(moved))
            }
            Err(failure) => {
                self.set_phase(ReorderPhase::RollingBack);
                self.restore(undo);
                if failure.partial {
                    // The server kept part of the move; cached results may describe either state
                    self.invalidate_queries();
                    warn!(task_id, error = %failure.source, "move partly persisted; rolled back and dropped cached queries");
                } else {
                    warn!(task_id, error = %failure.source, "move failed; rolled back");
                }
                Err(SyncError::PersistenceFailed {
                    task_id: Some(task_id),
                    source: failure.source,
                })
            }
        };
        self.in_flight.release(task_id, token);
        result
    }

    /// Local checks before anything changes; returns the target column's status key
    fn guard(&self, task_id: TaskId, source: Container, target: Container) -> SyncResult<Option<TaskStatus>> {
        match (source, target) {
            (Container::Column(_), Container::Column(column_id)) => {
                let columns = self.columns.borrow();
                let column = columns
                    .get(&column_id)
                    .ok_or(SyncError::UnknownColumn(column_id))?;
                if let Err(err) = check_admission(self.tasks.borrow().store(), column, task_id) {
                    warn!(task_id, column_id, "drop rejected: WIP limit");
                    return Err(err);
                }
                Ok(column.status)
            }
            (Container::Column(_), _) | (_, Container::Column(_)) => {
                Err(SyncError::IncompatibleContainers {
                    from: source,
                    to: target,
                })
            }
            _ => {
                // Sprints carry no WIP limit; completed ones are frozen
                let sprints = self.sprints.borrow();
                for container in [source, target] {
                    if let Container::Sprint(sprint_id) = container {
                        if let Err(err) = ensure_open(sprints.store(), sprint_id) {
                            warn!(task_id, sprint_id, "drop rejected: {}", err);
                            return Err(err);
                        }
                    }
                }
                Ok(None)
            }
        }
    }

    fn apply(&self, task_id: TaskId, source: Container, target: Container, changed: Vec<Task>) -> Undo {
        let mut undo = Undo {
            tasks: Vec::with_capacity(changed.len()),
            sprints: Vec::new(),
        };

        {
            let mut tasks = self.tasks.borrow_mut();
            let store = tasks.store_mut();
            for task in changed {
                if let Some(prior) = store.get(&task.id) {
                    undo.tasks.push(prior.clone());
                }
                store.update(task);
            }
        }

        if source != target {
            let mut sprints = self.sprints.borrow_mut();
            let store = sprints.store_mut();
            if let Container::Sprint(from) = source {
                if let Some(prior) = store.get(&from) {
                    undo.sprints.push(prior.clone());
                }
                store.modify(&from, |s| s.task_ids.retain(|&id| id != task_id));
            }
            if let Container::Sprint(to) = target {
                if let Some(prior) = store.get(&to) {
                    undo.sprints.push(prior.clone());
                }
                store.modify(&to, |s| {
                    if !s.contains(task_id) {
                        s.task_ids.push(task_id);
                    }
                });
            }
        }
        undo
    }

    fn restore(&self, undo: Undo) {
        {
            let mut tasks = self.tasks.borrow_mut();
            for task in undo.tasks {
                tasks.store_mut().update(task);
            }
        }
        let mut sprints = self.sprints.borrow_mut();
        for sprint in undo.sprints {
            sprints.store_mut().update(sprint);
        }
    }

    fn invalidate_queries(&self) {
        self.tasks.borrow_mut().invalidate_all();
        self.sprints.borrow_mut().invalidate_all();
    }

    /// Send `calls` in order, stopping at the first failure
    async fn persist(&self, task_id: TaskId, calls: Vec<RemoteCall>) -> Result<(), PersistFailure> {
        for (sent, call) in calls.into_iter().enumerate() {
            let result = match call {
                RemoteCall::Status(status) => self.api.update_task_status(task_id, status).await.map(|_| ()),
                RemoteCall::Patch(patch) => self.api.update_task(task_id, &patch).await.map(|_| ()),
                RemoteCall::LeaveSprint(sprint_id) => self.api.remove_task_from_sprint(sprint_id, task_id).await,
                RemoteCall::JoinSprint(sprint_id) => self.api.add_task_to_sprint(sprint_id, task_id).await,
            };
            if let Err(source) = result {
                return Err(PersistFailure {
                    source,
                    partial: sent > 0,
                });
            }
        }
        Ok(())
    }
}

// ========================
// Remote Calls
// ========================

/// One request of a move's persistence sequence
#[derive(Debug, Clone, PartialEq)]
enum RemoteCall {
    Status(TaskStatus),
    Patch(TaskPatch),
    LeaveSprint(SprintId),
    JoinSprint(SprintId),
}

struct PersistFailure {
    source: ApiError,
    /// An earlier call of the same move already landed
    partial: bool,
}

/// Requests that persist `moved`, already placed at `target`
fn remote_calls(
    moved: &Task,
    source: Container,
    target: Container,
    column_status: Option<TaskStatus>,
) -> Vec<RemoteCall> {
    let rank = RemoteCall::Patch(TaskPatch::sprint_order(moved.sprint_order));
    match (source, target) {
        (_, Container::Column(column_id)) => {
            let placement = RemoteCall::Patch(TaskPatch::placement(column_id, moved.order));
            match column_status {
                Some(status) if source != target => vec![RemoteCall::Status(status), placement],
                _ => vec![placement],
            }
        }
        (from, to) if from == to => vec![rank],
        (Container::Sprint(previous), Container::Sprint(sprint_id)) => vec![
            RemoteCall::LeaveSprint(previous),
            RemoteCall::JoinSprint(sprint_id),
            rank,
        ],
        (_, Container::Sprint(sprint_id)) => vec![RemoteCall::JoinSprint(sprint_id), rank],
        (Container::Sprint(previous), Container::Backlog) => vec![RemoteCall::LeaveSprint(previous), rank],
        (_, Container::Backlog) => vec![rank],
    }
}

//! Board Sync Hub
//!
//! Owns the shared caches for one board view and hands them to the
//! protocols. Task and column reads go through here; drag moves go through
//! [`ReorderProtocol`] and sprint changes through [`SprintLifecycle`].
//!
//! Plain task mutations are not optimistic: the local store changes only
//! after the server confirms, then every cached query is dropped.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::TimeDelta;
use tracing::{debug, info};

use crate::cache::{CacheManager, Clock, SystemClock};
use crate::commands::{HttpApi, NewTask, RemoteApi, TaskPatch};
use crate::config::SyncConfig;
use crate::error::{ApiResult, SyncResult};
use crate::models::{Board, BoardColumn, BoardId, Container, Sprint, Task, TaskId, TaskQuery};
use crate::positioning::members;
use crate::reorder::{InFlightMoves, ReorderProtocol};
use crate::sprint::SprintLifecycle;
use crate::store::NormalizedStore;
use crate::Shared;

pub struct BoardSync {
    api: Rc<dyn RemoteApi>,
    tasks: Shared<CacheManager<Task>>,
    sprints: Shared<CacheManager<Sprint>>,
    columns: Shared<NormalizedStore<BoardColumn>>,
    board: RefCell<Option<Board>>,
    in_flight: InFlightMoves,
}

impl BoardSync {
    pub fn new(api: Rc<dyn RemoteApi>, ttl: TimeDelta, clock: Rc<dyn Clock>) -> Self {
        Self {
            api,
            tasks: Rc::new(RefCell::new(CacheManager::new(ttl, clock.clone()))),
            sprints: Rc::new(RefCell::new(CacheManager::new(ttl, clock))),
            columns: Rc::new(RefCell::new(NormalizedStore::new())),
            board: RefCell::new(None),
            in_flight: InFlightMoves::new(),
        }
    }

    /// Hub over `api` using the configured TTL and the wall clock
    pub fn with_config(api: Rc<dyn RemoteApi>, config: &SyncConfig) -> Self {
        Self::new(api, config.cache_ttl(), Rc::new(SystemClock))
    }

    /// Hub talking HTTP to `config.base_url`
    pub fn connect(config: SyncConfig) -> ApiResult<Self> {
        let api = HttpApi::new(config.clone())?;
        Ok(Self::with_config(Rc::new(api), &config))
    }

    // ========================
    // Shared State
    // ========================

    pub fn tasks(&self) -> &Shared<CacheManager<Task>> {
        &self.tasks
    }

    pub fn sprints(&self) -> &Shared<CacheManager<Sprint>> {
        &self.sprints
    }

    pub fn columns(&self) -> &Shared<NormalizedStore<BoardColumn>> {
        &self.columns
    }

    pub fn in_flight(&self) -> &InFlightMoves {
        &self.in_flight
    }

    pub fn board(&self) -> Option<Board> {
        self.board.borrow().clone()
    }

    /// A drag-and-drop protocol over this hub's state
    pub fn reorder(&self) -> ReorderProtocol {
        ReorderProtocol::new(
            self.tasks.clone(),
            self.sprints.clone(),
            self.columns.clone(),
            self.api.clone(),
            self.in_flight.clone(),
        )
    }

    pub fn lifecycle(&self) -> SprintLifecycle {
        SprintLifecycle::new(self.sprints.clone(), self.tasks.clone(), self.api.clone())
    }

    // ========================
    // Selectors
    // ========================

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.tasks.borrow().store().get(&id).cloned()
    }

    pub fn all_tasks(&self) -> Vec<Task> {
        self.tasks.borrow().store().denormalize()
    }

    /// Members of `container` in display order
    pub fn tasks_in(&self, container: Container) -> Vec<Task> {
        members(self.tasks.borrow().store(), container)
    }

    pub fn all_columns(&self) -> Vec<BoardColumn> {
        self.columns.borrow().denormalize()
    }

    pub fn all_sprints(&self) -> Vec<Sprint> {
        self.sprints.borrow().store().denormalize()
    }

    // ========================
    // Task Reads
    // ========================

    /// Tasks matching `query`, from cache while fresh
    pub async fn fetch_tasks(&self, query: &TaskQuery) -> SyncResult<Vec<Task>> {
        if let Some(hit) = self.tasks.borrow().read(Some(query)) {
            debug!(count = hit.len(), "task query served from cache");
            return Ok(hit);
        }
        let tasks = self.api.list_tasks(query).await?;
        Ok(self.tasks.borrow_mut().write(Some(query), tasks))
    }

    /// Single task, always from the server
    pub async fn fetch_task(&self, id: TaskId) -> SyncResult<Task> {
        let task = self.api.get_task(id).await?;
        self.tasks.borrow_mut().store_mut().add(task.clone());
        Ok(task)
    }

    // ========================
    // Task Mutations
    // ========================

    pub async fn create_task(&self, args: &NewTask) -> SyncResult<Task> {
        let task = self.api.create_task(args).await?;
        info!(task_id = task.id, column_id = task.column_id, "task created");

        self.tasks.borrow_mut().store_mut().add(task.clone());
        if let Some(sprint_id) = task.sprint_id {
            self.sprints.borrow_mut().store_mut().modify(&sprint_id, |s| {
                if !s.contains(task.id) {
                    s.task_ids.push(task.id);
                }
            });
        }
        self.invalidate_all();
        Ok(task)
    }

    pub async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> SyncResult<Task> {
        let task = self.api.update_task(id, patch).await?;
        self.tasks.borrow_mut().store_mut().add(task.clone());
        self.invalidate_all();
        Ok(task)
    }

    pub async fn assign_task(&self, id: TaskId, assignee_id: u32) -> SyncResult<Task> {
        self.update_task(id, &TaskPatch::assign(Some(assignee_id))).await
    }

    pub async fn unassign_task(&self, id: TaskId) -> SyncResult<Task> {
        self.update_task(id, &TaskPatch::assign(None)).await
    }

    pub async fn delete_task(&self, id: TaskId) -> SyncResult<()> {
        self.api.delete_task(id).await?;
        info!(task_id = id, "task deleted");

        let removed = self.tasks.borrow_mut().store_mut().remove(&id);
        if let Some(sprint_id) = removed.and_then(|t| t.sprint_id) {
            self.sprints
                .borrow_mut()
                .store_mut()
                .modify(&sprint_id, |s| s.task_ids.retain(|&t| t != id));
        }
        self.invalidate_all();
        Ok(())
    }

    // ========================
    // Board & Columns
    // ========================

    /// Fetch a board and replace the column set with its columns
    pub async fn load_board(&self, id: BoardId) -> SyncResult<Board> {
        let board = self.api.get_board(id).await?;
        debug!(board_id = id, columns = board.columns.len(), "board loaded");
        self.set_columns(board.columns.clone());
        *self.board.borrow_mut() = Some(board.clone());
        Ok(board)
    }

    /// Replace the column set, ordered by `order`
    pub fn set_columns(&self, mut columns: Vec<BoardColumn>) {
        columns.sort_by_key(|c| (c.order, c.id));
        let mut store = self.columns.borrow_mut();
        store.clear();
        store.add_all(columns);
    }

    // ========================
    // Cache Maintenance
    // ========================

    pub fn invalidate_all(&self) {
        self.tasks.borrow_mut().invalidate_all();
        self.sprints.borrow_mut().invalidate_all();
    }

    /// Forget everything, e.g. when leaving the board
    ///
    /// Pending moves are cancelled so their resolutions do not land in the
    /// emptied caches.
    pub fn clear(&self) {
        self.in_flight.cancel_all();
        self.tasks.borrow_mut().clear();
        self.sprints.borrow_mut().clear();
        self.columns.borrow_mut().clear();
        *self.board.borrow_mut() = None;
    }
}

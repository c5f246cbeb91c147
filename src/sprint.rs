//! Sprint Lifecycle
//!
//! `PLANNING -> ACTIVE -> COMPLETED`, nothing goes back. Transitions are
//! guarded locally before any request is sent. Membership of a completed
//! sprint is frozen. Every successful change invalidates both query caches,
//! since sprint-scoped task queries go stale with it.

use std::fmt;
use std::rc::Rc;

use tracing::{info, warn};

use crate::cache::CacheManager;
use crate::commands::{NewSprint, RemoteApi, SprintPatch};
use crate::error::{SyncError, SyncResult};
use crate::models::{Sprint, SprintId, SprintStatus, Task, TaskId};
use crate::store::NormalizedStore;
use crate::Shared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprintAction {
    Start,
    Complete,
}

impl fmt::Display for SprintAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SprintAction::Start => f.write_str("start"),
            SprintAction::Complete => f.write_str("complete"),
        }
    }
}

/// Status after `action`, or `None` if `from` does not allow it
pub fn next_status(from: SprintStatus, action: SprintAction) -> Option<SprintStatus> {
    match (from, action) {
        (SprintStatus::Planning, SprintAction::Start) => Some(SprintStatus::Active),
        (SprintStatus::Active, SprintAction::Complete) => Some(SprintStatus::Completed),
        _ => None,
    }
}

/// Reject membership changes on a completed sprint
pub fn ensure_open(sprints: &NormalizedStore<Sprint>, sprint_id: SprintId) -> SyncResult<()> {
    let sprint = sprints
        .get(&sprint_id)
        .ok_or(SyncError::UnknownSprint(sprint_id))?;
    if sprint.status == SprintStatus::Completed {
        return Err(SyncError::SprintClosed { sprint_id });
    }
    Ok(())
}

#[derive(Clone)]
pub struct SprintLifecycle {
    sprints: Shared<CacheManager<Sprint>>,
    tasks: Shared<CacheManager<Task>>,
    api: Rc<dyn RemoteApi>,
}

impl SprintLifecycle {
    pub fn new(
        sprints: Shared<CacheManager<Sprint>>,
        tasks: Shared<CacheManager<Task>>,
        api: Rc<dyn RemoteApi>,
    ) -> Self {
        Self { sprints, tasks, api }
    }

    pub fn sprint(&self, sprint_id: SprintId) -> Option<Sprint> {
        self.sprints.borrow().store().get(&sprint_id).cloned()
    }

    pub fn status_of(&self, sprint_id: SprintId) -> SyncResult<SprintStatus> {
        self.sprints
            .borrow()
            .store()
            .get(&sprint_id)
            .map(|s| s.status)
            .ok_or(SyncError::UnknownSprint(sprint_id))
    }

    /// All sprints, from cache while fresh
    pub async fn fetch_sprints(&self) -> SyncResult<Vec<Sprint>> {
        if let Some(hit) = self.sprints.borrow().read::<()>(None) {
            return Ok(hit);
        }
        let sprints = self.api.list_sprints().await?;
        Ok(self.sprints.borrow_mut().write::<()>(None, sprints))
    }

    pub async fn start(&self, sprint_id: SprintId) -> SyncResult<Sprint> {
        self.transition(sprint_id, SprintAction::Start).await
    }

    /// Task statuses are left alone; a task may stay IN_PROGRESS
    pub async fn complete(&self, sprint_id: SprintId) -> SyncResult<Sprint> {
        self.transition(sprint_id, SprintAction::Complete).await
    }

    async fn transition(&self, sprint_id: SprintId, action: SprintAction) -> SyncResult<Sprint> {
        let from = self.status_of(sprint_id)?;
        let Some(to) = next_status(from, action) else {
            warn!(sprint_id, %from, %action, "sprint transition rejected");
            return Err(SyncError::InvalidTransition {
                sprint_id,
                from,
                action,
            });
        };

        let returned = match action {
            SprintAction::Start => self.api.start_sprint(sprint_id).await?,
            SprintAction::Complete => self.api.complete_sprint(sprint_id).await?,
        };

        let sprint = self.keep_members(returned);
        info!(sprint_id, %from, %to, "sprint transitioned");
        self.sprints.borrow_mut().store_mut().add(sprint.clone());
        self.invalidate_all();
        Ok(sprint)
    }

    pub async fn create_sprint(&self, args: &NewSprint) -> SyncResult<Sprint> {
        let sprint = self.api.create_sprint(args).await?;
        info!(sprint_id = sprint.id, name = %sprint.name, "sprint created");
        self.sprints.borrow_mut().store_mut().add(sprint.clone());
        self.invalidate_all();
        Ok(sprint)
    }

    pub async fn update_sprint(&self, sprint_id: SprintId, patch: &SprintPatch) -> SyncResult<Sprint> {
        let returned = self.api.update_sprint(sprint_id, patch).await?;
        let sprint = self.keep_members(returned);
        self.sprints.borrow_mut().store_mut().add(sprint.clone());
        self.invalidate_all();
        Ok(sprint)
    }

    /// Delete a sprint; its tasks fall back to the backlog
    pub async fn delete_sprint(&self, sprint_id: SprintId) -> SyncResult<()> {
        self.api.delete_sprint(sprint_id).await?;

        self.sprints.borrow_mut().store_mut().remove(&sprint_id);
        {
            let mut tasks = self.tasks.borrow_mut();
            let store = tasks.store_mut();
            let members: Vec<TaskId> = store
                .iter()
                .filter(|t| t.sprint_id == Some(sprint_id))
                .map(|t| t.id)
                .collect();
            for id in members {
                store.modify(&id, |t| t.sprint_id = None);
            }
        }
        info!(sprint_id, "sprint deleted");
        self.invalidate_all();
        Ok(())
    }

    /// Add a task, moving it out of any previous sprint
    pub async fn add_task(&self, sprint_id: SprintId, task_id: TaskId) -> SyncResult<()> {
        let previous = self
            .tasks
            .borrow()
            .store()
            .get(&task_id)
            .and_then(|t| t.sprint_id)
            .filter(|&prev| prev != sprint_id);
        {
            let sprints = self.sprints.borrow();
            ensure_open(sprints.store(), sprint_id)?;
            if let Some(prev) = previous {
                // Unknown previous sprint is not ours to guard
                if sprints.store().contains(&prev) {
                    ensure_open(sprints.store(), prev)?;
                }
            }
        }

        self.api.add_task_to_sprint(sprint_id, task_id).await?;

        {
            let mut sprints = self.sprints.borrow_mut();
            let store = sprints.store_mut();
            if let Some(prev) = previous {
                store.modify(&prev, |s| s.task_ids.retain(|&id| id != task_id));
            }
            store.modify(&sprint_id, |s| {
                if !s.contains(task_id) {
                    s.task_ids.push(task_id);
                }
            });
        }
        self.tasks
            .borrow_mut()
            .store_mut()
            .modify(&task_id, |t| t.sprint_id = Some(sprint_id));

        info!(sprint_id, task_id, "task added to sprint");
        self.invalidate_all();
        Ok(())
    }

    pub async fn remove_task(&self, sprint_id: SprintId, task_id: TaskId) -> SyncResult<()> {
        ensure_open(self.sprints.borrow().store(), sprint_id)?;

        self.api.remove_task_from_sprint(sprint_id, task_id).await?;

        self.sprints
            .borrow_mut()
            .store_mut()
            .modify(&sprint_id, |s| s.task_ids.retain(|&id| id != task_id));
        self.tasks.borrow_mut().store_mut().modify(&task_id, |t| {
            if t.sprint_id == Some(sprint_id) {
                t.sprint_id = None;
            }
        });

        info!(sprint_id, task_id, "task removed from sprint");
        self.invalidate_all();
        Ok(())
    }

    /// Status and detail responses may omit members; keep the local list
    fn keep_members(&self, mut sprint: Sprint) -> Sprint {
        if sprint.task_ids.is_empty() {
            if let Some(local) = self.sprints.borrow().store().get(&sprint.id) {
                sprint.task_ids = local.task_ids.clone();
            }
        }
        sprint
    }

    fn invalidate_all(&self) {
        self.sprints.borrow_mut().invalidate_all();
        self.tasks.borrow_mut().invalidate_all();
    }
}

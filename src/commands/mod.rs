//! Remote API Bindings
//!
//! The REST contract the core talks to, as an injectable trait. `HttpApi`
//! is the real implementation; tests use `testing::MockApi`.
//!
//! The core never retries. Every call is safe for the UI layer to repeat.

mod http;
mod sprint;
mod task;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::models::{Board, BoardId, Sprint, SprintId, Task, TaskId, TaskQuery, TaskStatus};

// Re-export all public items
pub use http::HttpApi;
pub use sprint::*;
pub use task::*;

/// Operations of the remote collaborator
///
/// Futures are not `Send`: the core runs on the browser's single event loop.
#[async_trait(?Send)]
pub trait RemoteApi {
    // ========================
    // Tasks
    // ========================

    /// `GET /tasks?{query}`
    async fn list_tasks(&self, query: &TaskQuery) -> ApiResult<Vec<Task>>;

    /// `GET /tasks/{id}`
    async fn get_task(&self, id: TaskId) -> ApiResult<Task>;

    /// `POST /tasks`
    async fn create_task(&self, args: &NewTask) -> ApiResult<Task>;

    /// `PUT /tasks/{id}`
    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> ApiResult<Task>;

    /// `PUT /tasks/{id}/status`
    async fn update_task_status(&self, id: TaskId, status: TaskStatus) -> ApiResult<Task>;

    /// `DELETE /tasks/{id}`
    async fn delete_task(&self, id: TaskId) -> ApiResult<()>;

    // ========================
    // Boards
    // ========================

    /// `GET /boards/{id}`
    async fn get_board(&self, id: BoardId) -> ApiResult<Board>;

    // ========================
    // Sprints
    // ========================

    /// `GET /sprints`
    async fn list_sprints(&self) -> ApiResult<Vec<Sprint>>;

    /// `POST /sprints`
    async fn create_sprint(&self, args: &NewSprint) -> ApiResult<Sprint>;

    /// `PUT /sprints/{id}`
    async fn update_sprint(&self, id: SprintId, patch: &SprintPatch) -> ApiResult<Sprint>;

    /// `DELETE /sprints/{id}`
    async fn delete_sprint(&self, id: SprintId) -> ApiResult<()>;

    /// `PUT /sprints/{id}/start`
    async fn start_sprint(&self, id: SprintId) -> ApiResult<Sprint>;

    /// `PUT /sprints/{id}/complete`
    async fn complete_sprint(&self, id: SprintId) -> ApiResult<Sprint>;

    /// `POST /sprints/{sprintId}/tasks/{taskId}`
    async fn add_task_to_sprint(&self, sprint_id: SprintId, task_id: TaskId) -> ApiResult<()>;

    /// `DELETE /sprints/{sprintId}/tasks/{taskId}`
    async fn remove_task_from_sprint(&self, sprint_id: SprintId, task_id: TaskId) -> ApiResult<()>;
}

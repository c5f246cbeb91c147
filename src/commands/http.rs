//! HTTP Remote API
//!
//! `RemoteApi` over REST with reqwest. Runs in the browser (fetch backend)
//! and natively. Responses go through `wire` before reaching the core.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use super::{
    sprint_complete_path, sprint_path, sprint_start_path, sprint_task_path, task_path,
    task_status_path, NewSprint, NewTask, RemoteApi, SprintPatch, StatusArgs, TaskPatch,
    SPRINTS_PATH, TASKS_PATH,
};
use crate::config::SyncConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{Board, BoardId, Sprint, SprintId, Task, TaskId, TaskQuery, TaskStatus};
use crate::wire;

/// REST client for the tracker API
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    config: SyncConfig,
}

impl HttpApi {
    pub fn new(config: SyncConfig) -> ApiResult<Self> {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(config.request_timeout());
        let client = builder.build().map_err(ApiError::from)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_root(), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and return the JSON body (`Null` for an empty body)
    async fn execute(&self, builder: RequestBuilder) -> ApiResult<Value> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "api response");

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&text, status.canonical_reason()),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Send and only check for failure (envelope included)
    async fn execute_unit(&self, builder: RequestBuilder) -> ApiResult<()> {
        let body = self.execute(builder).await?;
        wire::unwrap_envelope(body).map(|_| ())
    }
}

/// Prefer the server's `message` field over the raw body
fn error_message(body: &str, reason: Option<&str>) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| reason.unwrap_or("request failed").to_string())
}

#[async_trait(?Send)]
impl RemoteApi for HttpApi {
    async fn list_tasks(&self, query: &TaskQuery) -> ApiResult<Vec<Task>> {
        let body = self
            .execute(self.request(Method::GET, TASKS_PATH).query(query))
            .await?;
        wire::parse_tasks(body)
    }

    async fn get_task(&self, id: TaskId) -> ApiResult<Task> {
        let body = self.execute(self.request(Method::GET, &task_path(id))).await?;
        wire::parse_task(body)
    }

    async fn create_task(&self, args: &NewTask) -> ApiResult<Task> {
        let body = self
            .execute(self.request(Method::POST, TASKS_PATH).json(args))
            .await?;
        wire::parse_task(body)
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> ApiResult<Task> {
        let body = self
            .execute(self.request(Method::PUT, &task_path(id)).json(patch))
            .await?;
        wire::parse_task(body)
    }

    async fn update_task_status(&self, id: TaskId, status: TaskStatus) -> ApiResult<Task> {
        let body = self
            .execute(
                self.request(Method::PUT, &task_status_path(id))
                    .json(&StatusArgs { status }),
            )
            .await?;
        wire::parse_task(body)
    }

    async fn delete_task(&self, id: TaskId) -> ApiResult<()> {
        self.execute_unit(self.request(Method::DELETE, &task_path(id)))
            .await
    }

    async fn get_board(&self, id: BoardId) -> ApiResult<Board> {
        let body = self
            .execute(self.request(Method::GET, &format!("/boards/{}", id)))
            .await?;
        wire::parse_board(body)
    }

    async fn list_sprints(&self) -> ApiResult<Vec<Sprint>> {
        let body = self.execute(self.request(Method::GET, SPRINTS_PATH)).await?;
        wire::parse_sprints(body)
    }

    async fn create_sprint(&self, args: &NewSprint) -> ApiResult<Sprint> {
        let body = self
            .execute(self.request(Method::POST, SPRINTS_PATH).json(args))
            .await?;
        wire::parse_sprint(body)
    }

    async fn update_sprint(&self, id: SprintId, patch: &SprintPatch) -> ApiResult<Sprint> {
        let body = self
            .execute(self.request(Method::PUT, &sprint_path(id)).json(patch))
            .await?;
        wire::parse_sprint(body)
    }

    async fn delete_sprint(&self, id: SprintId) -> ApiResult<()> {
        self.execute_unit(self.request(Method::DELETE, &sprint_path(id)))
            .await
    }

    async fn start_sprint(&self, id: SprintId) -> ApiResult<Sprint> {
        let body = self
            .execute(self.request(Method::PUT, &sprint_start_path(id)))
            .await?;
        wire::parse_sprint(body)
    }

    async fn complete_sprint(&self, id: SprintId) -> ApiResult<Sprint> {
        let body = self
            .execute(self.request(Method::PUT, &sprint_complete_path(id)))
            .await?;
        wire::parse_sprint(body)
    }

    async fn add_task_to_sprint(&self, sprint_id: SprintId, task_id: TaskId) -> ApiResult<()> {
        self.execute_unit(self.request(Method::POST, &sprint_task_path(sprint_id, task_id)))
            .await
    }

    async fn remove_task_from_sprint(&self, sprint_id: SprintId, task_id: TaskId) -> ApiResult<()> {
        self.execute_unit(self.request(Method::DELETE, &sprint_task_path(sprint_id, task_id)))
            .await
    }
}

//! Wire Payloads
//!
//! Loose shapes of what the server sends, parsed into validated models at
//! the boundary. A payload missing a required field is rejected with
//! `ApiError::MissingField` instead of being trusted.
//!
//! Bodies may arrive bare or wrapped in a `{code, message, data}` envelope,
//! and lists may be plain arrays or `{items, total, page, pageSize}` pages.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    Board, BoardColumn, BoardId, ColumnId, Sprint, SprintId, SprintStatus, Task, TaskId,
    TaskPriority, TaskStatus,
};

fn required<T>(value: Option<T>, entity: &'static str, field: &'static str) -> ApiResult<T> {
    value.ok_or(ApiError::MissingField { entity, field })
}

// ========================
// Payload Structs
// ========================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub id: Option<TaskId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub column_id: Option<ColumnId>,
    pub sprint_id: Option<SprintId>,
    pub order: Option<i32>,
    /// Older endpoints call the rank `position`
    pub position: Option<i32>,
    pub sprint_order: Option<i32>,
    pub assignee_id: Option<u32>,
    pub assignee: Option<UserRef>,
    pub labels: Option<Vec<String>>,
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRef {
    pub id: Option<u32>,
}

impl TryFrom<TaskPayload> for Task {
    type Error = ApiError;

    fn try_from(p: TaskPayload) -> ApiResult<Self> {
        let status = required(p.status, "task", "status")?;
        let status = TaskStatus::parse(&status)
            .ok_or_else(|| ApiError::Decode(format!("unknown task status `{}`", status)))?;
        let priority = match p.priority {
            Some(raw) => TaskPriority::parse(&raw)
                .ok_or_else(|| ApiError::Decode(format!("unknown task priority `{}`", raw)))?,
            None => TaskPriority::default(),
        };

        Ok(Task {
            id: required(p.id, "task", "id")?,
            title: required(p.title, "task", "title")?,
            description: p.description,
            status,
            priority,
            column_id: required(p.column_id, "task", "columnId")?,
            sprint_id: p.sprint_id,
            order: p.order.or(p.position).unwrap_or(0),
            sprint_order: p.sprint_order.unwrap_or(0),
            assignee_id: p.assignee_id.or(p.assignee.and_then(|a| a.id)),
            labels: p.labels.unwrap_or_default(),
            due_date: p.due_date,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSettings {
    pub wip_limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPayload {
    pub id: Option<ColumnId>,
    pub name: Option<String>,
    pub order: Option<i32>,
    pub wip_limit: Option<u32>,
    /// Some boards nest the limit under `settings`
    pub settings: Option<ColumnSettings>,
    pub status: Option<String>,
}

impl TryFrom<ColumnPayload> for BoardColumn {
    type Error = ApiError;

    fn try_from(p: ColumnPayload) -> ApiResult<Self> {
        let status = match p.status {
            Some(raw) => Some(
                TaskStatus::parse(&raw)
                    .ok_or_else(|| ApiError::Decode(format!("unknown column status `{}`", raw)))?,
            ),
            None => None,
        };
        Ok(BoardColumn {
            id: required(p.id, "column", "id")?,
            name: required(p.name, "column", "name")?,
            order: p.order.unwrap_or(0),
            wip_limit: p.wip_limit.or(p.settings.and_then(|s| s.wip_limit)),
            status,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPayload {
    pub id: Option<BoardId>,
    pub name: Option<String>,
    pub project_id: Option<u32>,
    #[serde(default)]
    pub columns: Vec<ColumnPayload>,
}

impl TryFrom<BoardPayload> for Board {
    type Error = ApiError;

    fn try_from(p: BoardPayload) -> ApiResult<Self> {
        let mut columns = p
            .columns
            .into_iter()
            .map(BoardColumn::try_from)
            .collect::<ApiResult<Vec<_>>>()?;
        columns.sort_by_key(|c| (c.order, c.id));
        Ok(Board {
            id: required(p.id, "board", "id")?,
            name: required(p.name, "board", "name")?,
            project_id: p.project_id,
            columns,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintPayload {
    pub id: Option<SprintId>,
    pub name: Option<String>,
    pub goal: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub task_ids: Option<Vec<TaskId>>,
    /// Embedded task list; only the ids are kept
    pub tasks: Option<Vec<TaskRef>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskRef {
    pub id: Option<TaskId>,
}

impl TryFrom<SprintPayload> for Sprint {
    type Error = ApiError;

    fn try_from(p: SprintPayload) -> ApiResult<Self> {
        let status = required(p.status, "sprint", "status")?;
        let status = SprintStatus::parse(&status)
            .ok_or_else(|| ApiError::Decode(format!("unknown sprint status `{}`", status)))?;
        let task_ids = match (p.task_ids, p.tasks) {
            (Some(ids), _) => ids,
            (None, Some(tasks)) => tasks
                .into_iter()
                .map(|t| required(t.id, "task", "id"))
                .collect::<ApiResult<Vec<_>>>()?,
            (None, None) => Vec::new(),
        };

        Ok(Sprint {
            id: required(p.id, "sprint", "id")?,
            name: required(p.name, "sprint", "name")?,
            goal: p.goal.or(p.description),
            status,
            task_ids,
            start_date: p.start_date,
            end_date: p.end_date,
        })
    }
}

// ========================
// Envelopes
// ========================

/// Strip a `{code, message, data}` envelope; a failing `code` is an error
pub fn unwrap_envelope(body: Value) -> ApiResult<Value> {
    let Value::Object(mut map) = body else {
        return Ok(body);
    };
    if !(map.contains_key("code") && map.contains_key("data")) {
        return Ok(Value::Object(map));
    }

    let code = map.get("code").and_then(Value::as_u64).unwrap_or(0);
    if code != 0 && code != 200 {
        let message = map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request failed")
            .to_string();
        return Err(ApiError::Status {
            status: u16::try_from(code).unwrap_or(u16::MAX),
            message,
        });
    }
    Ok(map.remove("data").unwrap_or(Value::Null))
}

/// Parse one record through its payload type
pub fn parse_one<P, T>(body: Value) -> ApiResult<T>
where
    P: DeserializeOwned,
    T: TryFrom<P, Error = ApiError>,
{
    let data = unwrap_envelope(body)?;
    let payload: P = serde_json::from_value(data)?;
    T::try_from(payload)
}

/// Parse a list (bare array or page) through its payload type
pub fn parse_list<P, T>(body: Value) -> ApiResult<Vec<T>>
where
    P: DeserializeOwned,
    T: TryFrom<P, Error = ApiError>,
{
    let items = match unwrap_envelope(body)? {
        Value::Array(items) => items,
        Value::Object(mut page) => match page.remove("items") {
            Some(Value::Array(items)) => items,
            _ => return Err(ApiError::Decode("expected a list or a page of items".to_string())),
        },
        Value::Null => Vec::new(),
        other => return Err(ApiError::Decode(format!("expected a list, got {}", other))),
    };

    items
        .into_iter()
        .map(|item| {
            let payload: P = serde_json::from_value(item)?;
            T::try_from(payload)
        })
        .collect()
}

pub fn parse_task(body: Value) -> ApiResult<Task> {
    parse_one::<TaskPayload, Task>(body)
}

pub fn parse_tasks(body: Value) -> ApiResult<Vec<Task>> {
    parse_list::<TaskPayload, Task>(body)
}

pub fn parse_sprint(body: Value) -> ApiResult<Sprint> {
    parse_one::<SprintPayload, Sprint>(body)
}

pub fn parse_sprints(body: Value) -> ApiResult<Vec<Sprint>> {
    parse_list::<SprintPayload, Sprint>(body)
}

pub fn parse_board(body: Value) -> ApiResult<Board> {
    parse_one::<BoardPayload, Board>(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_task() {
        let task = parse_task(json!({
            "id": 7,
            "title": "Ship it",
            "status": "IN_PROGRESS",
            "priority": "HIGH",
            "columnId": 2,
            "sprintId": 3,
            "order": 4,
            "assignee": { "id": 11 }
        }))
        .unwrap();

        assert_eq!(task.id, 7);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.sprint_id, Some(3));
        assert_eq!(task.order, 4);
        assert_eq!(task.assignee_id, Some(11));
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = parse_task(json!({ "id": 7, "title": "x", "status": "TODO" })).unwrap_err();
        assert_eq!(
            err,
            ApiError::MissingField {
                entity: "task",
                field: "columnId"
            }
        );
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = parse_task(json!({ "id": 1, "title": "x", "status": "LOST", "columnId": 1 })).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_position_fallback() {
        let task = parse_task(json!({ "id": 1, "title": "x", "status": "TODO", "columnId": 1, "position": 5 })).unwrap();
        assert_eq!(task.order, 5);
    }

    #[test]
    fn test_envelope_and_page() {
        let tasks = parse_tasks(json!({
            "code": 200,
            "message": "ok",
            "data": {
                "items": [
                    { "id": 1, "title": "a", "status": "TODO", "columnId": 1 },
                    { "id": 2, "title": "b", "status": "DONE", "columnId": 1 }
                ],
                "total": 2,
                "page": 1,
                "pageSize": 10
            }
        }))
        .unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].status, TaskStatus::Done);
    }

    #[test]
    fn test_envelope_error_code() {
        let err = parse_tasks(json!({ "code": 403, "message": "forbidden", "data": null })).unwrap_err();
        assert_eq!(
            err,
            ApiError::Status {
                status: 403,
                message: "forbidden".to_string()
            }
        );
    }

    #[test]
    fn test_sprint_with_embedded_tasks() {
        let sprint = parse_sprint(json!({
            "id": 3,
            "name": "Sprint 3",
            "description": "finish board",
            "status": "ACTIVE",
            "tasks": [ { "id": 4, "title": "ignored" }, { "id": 9 } ]
        }))
        .unwrap();

        assert_eq!(sprint.status, SprintStatus::Active);
        assert_eq!(sprint.task_ids, vec![4, 9]);
        assert_eq!(sprint.goal.as_deref(), Some("finish board"));
    }

    #[test]
    fn test_board_columns_sorted_with_nested_limit() {
        let board = parse_board(json!({
            "id": 1,
            "name": "Main",
            "columns": [
                { "id": 12, "name": "Done", "order": 2, "status": "DONE" },
                { "id": 10, "name": "Todo", "order": 0 },
                { "id": 11, "name": "Doing", "order": 1, "settings": { "wipLimit": 3 } }
            ]
        }))
        .unwrap();

        let ids: Vec<_> = board.columns.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        assert_eq!(board.columns[1].wip_limit, Some(3));
        assert_eq!(board.columns[2].status, Some(TaskStatus::Done));
    }

    #[test]
    fn test_null_list_is_empty() {
        assert!(parse_sprints(Value::Null).unwrap().is_empty());
    }
}

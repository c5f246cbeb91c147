//! Task Command Arguments
//!
//! Request bodies and paths for task endpoints.

use serde::Serialize;

use crate::models::{ColumnId, SprintId, Task, TaskId, TaskPriority, TaskStatus};

// ========================
// Argument Structs
// ========================

/// Body of `POST /tasks`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub column_id: ColumnId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<SprintId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, column_id: ColumnId) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            column_id,
            project_id: None,
            sprint_id: None,
            assignee_id: None,
            labels: Vec::new(),
            due_date: None,
        }
    }
}

/// Body of `PUT /tasks/{id}`; only set fields are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    /// `Some(None)` sends an explicit null (unassign)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_id: Option<ColumnId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_order: Option<i32>,
}

impl TaskPatch {
    /// Container/order update issued by a column move
    pub fn placement(column_id: ColumnId, order: i32) -> Self {
        Self {
            column_id: Some(column_id),
            order: Some(order),
            ..Default::default()
        }
    }

    pub fn order(order: i32) -> Self {
        Self {
            order: Some(order),
            ..Default::default()
        }
    }

    /// Rank update issued by a sprint or backlog move
    pub fn sprint_order(sprint_order: i32) -> Self {
        Self {
            sprint_order: Some(sprint_order),
            ..Default::default()
        }
    }

    pub fn assign(assignee_id: Option<u32>) -> Self {
        Self {
            assignee_id: Some(assignee_id),
            ..Default::default()
        }
    }

    /// Apply the set fields to a local copy
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assignee_id) = self.assignee_id {
            task.assignee_id = assignee_id;
        }
        if let Some(column_id) = self.column_id {
            task.column_id = column_id;
        }
        if let Some(order) = self.order {
            task.order = order;
        }
        if let Some(sprint_order) = self.sprint_order {
            task.sprint_order = sprint_order;
        }
    }
}

/// Body of `PUT /tasks/{id}/status`
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusArgs {
    pub status: TaskStatus,
}

// ========================
// Paths
// ========================

pub const TASKS_PATH: &str = "/tasks";

pub fn task_path(id: TaskId) -> String {
    format!("{}/{}", TASKS_PATH, id)
}

pub fn task_status_path(id: TaskId) -> String {
    format!("{}/{}/status", TASKS_PATH, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_skips_unset_fields() {
        let body = serde_json::to_value(TaskPatch::placement(4, 0)).unwrap();
        assert_eq!(body, json!({ "columnId": 4, "order": 0 }));

        let body = serde_json::to_value(TaskPatch::sprint_order(2)).unwrap();
        assert_eq!(body, json!({ "sprintOrder": 2 }));
    }

    #[test]
    fn test_unassign_sends_null() {
        let body = serde_json::to_value(TaskPatch::assign(None)).unwrap();
        assert_eq!(body, json!({ "assigneeId": null }));
    }

    #[test]
    fn test_patch_apply() {
        let mut task = Task::new(1, "old", 1, 0);
        let patch = TaskPatch {
            title: Some("new".to_string()),
            status: Some(TaskStatus::Done),
            ..TaskPatch::assign(Some(5))
        };
        patch.apply(&mut task);

        assert_eq!(task.title, "new");
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.assignee_id, Some(5));
        assert_eq!(task.column_id, 1);
    }

    #[test]
    fn test_paths() {
        assert_eq!(task_path(3), "/tasks/3");
        assert_eq!(task_status_path(3), "/tasks/3/status");
    }
}

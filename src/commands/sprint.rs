//! Sprint Command Arguments
//!
//! Request bodies and paths for sprint endpoints.

use serde::Serialize;

use crate::models::{Sprint, SprintId, TaskId};

// ========================
// Argument Structs
// ========================

/// Body of `POST /sprints`; the server assigns `PLANNING`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSprint {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl NewSprint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goal: None,
            start_date: None,
            end_date: None,
        }
    }
}

/// Body of `PUT /sprints/{id}`
///
/// Status is not patchable; it only moves through the lifecycle endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl SprintPatch {
    pub fn apply(&self, sprint: &mut Sprint) {
        if let Some(name) = &self.name {
            sprint.name = name.clone();
        }
        if let Some(goal) = &self.goal {
            sprint.goal = Some(goal.clone());
        }
        if let Some(start) = &self.start_date {
            sprint.start_date = Some(start.clone());
        }
        if let Some(end) = &self.end_date {
            sprint.end_date = Some(end.clone());
        }
    }
}

// ========================
// Paths
// ========================

pub const SPRINTS_PATH: &str = "/sprints";

pub fn sprint_path(id: SprintId) -> String {
    format!("{}/{}", SPRINTS_PATH, id)
}

pub fn sprint_start_path(id: SprintId) -> String {
    format!("{}/{}/start", SPRINTS_PATH, id)
}

pub fn sprint_complete_path(id: SprintId) -> String {
    format!("{}/{}/complete", SPRINTS_PATH, id)
}

pub fn sprint_task_path(sprint_id: SprintId, task_id: TaskId) -> String {
    format!("{}/{}/tasks/{}", SPRINTS_PATH, sprint_id, task_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(sprint_path(2), "/sprints/2");
        assert_eq!(sprint_start_path(2), "/sprints/2/start");
        assert_eq!(sprint_complete_path(2), "/sprints/2/complete");
        assert_eq!(sprint_task_path(2, 9), "/sprints/2/tasks/9");
    }

    #[test]
    fn test_patch_apply_leaves_status() {
        let mut sprint = Sprint::new(1, "S1");
        SprintPatch {
            name: Some("Renamed".to_string()),
            end_date: Some("2024-02-01".to_string()),
            ..Default::default()
        }
        .apply(&mut sprint);

        assert_eq!(sprint.name, "Renamed");
        assert_eq!(sprint.end_date.as_deref(), Some("2024-02-01"));
        assert_eq!(sprint.status, crate::models::SprintStatus::Planning);
    }
}

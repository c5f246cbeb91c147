//! Board Models
//!
//! Validated domain records held by the caches. Network payloads are parsed
//! into these types by [`crate::wire`]; nothing here trusts raw JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;

pub type TaskId = u32;
pub type ColumnId = u32;
pub type SprintId = u32;
pub type BoardId = u32;

// ========================
// Task
// ========================

/// Workflow status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    InReview,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::InReview => "IN_REVIEW",
            TaskStatus::Done => "DONE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TODO" => Some(TaskStatus::Todo),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "IN_REVIEW" => Some(TaskStatus::InReview),
            "DONE" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(TaskPriority::Low),
            "MEDIUM" => Some(TaskPriority::Medium),
            "HIGH" => Some(TaskPriority::High),
            _ => None,
        }
    }
}

/// A task card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Board column currently holding the task
    pub column_id: ColumnId,
    /// Sprint membership (None = backlog)
    pub sprint_id: Option<SprintId>,
    /// Dense rank inside its column
    pub order: i32,
    /// Dense rank inside its sprint, or inside the backlog
    #[serde(default)]
    pub sprint_order: i32,
    pub assignee_id: Option<u32>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub due_date: Option<String>,
}

impl Task {
    /// Create a task with defaults for everything but placement
    pub fn new(id: TaskId, title: impl Into<String>, column_id: ColumnId, order: i32) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            column_id,
            sprint_id: None,
            order,
            sprint_order: 0,
            assignee_id: None,
            labels: Vec::new(),
            due_date: None,
        }
    }

    pub fn with_sprint(mut self, sprint_id: SprintId) -> Self {
        self.sprint_id = Some(sprint_id);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_sprint_order(mut self, sprint_order: i32) -> Self {
        self.sprint_order = sprint_order;
        self
    }

    /// Rank used to lay out `container`: columns and sprint lists rank
    /// independently
    pub fn rank_in(&self, container: Container) -> i32 {
        match container {
            Container::Column(_) => self.order,
            Container::Sprint(_) | Container::Backlog => self.sprint_order,
        }
    }

    pub fn set_rank(&mut self, container: Container, rank: i32) {
        match container {
            Container::Column(_) => self.order = rank,
            Container::Sprint(_) | Container::Backlog => self.sprint_order = rank,
        }
    }

    /// Whether this task currently sits in `container`
    pub fn is_in(&self, container: Container) -> bool {
        match container {
            Container::Column(id) => self.column_id == id,
            Container::Sprint(id) => self.sprint_id == Some(id),
            Container::Backlog => self.sprint_id.is_none(),
        }
    }
}

impl Entity for Task {
    type Id = TaskId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

// ========================
// Board / Column
// ========================

/// A board column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub id: ColumnId,
    pub name: String,
    pub order: i32,
    /// Work-in-progress cap (None = unlimited, 0 = frozen)
    pub wip_limit: Option<u32>,
    /// Status boards key columns by task status
    pub status: Option<TaskStatus>,
}

impl BoardColumn {
    pub fn new(id: ColumnId, name: impl Into<String>, order: i32) -> Self {
        Self {
            id,
            name: name.into(),
            order,
            wip_limit: None,
            status: None,
        }
    }

    pub fn with_wip_limit(mut self, limit: u32) -> Self {
        self.wip_limit = Some(limit);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl Entity for BoardColumn {
    type Id = ColumnId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    pub project_id: Option<u32>,
    pub columns: Vec<BoardColumn>,
}

// ========================
// Sprint
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SprintStatus {
    #[default]
    Planning,
    Active,
    Completed,
}

impl SprintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SprintStatus::Planning => "PLANNING",
            SprintStatus::Active => "ACTIVE",
            SprintStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PLANNING" => Some(SprintStatus::Planning),
            "ACTIVE" => Some(SprintStatus::Active),
            "COMPLETED" => Some(SprintStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: SprintId,
    pub name: String,
    pub goal: Option<String>,
    pub status: SprintStatus,
    /// Member task ids, in server order
    #[serde(default)]
    pub task_ids: Vec<TaskId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Done/total counts for a sprint's progress bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SprintProgress {
    pub done: usize,
    pub total: usize,
}

impl SprintProgress {
    /// Completion in whole percent (0 for an empty sprint)
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.done * 100) / self.total) as u8
    }
}

impl Sprint {
    pub fn new(id: SprintId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            goal: None,
            status: SprintStatus::Planning,
            task_ids: Vec::new(),
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_status(mut self, status: SprintStatus) -> Self {
        self.status = status;
        self
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.task_ids.contains(&task_id)
    }

    /// Count member tasks that are done; ids missing from `tasks` still count
    /// towards the total
    pub fn progress<'a>(&self, tasks: impl IntoIterator<Item = &'a Task>) -> SprintProgress {
        let done = tasks
            .into_iter()
            .filter(|t| self.contains(t.id) && t.status == TaskStatus::Done)
            .count();
        SprintProgress {
            done,
            total: self.task_ids.len(),
        }
    }
}

impl Entity for Sprint {
    type Id = SprintId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

// ========================
// Containers & Queries
// ========================

/// Where a task can be dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// A board column (WIP-limited)
    Column(ColumnId),
    /// A sprint's task list
    Sprint(SprintId),
    /// Tasks not in any sprint
    Backlog,
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Column(id) => write!(f, "column:{}", id),
            Container::Sprint(id) => write!(f, "sprint:{}", id),
            Container::Backlog => f.write_str("backlog"),
        }
    }
}

/// Filters for `GET /tasks`; also the cache key source
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<BoardId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<SprintId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_id: Option<ColumnId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl TaskQuery {
    pub fn for_sprint(sprint_id: SprintId) -> Self {
        Self {
            sprint_id: Some(sprint_id),
            ..Default::default()
        }
    }

    pub fn for_board(board_id: BoardId) -> Self {
        Self {
            board_id: Some(board_id),
            ..Default::default()
        }
    }
}

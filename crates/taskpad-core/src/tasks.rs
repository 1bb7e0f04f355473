use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

/// Task status lifecycle. Serialized kebab-case to stay compatible with the
/// persisted layout (`"in-progress"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

impl TaskStatus {
    /// The fixed 3-cycle a toggle walks: todo → in-progress → completed → todo.
    pub fn advanced(self) -> Self {
        match self {
            TaskStatus::Todo => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Todo,
        }
    }
}

/// Checklist item owned by exactly one task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

/// Task entity. Field names serialize camelCase so snapshots written by the
/// original storage layout load unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<SubTask>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a task from caller-supplied fields; both timestamps start at now.
    pub fn new(id: String, draft: TaskDraft) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            status: draft.status,
            due_date: draft.due_date,
            tags: draft.tags,
            subtasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`. Every mutation path goes through here so the
    /// `updated_at >= created_at` invariant holds.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// True when the task should have a reminder: a due date exists and the
    /// task is not completed. Settings gating happens at the coordinator.
    pub fn wants_reminder(&self) -> bool {
        self.due_date.is_some() && self.status != TaskStatus::Completed
    }
}

/// Caller-supplied fields for task creation; id and timestamps are assigned
/// by the store.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// Partial update for a task. `None` leaves a field untouched; `due_date`
/// nests an Option so clearing the due date is expressible.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
    }
}

/// Status criterion for the view filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Is(TaskStatus),
}

/// Priority criterion for the view filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriorityFilter {
    #[default]
    All,
    Is(TaskPriority),
}

/// Transient view-selection state. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive substring matched against title and description.
    pub search: String,
    pub status: StatusFilter,
    pub priority: PriorityFilter,
    /// A task matches when it shares at least one tag, or this is empty.
    pub tags: Vec<String>,
}

//! The task store: single authoritative owner of the in-memory task
//! collection and the active view filter. Every mutation goes through here;
//! each one updates memory first, then persists the full snapshot, then
//! re-evaluates the reminder invariant for the affected task.
//!
//! Persistence and reminder calls are best effort: their failures are logged
//! and never surface through a mutation's return value. Mutations aimed at a
//! missing id report `Mutation::NotFound` instead of erroring.

use std::sync::Arc;

use taskpad_core::{
    filter::{all_tags, filtered_tasks},
    id::IdGenerator,
    scheduler::{PermissionState, ReminderScheduler},
    storage::DurableStore,
    tasks::{SubTask, Task, TaskDraft, TaskFilter, TaskPatch},
};
use taskpad_notify::{NotificationSettings, ReminderCoordinator};
use tracing::warn;

pub const TASKS_KEY: &str = "tasks";

/// Outcome of a mutation addressed at an existing task or subtask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// The mutation was applied; carries the task as it now stands.
    Applied(Task),
    /// No task (or subtask) with the given id exists. Recoverable; callers
    /// log and move on.
    NotFound,
}

impl Mutation {
    pub fn applied(self) -> Option<Task> {
        match self {
            Mutation::Applied(task) => Some(task),
            Mutation::NotFound => None,
        }
    }
}

/// Owns the task collection. Single mutator: the UI issues one command at a
/// time, so operations take `&mut self` and run to completion in order.
pub struct TaskStore<S: ReminderScheduler> {
    tasks: Vec<Task>,
    filter: TaskFilter,
    settings: NotificationSettings,
    store: Arc<dyn DurableStore>,
    ids: Arc<dyn IdGenerator>,
    reminders: ReminderCoordinator<S>,
}

impl<S: ReminderScheduler> TaskStore<S> {
    /// Load the persisted collection and settings. A missing or corrupt
    /// snapshot starts the store empty (logged, not fatal). The returned
    /// store is ready: callers must not issue commands before `init`
    /// resolves.
    pub async fn init(
        store: Arc<dyn DurableStore>,
        ids: Arc<dyn IdGenerator>,
        scheduler: S,
    ) -> Self {
        let reminders = ReminderCoordinator::new(store.clone(), scheduler);
        let settings = reminders.load_settings().await;
        let tasks = match store.get(TASKS_KEY).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(tasks) => tasks,
                Err(err) => {
                    warn!("corrupt task snapshot, starting empty: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("failed to load tasks, starting empty: {err}");
                Vec::new()
            }
        };

        Self {
            tasks,
            filter: TaskFilter::default(),
            settings,
            store,
            ids,
            reminders,
        }
    }

    /// The full collection in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The visible subset under the active filter, order preserved.
    pub fn filtered(&self) -> Vec<Task> {
        filtered_tasks(&self.tasks, &self.filter)
    }

    /// Distinct tags across the whole collection, sorted ascending.
    pub fn tags(&self) -> Vec<String> {
        all_tags(&self.tasks)
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    /// Replace the active filter wholesale. Pure view state; nothing is
    /// persisted.
    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    /// Create a task from caller-supplied fields, assign a fresh id and
    /// timestamps, append it, persist, and evaluate its reminder.
    pub async fn create_task(&mut self, draft: TaskDraft) -> Task {
        let task = Task::new(self.ids.new_id(), draft);
        self.tasks.push(task.clone());
        self.persist().await;
        self.reminders.on_task_changed(&task, &self.settings).await;
        task
    }

    /// Merge `patch` into the task named by `id`.
    pub async fn update_task(&mut self, id: &str, patch: TaskPatch) -> Mutation {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            warn!(id, "update for unknown task");
            return Mutation::NotFound;
        };
        patch.apply(task);
        task.touch();
        let task = task.clone();

        self.persist().await;
        self.reminders.on_task_changed(&task, &self.settings).await;
        Mutation::Applied(task)
    }

    /// Remove the task named by `id`. The reminder is cancelled first, and
    /// cancellation is attempted even when the id is unknown.
    pub async fn delete_task(&mut self, id: &str) -> Mutation {
        self.reminders.cancel_reminder(id).await;

        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            warn!(id, "delete for unknown task");
            return Mutation::NotFound;
        };
        let removed = self.tasks.remove(index);
        self.persist().await;
        Mutation::Applied(removed)
    }

    /// Advance the task's status one step along the fixed cycle
    /// todo → in-progress → completed → todo.
    pub async fn toggle_task_status(&mut self, id: &str) -> Mutation {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            warn!(id, "toggle for unknown task");
            return Mutation::NotFound;
        };
        task.status = task.status.advanced();
        task.touch();
        let task = task.clone();

        self.persist().await;
        self.reminders.on_task_changed(&task, &self.settings).await;
        Mutation::Applied(task)
    }

    /// Append a new unchecked subtask to the named task.
    pub async fn add_subtask(&mut self, task_id: &str, title: String) -> Mutation {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            warn!(task_id, "subtask add for unknown task");
            return Mutation::NotFound;
        };
        task.subtasks.push(SubTask {
            id: self.ids.new_id(),
            title,
            completed: false,
        });
        task.touch();
        let task = task.clone();

        self.persist().await;
        Mutation::Applied(task)
    }

    /// Flip the completion flag on the named subtask.
    pub async fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> Mutation {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            warn!(task_id, "subtask toggle for unknown task");
            return Mutation::NotFound;
        };
        let Some(subtask) = task.subtasks.iter_mut().find(|s| s.id == subtask_id) else {
            warn!(task_id, subtask_id, "toggle for unknown subtask");
            return Mutation::NotFound;
        };
        subtask.completed = !subtask.completed;
        task.touch();
        let task = task.clone();

        self.persist().await;
        Mutation::Applied(task)
    }

    /// Remove the named subtask.
    pub async fn delete_subtask(&mut self, task_id: &str, subtask_id: &str) -> Mutation {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            warn!(task_id, "subtask delete for unknown task");
            return Mutation::NotFound;
        };
        let Some(index) = task.subtasks.iter().position(|s| s.id == subtask_id) else {
            warn!(task_id, subtask_id, "delete for unknown subtask");
            return Mutation::NotFound;
        };
        task.subtasks.remove(index);
        task.touch();
        let task = task.clone();

        self.persist().await;
        Mutation::Applied(task)
    }

    /// Replace the notification settings, persist them, and rebuild every
    /// reminder under the new lead time / enabled state.
    pub async fn update_settings(&mut self, settings: NotificationSettings) {
        self.settings = settings;
        self.reminders.save_settings(&self.settings).await;
        self.reminders
            .reschedule_all(&self.tasks, &self.settings)
            .await;
    }

    /// Ask the platform for notification permission; the persisted settings
    /// (and our in-memory copy) follow the grant result.
    pub async fn request_permission(&mut self) -> PermissionState {
        let state = self.reminders.request_permission().await;
        self.settings = self.reminders.load_settings().await;
        state
    }

    // Persist the full snapshot as it stands right now. Whole-collection
    // writes keep the durable store convergent with memory even when an
    // earlier write is slow: the last mutation always writes last here,
    // because each mutation awaits its own write before returning.
    async fn persist(&self) {
        match serde_json::to_string(&self.tasks) {
            Ok(json) => {
                if let Err(err) = self.store.set(TASKS_KEY, &json).await {
                    warn!("failed to persist tasks: {err}");
                }
            }
            Err(err) => warn!("failed to serialize tasks: {err}"),
        }
    }
}

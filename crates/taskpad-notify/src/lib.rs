//! Reminder coordination: maps task due dates to one-shot reminders through
//! the platform `ReminderScheduler` capability, and keeps the task-id →
//! reminder-handle mapping durable so reminders survive process restarts.
//!
//! Every storage and scheduler failure in here is logged and swallowed; a
//! failed reminder must never fail the task mutation that triggered it.

use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use taskpad_core::{
    scheduler::{PermissionState, ReminderRequest, ReminderScheduler},
    storage::DurableStore,
    tasks::Task,
};
use tracing::{debug, warn};

pub const NOTIFICATION_SETTINGS_KEY: &str = "notification_settings";
pub const NOTIFICATION_IDS_KEY: &str = "notification_ids";

/// Process-wide reminder configuration, persisted as a single record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub enabled: bool,
    /// Minutes before the due date to fire the reminder. 0 = at the due date.
    pub reminder_time: i64,
    pub sound_enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            reminder_time: 30,
            sound_enabled: true,
        }
    }
}

/// Translates task state into scheduler calls. The single entry point the
/// task store drives after create/update/toggle is [`on_task_changed`];
/// everything else supports settings changes and restarts.
///
/// [`on_task_changed`]: ReminderCoordinator::on_task_changed
pub struct ReminderCoordinator<S: ReminderScheduler> {
    store: Arc<dyn DurableStore>,
    scheduler: S,
}

impl<S: ReminderScheduler> ReminderCoordinator<S> {
    pub fn new(store: Arc<dyn DurableStore>, scheduler: S) -> Self {
        Self { store, scheduler }
    }

    /// Load persisted settings; missing or corrupt records fall back to
    /// defaults (logged, never fatal).
    pub async fn load_settings(&self) -> NotificationSettings {
        match self.store.get(NOTIFICATION_SETTINGS_KEY).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!("corrupt notification settings, using defaults: {err}");
                    NotificationSettings::default()
                }
            },
            Ok(None) => NotificationSettings::default(),
            Err(err) => {
                warn!("failed to read notification settings, using defaults: {err}");
                NotificationSettings::default()
            }
        }
    }

    /// Persist settings (best effort).
    pub async fn save_settings(&self, settings: &NotificationSettings) {
        match serde_json::to_string(settings) {
            Ok(json) => {
                if let Err(err) = self.store.set(NOTIFICATION_SETTINGS_KEY, &json).await {
                    warn!("failed to save notification settings: {err}");
                }
            }
            Err(err) => warn!("failed to serialize notification settings: {err}"),
        }
    }

    /// Ask the platform for notification permission and record the outcome in
    /// the persisted settings (`enabled` follows the grant result). An
    /// already-granted permission is not prompted for again.
    pub async fn request_permission(&self) -> PermissionState {
        let existing = match self.scheduler.permission_state().await {
            Ok(state) => state,
            Err(err) => {
                warn!("permission query failed: {err}");
                PermissionState::Undetermined
            }
        };
        let state = if existing == PermissionState::Granted {
            existing
        } else {
            match self.scheduler.request_permission().await {
                Ok(state) => state,
                Err(err) => {
                    warn!("permission request failed: {err}");
                    PermissionState::Denied
                }
            }
        };

        let mut settings = self.load_settings().await;
        settings.enabled = state == PermissionState::Granted;
        self.save_settings(&settings).await;
        state
    }

    /// Schedule a reminder for `task` if it qualifies: has a due date, is not
    /// completed, notifications are enabled, and the computed fire time is
    /// still in the future. A fire time already in the past drops the
    /// reminder silently; there is no catch-up delivery.
    pub async fn schedule_reminder(&self, task: &Task, settings: &NotificationSettings) {
        if !settings.enabled || !task.wants_reminder() {
            return;
        }
        let Some(due_date) = task.due_date else {
            return;
        };

        // The lead time is caller-supplied and persisted; an out-of-range
        // value drops the reminder rather than aborting the mutation.
        let Some(lead) = Duration::try_minutes(settings.reminder_time) else {
            warn!(task_id = %task.id, "reminder lead time out of range, dropping");
            return;
        };
        let Some(fire_at) = due_date.checked_sub_signed(lead) else {
            warn!(task_id = %task.id, "reminder fire time out of range, dropping");
            return;
        };
        if fire_at <= Utc::now() {
            debug!(task_id = %task.id, "reminder window already passed, dropping");
            return;
        }

        // Replace any reminder already scheduled for this task.
        self.cancel_reminder(&task.id).await;

        let body = if task.description.is_empty() {
            "This task is due soon!".to_string()
        } else {
            task.description.clone()
        };
        let request = ReminderRequest {
            task_id: task.id.clone(),
            fire_at,
            title: format!("Reminder: {}", task.title),
            body,
            sound_enabled: settings.sound_enabled,
        };

        match self.scheduler.schedule(request).await {
            Ok(handle) => {
                let mut handles = self.load_handles().await;
                handles.insert(task.id.clone(), handle);
                self.save_handles(&handles).await;
            }
            Err(err) => warn!(task_id = %task.id, "failed to schedule reminder: {err}"),
        }
    }

    /// Cancel the reminder mapped to `task_id`, if any, and drop the mapping.
    pub async fn cancel_reminder(&self, task_id: &str) {
        let mut handles = self.load_handles().await;
        let Some(handle) = handles.remove(task_id) else {
            return;
        };

        if let Err(err) = self.scheduler.cancel(&handle).await {
            warn!(task_id, "failed to cancel reminder: {err}");
        }
        self.save_handles(&handles).await;
    }

    /// Cancel every mapped reminder, then schedule fresh ones for all
    /// qualifying tasks. Used when settings change.
    pub async fn reschedule_all(&self, tasks: &[Task], settings: &NotificationSettings) {
        let handles = self.load_handles().await;
        for task_id in handles.keys() {
            let task_id = task_id.clone();
            self.cancel_reminder(&task_id).await;
        }

        for task in tasks {
            if task.wants_reminder() {
                self.schedule_reminder(task, settings).await;
            }
        }
    }

    /// Re-evaluate the reminder invariant for one task: schedule when it
    /// qualifies, cancel otherwise.
    pub async fn on_task_changed(&self, task: &Task, settings: &NotificationSettings) {
        if task.wants_reminder() {
            self.schedule_reminder(task, settings).await;
        } else {
            self.cancel_reminder(&task.id).await;
        }
    }

    async fn load_handles(&self) -> HashMap<String, String> {
        match self.store.get(NOTIFICATION_IDS_KEY).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(handles) => handles,
                Err(err) => {
                    warn!("corrupt reminder bookkeeping, starting empty: {err}");
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(err) => {
                warn!("failed to read reminder bookkeeping: {err}");
                HashMap::new()
            }
        }
    }

    async fn save_handles(&self, handles: &HashMap<String, String>) {
        match serde_json::to_string(handles) {
            Ok(json) => {
                if let Err(err) = self.store.set(NOTIFICATION_IDS_KEY, &json).await {
                    warn!("failed to save reminder bookkeeping: {err}");
                }
            }
            Err(err) => warn!("failed to serialize reminder bookkeeping: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpad_core::{
        scheduler::RecordingScheduler,
        storage::InMemoryStore,
        tasks::{TaskDraft, TaskStatus},
    };

    fn coordinator() -> (
        ReminderCoordinator<RecordingScheduler>,
        RecordingScheduler,
        Arc<InMemoryStore>,
    ) {
        let store = Arc::new(InMemoryStore::new());
        let scheduler = RecordingScheduler::new();
        let coordinator = ReminderCoordinator::new(store.clone(), scheduler.clone());
        (coordinator, scheduler, store)
    }

    fn task_due_in(minutes: i64) -> Task {
        Task::new(
            "t-1".into(),
            TaskDraft {
                title: "Ship release".into(),
                due_date: Some(Utc::now() + Duration::minutes(minutes)),
                ..TaskDraft::default()
            },
        )
    }

    async fn persisted_handles(store: &InMemoryStore) -> HashMap<String, String> {
        match store.get(NOTIFICATION_IDS_KEY).await.expect("get") {
            Some(json) => serde_json::from_str(&json).expect("parse"),
            None => HashMap::new(),
        }
    }

    #[tokio::test]
    async fn task_without_due_date_never_reaches_scheduler() {
        let (coordinator, scheduler, _) = coordinator();
        let task = Task::new(
            "t-1".into(),
            TaskDraft {
                title: "Buy milk".into(),
                ..TaskDraft::default()
            },
        );
        coordinator
            .schedule_reminder(&task, &NotificationSettings::default())
            .await;
        assert_eq!(scheduler.schedule_count(), 0);
    }

    #[tokio::test]
    async fn past_fire_window_drops_reminder_without_handle() {
        let (coordinator, scheduler, store) = coordinator();
        // due in 10 minutes with a 30-minute lead: fire time is in the past
        let task = task_due_in(10);
        coordinator
            .schedule_reminder(&task, &NotificationSettings::default())
            .await;
        assert_eq!(scheduler.schedule_count(), 0);
        assert!(persisted_handles(&store).await.is_empty());
    }

    #[tokio::test]
    async fn future_due_date_persists_handle() {
        let (coordinator, scheduler, store) = coordinator();
        let task = task_due_in(120);
        coordinator
            .schedule_reminder(&task, &NotificationSettings::default())
            .await;

        assert_eq!(scheduler.schedule_count(), 1);
        let (handle, request) = &scheduler.scheduled()[0];
        assert_eq!(request.task_id, "t-1");
        assert_eq!(request.title, "Reminder: Ship release");
        assert_eq!(request.body, "This task is due soon!");
        assert_eq!(
            persisted_handles(&store).await.get("t-1"),
            Some(handle),
        );
    }

    #[tokio::test]
    async fn extreme_lead_time_drops_reminder() {
        let (coordinator, scheduler, store) = coordinator();
        let settings = NotificationSettings {
            reminder_time: i64::MAX,
            ..NotificationSettings::default()
        };
        coordinator
            .schedule_reminder(&task_due_in(120), &settings)
            .await;
        assert_eq!(scheduler.schedule_count(), 0);
        assert!(persisted_handles(&store).await.is_empty());
    }

    #[tokio::test]
    async fn negative_lead_schedules_after_due_date() {
        let (coordinator, scheduler, _) = coordinator();
        let settings = NotificationSettings {
            reminder_time: -60,
            ..NotificationSettings::default()
        };
        let task = task_due_in(30);
        coordinator.schedule_reminder(&task, &settings).await;
        assert_eq!(scheduler.schedule_count(), 1);
        let fire_at = scheduler.scheduled()[0].1.fire_at;
        assert!(fire_at > task.due_date.expect("due date"));
    }

    #[tokio::test]
    async fn disabled_settings_suppress_scheduling() {
        let (coordinator, scheduler, _) = coordinator();
        let settings = NotificationSettings {
            enabled: false,
            ..NotificationSettings::default()
        };
        coordinator
            .schedule_reminder(&task_due_in(120), &settings)
            .await;
        assert_eq!(scheduler.schedule_count(), 0);
    }

    #[tokio::test]
    async fn completed_task_is_cancelled_via_on_task_changed() {
        let (coordinator, scheduler, store) = coordinator();
        let settings = NotificationSettings::default();
        let mut task = task_due_in(120);
        coordinator.schedule_reminder(&task, &settings).await;
        assert_eq!(persisted_handles(&store).await.len(), 1);

        task.status = TaskStatus::Completed;
        coordinator.on_task_changed(&task, &settings).await;

        assert_eq!(scheduler.cancelled().len(), 1);
        assert!(persisted_handles(&store).await.is_empty());
    }

    #[tokio::test]
    async fn rescheduling_replaces_existing_handle() {
        let (coordinator, scheduler, store) = coordinator();
        let settings = NotificationSettings::default();
        let task = task_due_in(120);
        coordinator.schedule_reminder(&task, &settings).await;
        coordinator.schedule_reminder(&task, &settings).await;

        // second schedule cancelled the first handle before replacing it
        assert_eq!(scheduler.schedule_count(), 2);
        assert_eq!(scheduler.cancelled().len(), 1);
        assert_eq!(persisted_handles(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn cancel_without_mapping_is_a_no_op() {
        let (coordinator, scheduler, _) = coordinator();
        coordinator.cancel_reminder("ghost").await;
        assert!(scheduler.cancelled().is_empty());
    }

    #[tokio::test]
    async fn reschedule_all_rebuilds_mappings() {
        let (coordinator, scheduler, store) = coordinator();
        let settings = NotificationSettings::default();
        let first = task_due_in(120);
        let mut second = task_due_in(240);
        second.id = "t-2".into();

        coordinator.schedule_reminder(&first, &settings).await;
        coordinator
            .reschedule_all(&[first, second], &settings)
            .await;

        assert_eq!(scheduler.cancelled().len(), 1);
        let handles = persisted_handles(&store).await;
        assert_eq!(handles.len(), 2);
        assert!(handles.contains_key("t-1") && handles.contains_key("t-2"));
    }

    #[tokio::test]
    async fn settings_round_trip_and_default_on_corrupt() {
        let (coordinator, _, store) = coordinator();
        let settings = NotificationSettings {
            enabled: true,
            reminder_time: 5,
            sound_enabled: false,
        };
        coordinator.save_settings(&settings).await;
        assert_eq!(coordinator.load_settings().await, settings);

        store
            .set(NOTIFICATION_SETTINGS_KEY, "not json")
            .await
            .expect("set");
        assert_eq!(
            coordinator.load_settings().await,
            NotificationSettings::default()
        );
    }

    #[tokio::test]
    async fn granted_permission_keeps_notifications_enabled() {
        let store = Arc::new(InMemoryStore::new());
        let scheduler = RecordingScheduler::with_permission(PermissionState::Granted);
        let coordinator = ReminderCoordinator::new(store, scheduler);

        let state = coordinator.request_permission().await;
        assert_eq!(state, PermissionState::Granted);
        assert!(coordinator.load_settings().await.enabled);
    }

    #[tokio::test]
    async fn denied_permission_disables_notifications() {
        let store = Arc::new(InMemoryStore::new());
        let scheduler = RecordingScheduler::with_permission(PermissionState::Denied);
        let coordinator = ReminderCoordinator::new(store, scheduler);

        let state = coordinator.request_permission().await;
        assert_eq!(state, PermissionState::Denied);
        assert!(!coordinator.load_settings().await.enabled);
    }
}

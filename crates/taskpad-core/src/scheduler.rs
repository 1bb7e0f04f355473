use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced by reminder scheduler implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("scheduler failure: {reason}")]
    Scheduler { reason: String },
}

/// Platform notification permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    Undetermined,
}

/// One-shot reminder to be delivered at `fire_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    /// Carried as payload so the platform can route taps back to the task.
    pub task_id: String,
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
    pub sound_enabled: bool,
}

/// Contract for the platform reminder capability. `schedule` returns an
/// opaque handle the caller keeps for later cancellation.
#[async_trait]
pub trait ReminderScheduler: Send + Sync {
    async fn request_permission(&self) -> Result<PermissionState, SchedulerError>;

    async fn permission_state(&self) -> Result<PermissionState, SchedulerError>;

    async fn schedule(&self, request: ReminderRequest) -> Result<String, SchedulerError>;

    async fn cancel(&self, handle: &str) -> Result<(), SchedulerError>;
}

/// Placeholder scheduler for platforms without local notification delivery.
/// Grants permission, fabricates handles, and delivers nothing.
#[derive(Debug, Default)]
pub struct NoopScheduler {
    next_handle: AtomicU64,
}

#[async_trait]
impl ReminderScheduler for NoopScheduler {
    async fn request_permission(&self) -> Result<PermissionState, SchedulerError> {
        Ok(PermissionState::Granted)
    }

    async fn permission_state(&self) -> Result<PermissionState, SchedulerError> {
        Ok(PermissionState::Granted)
    }

    async fn schedule(&self, _request: ReminderRequest) -> Result<String, SchedulerError> {
        let n = self.next_handle.fetch_add(1, Ordering::Relaxed);
        Ok(format!("noop-{n}"))
    }

    async fn cancel(&self, _handle: &str) -> Result<(), SchedulerError> {
        Ok(())
    }
}

/// In-memory scheduler that records every call, for tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingScheduler {
    inner: Arc<Mutex<RecordingState>>,
}

#[derive(Debug, Default)]
struct RecordingState {
    next_handle: u64,
    scheduled: Vec<(String, ReminderRequest)>,
    cancelled: Vec<String>,
    permission: Option<PermissionState>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the platform answered `state` to permission queries.
    pub fn with_permission(state: PermissionState) -> Self {
        let scheduler = Self::default();
        scheduler.inner.lock().expect("lock").permission = Some(state);
        scheduler
    }

    /// Every (handle, request) pair passed to `schedule`, in call order.
    pub fn scheduled(&self) -> Vec<(String, ReminderRequest)> {
        self.inner.lock().expect("lock").scheduled.clone()
    }

    /// Every handle passed to `cancel`, in call order.
    pub fn cancelled(&self) -> Vec<String> {
        self.inner.lock().expect("lock").cancelled.clone()
    }

    pub fn schedule_count(&self) -> usize {
        self.inner.lock().expect("lock").scheduled.len()
    }
}

#[async_trait]
impl ReminderScheduler for RecordingScheduler {
    async fn request_permission(&self) -> Result<PermissionState, SchedulerError> {
        let guard = self.inner.lock().map_err(lock_err)?;
        Ok(guard.permission.unwrap_or(PermissionState::Granted))
    }

    async fn permission_state(&self) -> Result<PermissionState, SchedulerError> {
        let guard = self.inner.lock().map_err(lock_err)?;
        Ok(guard.permission.unwrap_or(PermissionState::Undetermined))
    }

    async fn schedule(&self, request: ReminderRequest) -> Result<String, SchedulerError> {
        let mut guard = self.inner.lock().map_err(lock_err)?;
        guard.next_handle += 1;
        let handle = format!("rec-{}", guard.next_handle);
        guard.scheduled.push((handle.clone(), request));
        Ok(handle)
    }

    async fn cancel(&self, handle: &str) -> Result<(), SchedulerError> {
        let mut guard = self.inner.lock().map_err(lock_err)?;
        guard.cancelled.push(handle.to_string());
        Ok(())
    }
}

fn lock_err<E: ToString>(err: E) -> SchedulerError {
    SchedulerError::Scheduler {
        reason: format!("lock poisoned: {}", err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_scheduler_tracks_calls() {
        let scheduler = RecordingScheduler::new();
        let handle = scheduler
            .schedule(ReminderRequest {
                task_id: "t-1".into(),
                fire_at: Utc::now(),
                title: "Reminder: Ship".into(),
                body: "due soon".into(),
                sound_enabled: true,
            })
            .await
            .expect("schedule");

        scheduler.cancel(&handle).await.expect("cancel");

        assert_eq!(scheduler.schedule_count(), 1);
        assert_eq!(scheduler.scheduled()[0].1.task_id, "t-1");
        assert_eq!(scheduler.cancelled(), vec![handle]);
    }

    #[tokio::test]
    async fn noop_scheduler_hands_out_distinct_handles() {
        let scheduler = NoopScheduler::default();
        let request = ReminderRequest {
            task_id: "t-1".into(),
            fire_at: Utc::now(),
            title: "r".into(),
            body: String::new(),
            sound_enabled: false,
        };
        let a = scheduler.schedule(request.clone()).await.expect("schedule");
        let b = scheduler.schedule(request).await.expect("schedule");
        assert_ne!(a, b);
    }
}

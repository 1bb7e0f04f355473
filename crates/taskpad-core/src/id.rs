use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Produces statistically-unique string identifiers for tasks and subtasks.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// Production generator backed by UUID v4.
#[derive(Debug, Default, Clone)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic generator for tests: `id-1`, `id-2`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl IdGenerator for SequentialIds {
    fn new_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("id-{n}")
    }
}

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

/// Poller liveness shared with the HTTP health endpoint.
#[derive(Debug, Clone, Default)]
pub struct HealthState {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    started: AtomicBool,
    last_block: AtomicU64,
    last_success_unix: AtomicI64,
    consecutive_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub started: bool,
    pub last_block: u64,
    pub last_success_unix: i64,
    pub consecutive_failures: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, block: u64) {
        self.inner.started.store(true, Ordering::Relaxed);
        self.inner.last_block.store(block, Ordering::Relaxed);
        self.inner
            .last_success_unix
            .store(Utc::now().timestamp(), Ordering::Relaxed);
        self.inner.consecutive_failures.store(0, Ordering::Relaxed);
    }

    pub fn record_failure(&self) -> u64 {
        self.inner.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            started: self.inner.started.load(Ordering::Relaxed),
            last_block: self.inner.last_block.load(Ordering::Relaxed),
            last_success_unix: self.inner.last_success_unix.load(Ordering::Relaxed),
            consecutive_failures: self.inner.consecutive_failures.load(Ordering::Relaxed),
        }
    }

    /// Healthy once a tick has succeeded within the last `stale_secs`.
    pub fn is_healthy(&self, stale_secs: u64) -> bool {
        let snap = self.snapshot();
        if !snap.started {
            return false;
        }
        let age = Utc::now().timestamp() - snap.last_success_unix;
        age <= stale_secs as i64
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::sse_broadcast_buffer;
use crate::store::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub store: MemoryStore,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    inserts_total: AtomicU64,
    updates_total: AtomicU64,
    deletes_total: AtomicU64,
    rejected_writes_total: AtomicU64,
    feed_subscribers_total: AtomicU64,
    lagged_feed_events_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservabilitySnapshot {
    pub inserts_total: u64,
    pub updates_total: u64,
    pub deletes_total: u64,
    pub rejected_writes_total: u64,
    pub feed_subscribers_total: u64,
    pub lagged_feed_events_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            inserts_total: self.inserts_total.load(Ordering::Relaxed),
            updates_total: self.updates_total.load(Ordering::Relaxed),
            deletes_total: self.deletes_total.load(Ordering::Relaxed),
            rejected_writes_total: self.rejected_writes_total.load(Ordering::Relaxed),
            feed_subscribers_total: self.feed_subscribers_total.load(Ordering::Relaxed),
            lagged_feed_events_total: self.lagged_feed_events_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_insert(&self) {
        self.inserts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update(&self) {
        self.updates_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_write(&self) {
        self.rejected_writes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feed_subscriber(&self) {
        self.feed_subscribers_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lagged_feed_events(&self, count: u64) {
        self.lagged_feed_events_total
            .fetch_add(count, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(sse_broadcast_buffer()))
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            store,
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

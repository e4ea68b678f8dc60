use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::Utc;
use claimloop_shared::{
    FeedEvent, Ring, StoreError, Territory, TerritoryId, TerritoryRecord, TerritoryStore,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// A creation event, serialized once and shared by every SSE subscriber via `Arc`.
#[derive(Debug, Clone)]
pub struct CreatedEvent {
    pub seq: u64,
    pub record: TerritoryRecord,
    pub json: Arc<Bytes>,
}

/// In-memory territory table. No central lock: each record is written independently and
/// the last writer wins.
#[derive(Clone)]
pub struct MemoryStore {
    territories: Arc<DashMap<TerritoryId, Territory>>,
    next_seq: Arc<AtomicU64>,
    event_tx: broadcast::Sender<CreatedEvent>,
}

impl MemoryStore {
    pub fn new(broadcast_buffer: usize) -> Self {
        let (event_tx, _) = broadcast::channel(broadcast_buffer);
        Self {
            territories: Arc::new(DashMap::new()),
            next_seq: Arc::new(AtomicU64::new(0)),
            event_tx,
        }
    }

    pub fn len(&self) -> usize {
        self.territories.len()
    }

    pub fn current_seq(&self) -> u64 {
        self.next_seq.load(Ordering::Relaxed)
    }

    pub fn events(&self) -> broadcast::Receiver<CreatedEvent> {
        self.event_tx.subscribe()
    }

    /// All territories, ordered by id.
    pub fn snapshot(&self) -> Vec<Territory> {
        let mut territories: Vec<Territory> = self
            .territories
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        territories.sort_by(|a, b| a.id.cmp(&b.id));
        territories
    }

    /// Feed event carrying every current territory, for subscribers that fell behind.
    pub fn resync_event(&self) -> FeedEvent {
        FeedEvent::Resync {
            seq: self.current_seq(),
            territories: self.snapshot().iter().map(Territory::to_record).collect(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn insert_territory(&self, territory: Territory) -> Result<TerritoryId, StoreError> {
        let record = territory.to_record();
        let id = territory.id.clone();
        match self.territories.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Rejected {
                    status: 409,
                    message: format!("territory {id} already exists"),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(territory);
            }
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.publish(seq, record);
        Ok(id)
    }

    pub fn update_territory(&self, id: &TerritoryId, ring: Ring) -> Result<(), StoreError> {
        match self.territories.get_mut(id) {
            Some(mut territory) => {
                territory.replace_ring(ring);
                Ok(())
            }
            None => Err(not_found(id)),
        }
    }

    pub fn delete_territory(&self, id: &TerritoryId) -> Result<(), StoreError> {
        self.territories
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    fn publish(&self, seq: u64, record: TerritoryRecord) {
        let event = FeedEvent::Created {
            seq,
            territory: record.clone(),
            timestamp: Utc::now().to_rfc3339(),
        };
        let json = match serde_json::to_vec(&event) {
            Ok(json) => Arc::new(Bytes::from(json)),
            Err(e) => {
                warn!(seq, error = %e, "failed to serialize created event; not broadcasting");
                return;
            }
        };
        // No receivers is fine: nobody is listening yet.
        let _ = self.event_tx.send(CreatedEvent { seq, record, json });
    }
}

fn not_found(id: &TerritoryId) -> StoreError {
    StoreError::Rejected {
        status: 404,
        message: format!("territory {id} not found"),
    }
}

impl TerritoryStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Territory>, StoreError> {
        Ok(self.snapshot())
    }

    async fn insert(&self, territory: &Territory) -> Result<TerritoryId, StoreError> {
        self.insert_territory(territory.clone())
    }

    async fn update(&self, id: &TerritoryId, ring: &Ring, _area_km2: f64) -> Result<(), StoreError> {
        self.update_territory(id, ring.clone())
    }

    async fn delete(&self, id: &TerritoryId) -> Result<(), StoreError> {
        self.delete_territory(id)
    }

    fn subscribe<F>(&self, on_create: F)
    where
        F: Fn(TerritoryRecord) + Send + Sync + 'static,
    {
        let mut rx = self.event_tx.subscribe();
        let store = self.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => on_create(event.record),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        info!(skipped, "in-process subscriber lagged; replaying all territories");
                        for record in store.resync_event().into_records() {
                            on_create(record);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

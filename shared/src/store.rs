//! The territory store contract and the commit step that pushes mutations into it.

use std::future::Future;

use tracing::warn;

use crate::error::StoreError;
use crate::geometry::Ring;
use crate::reconcile::Mutation;
use crate::territory::{Territory, TerritoryId, TerritoryRecord};

/// Shared, eventually-consistent holder of territory records. Last writer wins.
pub trait TerritoryStore: Send + Sync {
    /// Full snapshot, read once at startup.
    fn list(&self) -> impl Future<Output = Result<Vec<Territory>, StoreError>> + Send;

    /// Insert under the territory's id and return the id the store recorded.
    fn insert(
        &self,
        territory: &Territory,
    ) -> impl Future<Output = Result<TerritoryId, StoreError>> + Send;

    fn update(
        &self,
        id: &TerritoryId,
        ring: &Ring,
        area_km2: f64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete(&self, id: &TerritoryId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Push-only creation feed. Updates and deletes are never reported.
    fn subscribe<F>(&self, on_create: F)
    where
        F: Fn(TerritoryRecord) + Send + Sync + 'static;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReport {
    pub applied: usize,
    pub failures: Vec<StoreError>,
    /// Set when the store recorded the insert under a different id than proposed.
    pub rekeyed: Option<(TerritoryId, TerritoryId)>,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Send mutations to the store in order. Failures are logged and collected; nothing is
/// rolled back and later mutations are still attempted.
pub async fn commit<S: TerritoryStore>(store: &S, mutations: &[Mutation]) -> CommitReport {
    let mut report = CommitReport::default();
    for mutation in mutations {
        let result = match mutation {
            Mutation::Delete(id) => store.delete(id).await,
            Mutation::Update { id, ring, area_km2 } => store.update(id, ring, *area_km2).await,
            Mutation::Insert(territory) => match store.insert(territory).await {
                Ok(stored) => {
                    if stored != territory.id {
                        report.rekeyed = Some((territory.id.clone(), stored));
                    }
                    Ok(())
                }
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(()) => report.applied += 1,
            Err(e) => {
                warn!(
                    error = %e,
                    kind = mutation.kind(),
                    territory = %mutation.id(),
                    "store mutation failed; keeping local state"
                );
                report.failures.push(e);
            }
        }
    }
    report
}

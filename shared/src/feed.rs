//! Folding inbound creation notifications into the local territory set.
//!
//! The feed only reports inserts, and it echoes this client's own writes back, so folding
//! must be idempotent: a record is a duplicate when its id is already known or when its
//! coordinate sequence matches an existing territory exactly.

use tracing::debug;

use crate::error::InvalidInput;
use crate::territory::{Territory, TerritoryId, TerritoryRecord, TerritorySet};

#[derive(Debug, Clone, PartialEq)]
pub enum FoldOutcome {
    Added(TerritoryId),
    /// Already present under this id.
    Duplicate(TerritoryId),
    Invalid(InvalidInput),
}

/// Add `record` to `set` unless it is malformed or already present. Never removes or updates.
pub fn fold_created(set: &mut TerritorySet, record: TerritoryRecord) -> FoldOutcome {
    let territory = match Territory::try_from(record) {
        Ok(territory) => territory,
        Err(e) => {
            debug!(error = %e, "dropping malformed feed record");
            return FoldOutcome::Invalid(e);
        }
    };

    if set.contains(&territory.id) {
        return FoldOutcome::Duplicate(territory.id);
    }
    if let Some(existing) = set.find_by_ring(&territory.ring) {
        return FoldOutcome::Duplicate(existing.id.clone());
    }

    let id = territory.id.clone();
    set.insert(territory);
    FoldOutcome::Added(id)
}

/// Fold a batch (startup list or resync replay), returning how many were added.
pub fn fold_all(set: &mut TerritorySet, records: impl IntoIterator<Item = TerritoryRecord>) -> usize {
    records
        .into_iter()
        .map(|record| fold_created(set, record))
        .filter(|outcome| matches!(outcome, FoldOutcome::Added(_)))
        .count()
}

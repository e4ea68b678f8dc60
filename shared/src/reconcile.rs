//! Turns one capture event into the mutations that make up the new territory set.
//!
//! Order is fixed: merge own territories into the loop, subtract the merged ring from
//! every foreign territory, then replace the merged own territories with one new entry.
//! No step aborts the whole reconciliation; each failed sub-operation leaves its one
//! territory unchanged.

use tracing::{debug, info, warn};

use crate::algebra::{
    MIN_TERRITORY_AREA_KM2, SIMPLIFY_TOLERANCE_DEG, difference, overlaps, simplify, union,
};
use crate::error::{GeometryOpFailed, InvalidInput};
use crate::geometry::{Ring, area};
use crate::territory::{Owner, Territory, TerritoryId, TerritorySet};

/// A remainder within this many km² of its original area was only touched, not cut.
const UNCHANGED_AREA_EPS_KM2: f64 = 1e-9;

/// A player's freshly closed loop, not yet reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureEvent {
    pub owner: Owner,
    pub ring: Ring,
}

/// One store-level change. Applied locally first, then sent to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Delete(TerritoryId),
    Update {
        id: TerritoryId,
        ring: Ring,
        area_km2: f64,
    },
    Insert(Territory),
}

impl Mutation {
    pub fn id(&self) -> &TerritoryId {
        match self {
            Mutation::Delete(id) | Mutation::Update { id, .. } => id,
            Mutation::Insert(territory) => &territory.id,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Mutation::Delete(_) => "delete",
            Mutation::Update { .. } => "update",
            Mutation::Insert(_) => "insert",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileConfig {
    pub min_area_km2: f64,
    /// Applied to trimmed foreign remainders; `None` keeps them as computed.
    pub simplify_tolerance: Option<f64>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            min_area_km2: MIN_TERRITORY_AREA_KM2,
            simplify_tolerance: Some(SIMPLIFY_TOLERANCE_DEG),
        }
    }
}

/// What subtraction did to one foreign territory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForeignOutcome {
    Untouched,
    Trimmed { before_km2: f64, after_km2: f64 },
    Removed,
    Skipped(GeometryOpFailed),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// The single new territory for the capturing owner.
    pub committed: Territory,
    /// Deletes and updates of foreign territories, own deletes, then the insert.
    pub mutations: Vec<Mutation>,
    /// Own territories absorbed into `committed`.
    pub merged: Vec<TerritoryId>,
    /// Own territories that could not be unioned; they are kept as they are.
    pub unmerged: Vec<TerritoryId>,
    pub foreign: Vec<(TerritoryId, ForeignOutcome)>,
}

impl Reconciliation {
    pub fn removed_foreign(&self) -> usize {
        self.foreign
            .iter()
            .filter(|(_, outcome)| matches!(outcome, ForeignOutcome::Removed))
            .count()
    }

    pub fn trimmed_foreign(&self) -> usize {
        self.foreign
            .iter()
            .filter(|(_, outcome)| matches!(outcome, ForeignOutcome::Trimmed { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Compute the mutations for `capture` against `set` without touching it.
    ///
    /// Rejects loops whose area is below the minimum; nothing is committed for them.
    pub fn reconcile(
        &self,
        set: &TerritorySet,
        capture: CaptureEvent,
        fresh_id: TerritoryId,
    ) -> Result<Reconciliation, InvalidInput> {
        let CaptureEvent { owner, ring } = capture;
        let loop_area = area(&ring);
        if loop_area < self.config.min_area_km2 {
            return Err(InvalidInput::ZeroArea);
        }

        let (own, foreign): (Vec<&Territory>, Vec<&Territory>) =
            set.iter().partition(|t| t.owner == owner);

        let (merged_ring, merged, unmerged) = merge_own(ring, own);

        let mut mutations = Vec::new();
        let mut outcomes = Vec::with_capacity(foreign.len());
        for territory in foreign {
            let outcome = self.subtract(territory, &merged_ring, &mut mutations);
            outcomes.push((territory.id.clone(), outcome));
        }

        mutations.extend(merged.iter().cloned().map(Mutation::Delete));
        let committed = Territory::new(fresh_id, owner, merged_ring);
        mutations.push(Mutation::Insert(committed.clone()));

        let reconciliation = Reconciliation {
            committed,
            mutations,
            merged,
            unmerged,
            foreign: outcomes,
        };

        info!(
            %owner,
            loop_km2 = loop_area,
            committed_km2 = reconciliation.committed.area_km2,
            merged = reconciliation.merged.len(),
            unmerged = reconciliation.unmerged.len(),
            trimmed = reconciliation.trimmed_foreign(),
            removed = reconciliation.removed_foreign(),
            "capture reconciled"
        );

        Ok(reconciliation)
    }

    fn subtract(
        &self,
        territory: &Territory,
        merged_ring: &Ring,
        mutations: &mut Vec<Mutation>,
    ) -> ForeignOutcome {
        if !overlaps(&territory.ring, merged_ring) {
            return ForeignOutcome::Untouched;
        }

        let before_km2 = area(&territory.ring);
        match difference(&territory.ring, merged_ring) {
            Ok(None) => {
                mutations.push(Mutation::Delete(territory.id.clone()));
                ForeignOutcome::Removed
            }
            Ok(Some(rest)) => {
                let rest_km2 = area(&rest);
                if (before_km2 - rest_km2).abs() <= UNCHANGED_AREA_EPS_KM2 {
                    return ForeignOutcome::Untouched;
                }

                let rest = match self.config.simplify_tolerance {
                    Some(tolerance) => simplify(&rest, tolerance),
                    None => rest,
                };
                let after_km2 = area(&rest);
                if after_km2 < self.config.min_area_km2 {
                    mutations.push(Mutation::Delete(territory.id.clone()));
                    return ForeignOutcome::Removed;
                }

                mutations.push(Mutation::Update {
                    id: territory.id.clone(),
                    ring: rest,
                    area_km2: after_km2,
                });
                ForeignOutcome::Trimmed {
                    before_km2,
                    after_km2,
                }
            }
            Err(e) => {
                warn!(
                    territory = %territory.id,
                    owner = %territory.owner,
                    error = %e,
                    "difference failed; leaving territory untouched"
                );
                ForeignOutcome::Skipped(e)
            }
        }
    }
}

/// Union the loop with own territories, repeating passes until one merges nothing.
fn merge_own(loop_ring: Ring, own: Vec<&Territory>) -> (Ring, Vec<TerritoryId>, Vec<TerritoryId>) {
    let mut merged_ring = loop_ring;
    let mut merged = Vec::new();
    let mut pending = own;

    loop {
        let before = pending.len();
        let mut still_pending = Vec::new();
        for territory in pending {
            match union(&merged_ring, &territory.ring) {
                Ok(ring) => {
                    merged_ring = ring;
                    merged.push(territory.id.clone());
                }
                Err(e) => {
                    debug!(territory = %territory.id, error = %e, "union skipped");
                    still_pending.push(territory);
                }
            }
        }
        pending = still_pending;
        if pending.is_empty() || pending.len() == before {
            break;
        }
    }

    let unmerged = pending.into_iter().map(|t| t.id.clone()).collect();
    (merged_ring, merged, unmerged)
}

impl TerritorySet {
    /// Apply mutations in order. Updates of unknown ids are ignored.
    pub fn apply(&mut self, mutations: &[Mutation]) {
        for mutation in mutations {
            match mutation {
                Mutation::Delete(id) => {
                    self.remove(id);
                }
                Mutation::Update { id, ring, .. } => {
                    self.replace_ring(id, ring.clone());
                }
                Mutation::Insert(territory) => {
                    self.insert(territory.clone());
                }
            }
        }
    }
}

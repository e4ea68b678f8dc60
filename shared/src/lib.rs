pub mod algebra;
pub mod closure;
pub mod colors;
pub mod error;
pub mod events;
pub mod feed;
pub mod geometry;
pub mod ranking;
pub mod reconcile;
pub mod store;
pub mod territory;
pub mod travel;

pub use closure::{ClosureDecision, LOOP_CLOSE_THRESHOLD_M, Path};
pub use error::{GeometryOpFailed, InvalidInput, StoreError};
pub use events::*;
pub use feed::{FoldOutcome, fold_all, fold_created};
pub use geometry::{GeoPoint, Ring, area, distance};
pub use reconcile::{CaptureEvent, Mutation, ReconcileConfig, Reconciler, Reconciliation};
pub use store::{CommitReport, TerritoryStore, commit};
pub use territory::*;

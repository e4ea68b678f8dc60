//! One player's interactive session: the open path, the local territory view and the store.

use claimloop_shared::algebra::build_ring;
use claimloop_shared::ranking::{OwnerStanding, leaderboard, standings};
use claimloop_shared::travel::{PathStats, path_stats};
use claimloop_shared::{
    CaptureEvent, ClosureDecision, CommitReport, FoldOutcome, GeoPoint, InvalidInput, Owner, Path,
    Reconciler, Reconciliation, Ring, StoreError, TerritoryId, TerritoryRecord, TerritorySet,
    TerritoryStore, commit, fold_created,
};
use tracing::{debug, info, warn};

/// A loop that was closed, reconciled and pushed to the store.
#[derive(Debug, Clone)]
pub struct Capture {
    pub ring: Ring,
    pub reconciliation: Reconciliation,
    pub report: CommitReport,
}

#[derive(Debug, Clone)]
pub enum ClickOutcome {
    /// The point extended the open path, which now holds `points` points.
    Appended { points: usize },
    Captured(Box<Capture>),
}

pub struct Session<S> {
    owner: Owner,
    store: S,
    reconciler: Reconciler,
    path: Path,
    territories: TerritorySet,
    walking_speed_kmh: f64,
}

impl<S: TerritoryStore> Session<S> {
    pub fn new(owner: Owner, store: S, reconciler: Reconciler, walking_speed_kmh: f64) -> Self {
        Self {
            owner,
            store,
            reconciler,
            path: Path::new(),
            territories: TerritorySet::new(),
            walking_speed_kmh,
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn path(&self) -> &[GeoPoint] {
        self.path.points()
    }

    pub fn territories(&self) -> &TerritorySet {
        &self.territories
    }

    /// Read the store's full snapshot into the local view. Returns how many were new.
    pub async fn load(&mut self) -> Result<usize, StoreError> {
        let stored = self.store.list().await?;
        let mut added = 0;
        for territory in stored {
            if !self.territories.contains(&territory.id) {
                self.territories.insert(territory);
                added += 1;
            }
        }
        info!(added, total = self.territories.len(), "loaded territories from store");
        Ok(added)
    }

    /// Handle one map click: extend the path or, near its start, capture the loop.
    ///
    /// A rejected loop (too small or degenerate) leaves the path as it was.
    pub async fn click(&mut self, point: GeoPoint) -> Result<ClickOutcome, InvalidInput> {
        if !point.is_finite() {
            return Err(InvalidInput::NonFiniteCoordinate {
                lat: point.lat,
                lng: point.lng,
            });
        }

        match self.path.decide(point) {
            ClosureDecision::Append(point) => {
                self.path.push(point);
                Ok(ClickOutcome::Appended {
                    points: self.path.len(),
                })
            }
            ClosureDecision::Close => self.capture().await.map(ClickOutcome::Captured),
        }
    }

    async fn capture(&mut self) -> Result<Box<Capture>, InvalidInput> {
        let ring = build_ring(self.path.points())?;
        let reconciliation = self.reconciler.reconcile(
            &self.territories,
            CaptureEvent {
                owner: self.owner,
                ring: ring.clone(),
            },
            TerritoryId::fresh(),
        )?;

        self.territories.apply(&reconciliation.mutations);
        self.path.reset();

        let report = commit(&self.store, &reconciliation.mutations).await;
        if let Some((proposed, stored)) = &report.rekeyed {
            debug!(%proposed, %stored, "store recorded capture under another id");
            self.territories.rekey(proposed, stored.clone());
        }
        if !report.is_clean() {
            warn!(
                failures = report.failures.len(),
                applied = report.applied,
                "capture kept locally; store is behind"
            );
        }

        Ok(Box::new(Capture {
            ring,
            reconciliation,
            report,
        }))
    }

    pub fn undo(&mut self) -> Option<GeoPoint> {
        self.path.undo()
    }

    pub fn reset(&mut self) {
        self.path.reset();
    }

    /// Fold a creation notification from the feed.
    pub fn fold(&mut self, record: TerritoryRecord) -> FoldOutcome {
        let outcome = fold_created(&mut self.territories, record);
        if let FoldOutcome::Added(id) = &outcome {
            debug!(territory = %id, "territory added from feed");
        }
        outcome
    }

    /// Totals per owner in the fixed owner order.
    pub fn ranking(&self) -> Vec<OwnerStanding> {
        standings(self.territories.iter())
    }

    pub fn leaderboard(&self) -> Vec<OwnerStanding> {
        leaderboard(self.territories.iter())
    }

    pub fn path_stats(&self) -> PathStats {
        path_stats(self.path.points(), self.walking_speed_kmh)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use claimloop_shared::reconcile::Mutation;
    use claimloop_shared::{Territory, geometry::EARTH_RADIUS_M};

    use super::*;

    /// In-memory store that records every call and can be switched offline.
    #[derive(Default)]
    pub(crate) struct RecordingStore {
        pub(crate) table: Mutex<BTreeMap<TerritoryId, Territory>>,
        pub(crate) calls: Mutex<Vec<String>>,
        pub(crate) offline: AtomicBool,
    }

    impl RecordingStore {
        fn log(&self, call: String) -> Result<(), StoreError> {
            self.calls.lock().expect("calls lock").push(call);
            if self.offline.load(Ordering::Relaxed) {
                return Err(StoreError::Unavailable("offline".to_string()));
            }
            Ok(())
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    impl TerritoryStore for RecordingStore {
        async fn list(&self) -> Result<Vec<Territory>, StoreError> {
            self.log("list".to_string())?;
            Ok(self
                .table
                .lock()
                .expect("table lock")
                .values()
                .cloned()
                .collect())
        }

        async fn insert(&self, territory: &Territory) -> Result<TerritoryId, StoreError> {
            self.log(format!("insert {}", territory.owner))?;
            self.table
                .lock()
                .expect("table lock")
                .insert(territory.id.clone(), territory.clone());
            Ok(territory.id.clone())
        }

        async fn update(
            &self,
            id: &TerritoryId,
            ring: &Ring,
            _area_km2: f64,
        ) -> Result<(), StoreError> {
            self.log(format!("update {id}"))?;
            if let Some(territory) = self.table.lock().expect("table lock").get_mut(id) {
                territory.replace_ring(ring.clone());
            }
            Ok(())
        }

        async fn delete(&self, id: &TerritoryId) -> Result<(), StoreError> {
            self.log(format!("delete {id}"))?;
            self.table.lock().expect("table lock").remove(id);
            Ok(())
        }

        fn subscribe<F>(&self, _on_create: F)
        where
            F: Fn(TerritoryRecord) + Send + Sync + 'static,
        {
        }
    }

    const ORIGIN: GeoPoint = GeoPoint::new(50.6722, 17.9253);

    /// Point `east_m` east and `north_m` north of the test origin.
    pub(crate) fn offset(east_m: f64, north_m: f64) -> GeoPoint {
        let d_lat = (north_m / EARTH_RADIUS_M).to_degrees();
        let d_lng = (east_m / (EARTH_RADIUS_M * ORIGIN.lat.to_radians().cos())).to_degrees();
        GeoPoint::new(ORIGIN.lat + d_lat, ORIGIN.lng + d_lng)
    }

    fn square_corners(east_m: f64, north_m: f64, side_m: f64) -> [GeoPoint; 4] {
        [
            offset(east_m, north_m),
            offset(east_m + side_m, north_m),
            offset(east_m + side_m, north_m + side_m),
            offset(east_m, north_m + side_m),
        ]
    }

    fn session(owner: Owner) -> Session<RecordingStore> {
        Session::new(owner, RecordingStore::default(), Reconciler::default(), 5.0)
    }

    /// Walk the four corners, then click next to the start to close.
    async fn draw_square(
        session: &mut Session<RecordingStore>,
        east_m: f64,
        north_m: f64,
        side_m: f64,
    ) -> Box<Capture> {
        let corners = square_corners(east_m, north_m, side_m);
        for corner in corners {
            let outcome = session.click(corner).await.expect("valid click");
            assert!(matches!(outcome, ClickOutcome::Appended { .. }));
        }
        let closing = offset(east_m + 3.0, north_m + 3.0);
        match session.click(closing).await.expect("closing click") {
            ClickOutcome::Captured(capture) => capture,
            other => panic!("expected a capture, got {other:?}"),
        }
    }

    fn foreign(id: &str, owner: Owner, east_m: f64, north_m: f64, side_m: f64) -> Territory {
        let ring = Ring::close(&square_corners(east_m, north_m, side_m)).expect("square ring");
        Territory::new(TerritoryId::new(id), owner, ring)
    }

    #[tokio::test]
    async fn closing_a_square_commits_one_territory() {
        let mut green = session(Owner::Green);
        let capture = draw_square(&mut green, 0.0, 0.0, 100.0).await;

        assert!(green.path().is_empty());
        assert_eq!(green.territories().len(), 1);
        let committed = &capture.reconciliation.committed;
        assert_eq!(committed.owner, Owner::Green);
        assert!((committed.area_km2 - 0.01).abs() < 0.0005);
        assert!(capture.report.is_clean());
        assert_eq!(green.store().calls(), vec!["insert green".to_string()]);
    }

    #[tokio::test]
    async fn capture_trims_half_covered_foreign_territory() {
        let mut green = session(Owner::Green);
        green
            .territories
            .insert(foreign("red-1", Owner::Red, 50.0, 0.0, 100.0));
        let red_before = green.territories().total_area_of(Owner::Red);

        let capture = draw_square(&mut green, 0.0, 0.0, 100.0).await;

        let red_after = green.territories().total_area_of(Owner::Red);
        assert!(((red_before - red_after) - 0.005).abs() < 0.0005);
        assert_eq!(capture.reconciliation.trimmed_foreign(), 1);
        assert_eq!(
            green.store().calls(),
            vec!["update red-1".to_string(), "insert green".to_string()]
        );
    }

    #[tokio::test]
    async fn adjacent_loop_merges_into_one_territory() {
        let mut green = session(Owner::Green);
        let first = draw_square(&mut green, 0.0, 0.0, 100.0).await;
        let second = draw_square(&mut green, 100.0, 0.0, 100.0).await;

        assert_eq!(green.territories().len(), 1);
        assert_eq!(
            second.reconciliation.merged,
            vec![first.reconciliation.committed.id.clone()]
        );
        assert!((green.territories().total_area_of(Owner::Green) - 0.02).abs() < 0.001);
        assert_eq!(
            green.store().calls().last().map(String::as_str),
            Some("insert green")
        );
        assert!(
            second
                .reconciliation
                .mutations
                .iter()
                .any(|m| matches!(m, Mutation::Delete(id) if *id == first.reconciliation.committed.id))
        );
    }

    #[tokio::test]
    async fn echo_of_own_capture_is_dropped() {
        let mut green = session(Owner::Green);
        let capture = draw_square(&mut green, 0.0, 0.0, 100.0).await;

        let mut echo = capture.reconciliation.committed.to_record();
        assert!(matches!(green.fold(echo.clone()), FoldOutcome::Duplicate(_)));

        // Same coordinates under a store-assigned id are still the same territory.
        echo.id = Some(TerritoryId::new("from-store"));
        assert!(matches!(green.fold(echo), FoldOutcome::Duplicate(_)));
        assert_eq!(green.territories().len(), 1);
    }

    #[tokio::test]
    async fn enclosing_loop_deletes_foreign_territory() {
        let mut green = session(Owner::Green);
        green
            .territories
            .insert(foreign("blue-1", Owner::Blue, 30.0, 30.0, 40.0));

        let capture = draw_square(&mut green, 0.0, 0.0, 100.0).await;

        assert_eq!(capture.reconciliation.removed_foreign(), 1);
        assert!(!green.territories().contains(&TerritoryId::new("blue-1")));
        assert_eq!(green.territories().total_area_of(Owner::Blue), 0.0);
        assert_eq!(green.store().calls()[0], "delete blue-1");
    }

    #[tokio::test]
    async fn store_failure_keeps_local_capture() {
        let mut green = session(Owner::Green);
        green.store.offline.store(true, Ordering::Relaxed);

        let capture = draw_square(&mut green, 0.0, 0.0, 100.0).await;

        assert!(!capture.report.is_clean());
        assert_eq!(capture.report.applied, 0);
        assert_eq!(green.territories().len(), 1);
        assert!(green.path().is_empty());
    }

    #[tokio::test]
    async fn tiny_loop_is_rejected_and_path_kept() {
        let mut green = session(Owner::Green);
        let [a, b, c, d] = square_corners(0.0, 0.0, 5.0);
        for corner in [a, b, c] {
            green.click(corner).await.expect("valid click");
        }

        // The fourth corner is already within closing range of the start.
        let err = green.click(d).await.expect_err("loop below minimum area");
        assert_eq!(err, InvalidInput::ZeroArea);
        assert_eq!(green.path().len(), 3);
        assert!(green.territories().is_empty());
        assert!(green.store().calls().is_empty());
    }

    #[tokio::test]
    async fn non_finite_click_is_rejected() {
        let mut green = session(Owner::Green);
        let err = green
            .click(GeoPoint::new(f64::NAN, 17.0))
            .await
            .expect_err("nan click");
        assert!(matches!(err, InvalidInput::NonFiniteCoordinate { .. }));
        assert!(green.path().is_empty());
    }

    #[tokio::test]
    async fn undo_reset_and_path_stats() {
        let mut green = session(Owner::Green);
        green.click(offset(0.0, 0.0)).await.expect("click");
        green.click(offset(1000.0, 0.0)).await.expect("click");
        green.click(offset(1000.0, 1000.0)).await.expect("click");

        let stats = green.path_stats();
        assert!((stats.distance_km - 2.0).abs() < 0.01);
        assert!((stats.minutes - 24.0).abs() < 0.2);

        assert_eq!(green.undo(), Some(offset(1000.0, 1000.0)));
        assert_eq!(green.path().len(), 2);
        green.reset();
        assert!(green.path().is_empty());
        assert_eq!(green.undo(), None);
    }

    #[tokio::test]
    async fn load_reads_store_snapshot_once() {
        let store = RecordingStore::default();
        let red = foreign("red-1", Owner::Red, 0.0, 0.0, 100.0);
        store
            .table
            .lock()
            .expect("table lock")
            .insert(red.id.clone(), red);
        let mut green = Session::new(Owner::Green, store, Reconciler::default(), 5.0);

        assert_eq!(green.load().await.expect("load"), 1);
        assert_eq!(green.load().await.expect("reload"), 0);
        let ranking = green.ranking();
        assert_eq!(ranking[1].owner, Owner::Red);
        assert_eq!(ranking[1].territories, 1);
        assert_eq!(green.leaderboard()[0].owner, Owner::Red);
    }
}

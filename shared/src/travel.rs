//! Path length/time figures and the interpolated positions used for loop playback.

use serde::{Deserialize, Serialize};

use crate::geometry::{GeoPoint, distance};

/// Playback advances one interpolated position per tick.
pub const TICK_INTERVAL_MS: u64 = 50;
const TICKS_PER_SECOND: f64 = 1000.0 / TICK_INTERVAL_MS as f64;

pub const DEFAULT_WALKING_SPEED_KMH: f64 = 5.0;

/// Upper bound on interpolated positions for one walk, not counting the given vertices.
pub const MAX_PLAYBACK_STEPS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathStats {
    pub distance_km: f64,
    pub minutes: f64,
}

/// Sum of haversine segment lengths in meters.
pub fn path_length_m(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|pair| distance(pair[0], pair[1])).sum()
}

/// Length and travel time at `speed_kmh`. A non-positive speed reports zero minutes.
pub fn path_stats(points: &[GeoPoint], speed_kmh: f64) -> PathStats {
    let distance_km = path_length_m(points) / 1000.0;
    let minutes = if speed_kmh.is_finite() && speed_kmh > 0.0 {
        distance_km / speed_kmh * 60.0
    } else {
        0.0
    };
    PathStats {
        distance_km,
        minutes,
    }
}

/// Positions visited when walking `points` at `speed_kmh`, one per tick.
///
/// Each segment is split into `floor(length / speed * ticks_per_second)` steps (at least one).
/// Slow walks are sped up uniformly so the whole walk stays within `MAX_PLAYBACK_STEPS`.
/// With a non-positive speed the walk jumps straight between the given points.
pub fn travel_positions(points: &[GeoPoint], speed_kmh: f64) -> Vec<GeoPoint> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    if !(speed_kmh.is_finite() && speed_kmh > 0.0) {
        return points.to_vec();
    }

    let speed_mps = speed_kmh * 1000.0 / 3600.0;
    let planned: Vec<f64> = points
        .windows(2)
        .map(|pair| distance(pair[0], pair[1]) / speed_mps * TICKS_PER_SECOND)
        .collect();
    let total: f64 = planned.iter().sum();
    let scale = if total > MAX_PLAYBACK_STEPS as f64 {
        MAX_PLAYBACK_STEPS as f64 / total
    } else {
        1.0
    };

    let mut positions = vec![first];
    for (pair, ticks) in points.windows(2).zip(planned) {
        let (from, to) = (pair[0], pair[1]);
        let steps = ((ticks * scale).floor() as usize).max(1);
        for step in 1..steps {
            let t = step as f64 / steps as f64;
            positions.push(GeoPoint::new(
                from.lat + (to.lat - from.lat) * t,
                from.lng + (to.lng - from.lng) * t,
            ));
        }
        positions.push(to);
    }
    positions
}

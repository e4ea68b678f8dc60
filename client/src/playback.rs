//! Replays a captured loop as a moving marker. Display only; gameplay never waits on it.

use std::time::Duration;

use claimloop_shared::travel::{TICK_INTERVAL_MS, travel_positions};
use claimloop_shared::{GeoPoint, Ring};
use tokio::time::MissedTickBehavior;

/// Walk `ring` at `speed_kmh`, calling `on_tick` with each position every 50 ms and with
/// `None` once the walk is done. Returns the number of positions shown.
pub async fn animate<F>(ring: &Ring, speed_kmh: f64, mut on_tick: F) -> usize
where
    F: FnMut(Option<GeoPoint>),
{
    let positions = travel_positions(ring.points(), speed_kmh);
    let mut ticker = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    for &position in &positions {
        ticker.tick().await;
        on_tick(Some(position));
    }
    on_tick(None);
    positions.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::offset;

    fn square(side_m: f64) -> Ring {
        Ring::close(&[
            offset(0.0, 0.0),
            offset(side_m, 0.0),
            offset(side_m, side_m),
            offset(0.0, side_m),
        ])
        .expect("square ring")
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_through_every_position_then_clears() {
        let ring = square(10.25);
        let mut seen = Vec::new();
        let started = tokio::time::Instant::now();

        // 10.25 m at 36 km/h takes 1.025 s: twenty whole ticks per side.
        let shown = animate(&ring, 36.0, |position| seen.push(position)).await;

        assert_eq!(shown, 81);
        assert_eq!(seen.len(), 82);
        assert_eq!(seen.first(), Some(&Some(offset(0.0, 0.0))));
        assert_eq!(seen[80], Some(offset(0.0, 0.0)));
        assert_eq!(seen.last(), Some(&None));
        assert!(started.elapsed() >= Duration::from_millis(80 * TICK_INTERVAL_MS));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_speed_jumps_between_vertices() {
        let ring = square(50.0);
        let mut count = 0;
        let shown = animate(&ring, 0.0, |position| {
            if position.is_some() {
                count += 1;
            }
        })
        .await;
        assert_eq!(shown, 5);
        assert_eq!(count, 5);
    }
}

use crate::geometry::{GeoPoint, distance};

/// A click this close to the path's first point closes the loop.
pub const LOOP_CLOSE_THRESHOLD_M: f64 = 20.0;

/// Points the path must already hold before a click may close it.
pub const MIN_LOOP_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClosureDecision {
    /// Treat the current path as the loop; the clicked point is not appended.
    Close,
    Append(GeoPoint),
}

pub fn decide(path: &[GeoPoint], next: GeoPoint) -> ClosureDecision {
    match path.first() {
        Some(&start)
            if path.len() >= MIN_LOOP_POINTS && distance(next, start) < LOOP_CLOSE_THRESHOLD_M =>
        {
            ClosureDecision::Close
        }
        _ => ClosureDecision::Append(next),
    }
}

/// One player's in-progress capture trail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    points: Vec<GeoPoint>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn decide(&self, next: GeoPoint) -> ClosureDecision {
        decide(&self.points, next)
    }

    pub fn push(&mut self, point: GeoPoint) {
        self.points.push(point);
    }

    /// Drop the most recent point.
    pub fn undo(&mut self) -> Option<GeoPoint> {
        self.points.pop()
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }

    /// Take the points out, leaving the path empty.
    pub fn take(&mut self) -> Vec<GeoPoint> {
        std::mem::take(&mut self.points)
    }
}

//! Polygon algebra over single-ring territories.
//!
//! Every operation works on the primary ring only: union must produce exactly one polygon,
//! and difference keeps the largest remaining part with its holes dropped.

use geo::{BooleanOps, Intersects, MultiPolygon, Polygon, Simplify};

use crate::error::{GeometryOpFailed, InvalidInput};
use crate::geometry::{GeoPoint, Ring, area};

/// Results smaller than this are slivers and are removed rather than stored.
pub const MIN_TERRITORY_AREA_KM2: f64 = 0.0001;

/// Default simplification tolerance in degrees (roughly 0.1 m).
pub const SIMPLIFY_TOLERANCE_DEG: f64 = 1e-6;

/// Close an in-progress path into a ring by repeating its first point.
pub fn build_ring(path: &[GeoPoint]) -> Result<Ring, InvalidInput> {
    Ring::close(path)
}

pub fn is_below_min_area(area_km2: f64) -> bool {
    area_km2 < MIN_TERRITORY_AREA_KM2
}

fn operand(ring: &Ring) -> Result<Polygon<f64>, GeometryOpFailed> {
    if ring.is_degenerate() {
        return Err(GeometryOpFailed::DegenerateInput);
    }
    Ok(ring.to_polygon())
}

/// Geometric union. Fails instead of approximating when the result is not one polygon.
pub fn union(a: &Ring, b: &Ring) -> Result<Ring, GeometryOpFailed> {
    let lhs = operand(a)?;
    let rhs = operand(b)?;
    let merged = lhs.union(&rhs);

    match merged.0.as_slice() {
        [] => Err(GeometryOpFailed::EmptyResult),
        [single] => Ring::from_polygon(single).ok_or(GeometryOpFailed::EmptyResult),
        _ => Err(GeometryOpFailed::Disjoint),
    }
}

/// Subtract `subtract` from `base`. `Ok(None)` means `base` is fully covered.
pub fn difference(base: &Ring, subtract: &Ring) -> Result<Option<Ring>, GeometryOpFailed> {
    let lhs = operand(base)?;
    let rhs = operand(subtract)?;
    Ok(primary_ring(&lhs.difference(&rhs)))
}

/// Cheap pre-check: do the two regions share any point (touching counts)?
pub fn overlaps(a: &Ring, b: &Ring) -> bool {
    a.to_polygon().intersects(&b.to_polygon())
}

/// Ramer-Douglas-Peucker simplification in degree space.
///
/// Falls back to the input when the result would lose its area or drop below 4 points.
pub fn simplify(ring: &Ring, tolerance: f64) -> Ring {
    if !(tolerance.is_finite() && tolerance > 0.0) {
        return ring.clone();
    }

    let simplified = ring.to_polygon().simplify(&tolerance);
    match Ring::from_polygon(&simplified) {
        Some(candidate) if candidate.points().len() >= 4 && !candidate.is_degenerate() => {
            candidate
        }
        _ => ring.clone(),
    }
}

fn primary_ring(parts: &MultiPolygon<f64>) -> Option<Ring> {
    parts
        .0
        .iter()
        .filter_map(Ring::from_polygon)
        .map(|ring| (area(&ring), ring))
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, ring)| ring)
}

use std::collections::HashSet;

use geo::{ChamberlainDuquetteArea, Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;

/// Mean Earth radius used for haversine distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Rings whose planar (degree-space) area falls below this are treated as collinear/empty.
const DEGENERATE_PLANAR_AREA_DEG2: f64 = 1e-14;

/// A WGS84 position. Boundary order is `[lat, lng]`; the algebra engine uses `x = lng, y = lat`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    pub const fn from_lat_lng(pair: [f64; 2]) -> Self {
        Self {
            lat: pair[0],
            lng: pair[1],
        }
    }

    pub const fn to_lat_lng(self) -> [f64; 2] {
        [self.lat, self.lng]
    }

    /// Engine-side coordinate (`x = lng`, `y = lat`).
    pub const fn to_coord(self) -> Coord<f64> {
        Coord {
            x: self.lng,
            y: self.lat,
        }
    }

    pub const fn from_coord(coord: Coord<f64>) -> Self {
        Self {
            lat: coord.y,
            lng: coord.x,
        }
    }

    fn bits(self) -> (u64, u64) {
        (self.lat.to_bits(), self.lng.to_bits())
    }
}

/// Great-circle distance in meters (haversine).
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Closed boundary of a region: first point repeated at the end, at least 3 distinct vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[f64; 2]>", into = "Vec<[f64; 2]>")]
pub struct Ring {
    points: Vec<GeoPoint>,
}

impl Ring {
    /// Close an open (or already closed) sequence of points into a ring.
    pub fn close(points: &[GeoPoint]) -> Result<Self, InvalidInput> {
        let mut open = points.to_vec();
        if open.len() > 1 && open.first().map(|p| p.bits()) == open.last().map(|p| p.bits()) {
            open.pop();
        }

        if let Some(bad) = open.iter().find(|p| !p.is_finite()) {
            return Err(InvalidInput::NonFiniteCoordinate {
                lat: bad.lat,
                lng: bad.lng,
            });
        }

        let distinct = distinct_points(&open);
        if distinct < 3 {
            return Err(InvalidInput::TooFewPoints { distinct });
        }

        let first = open[0];
        open.push(first);
        Ok(Self { points: open })
    }

    pub fn from_lat_lng(coords: &[[f64; 2]]) -> Result<Self, InvalidInput> {
        let points: Vec<GeoPoint> = coords.iter().copied().map(GeoPoint::from_lat_lng).collect();
        Self::close(&points)
    }

    pub fn to_lat_lng(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| p.to_lat_lng()).collect()
    }

    /// All points, closing repeat included.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Vertices without the closing repeat.
    pub fn vertices(&self) -> &[GeoPoint] {
        &self.points[..self.points.len() - 1]
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        let exterior: LineString<f64> = self.points.iter().map(|p| p.to_coord()).collect();
        Polygon::new(exterior, Vec::new())
    }

    /// Primary (exterior) ring of an engine polygon. Interior rings are discarded.
    pub fn from_polygon(polygon: &Polygon<f64>) -> Option<Self> {
        let points: Vec<GeoPoint> = polygon
            .exterior()
            .coords()
            .copied()
            .map(GeoPoint::from_coord)
            .collect();
        Self::close(&points).ok()
    }

    /// True when the ring encloses no measurable area (collinear or repeated vertices).
    pub fn is_degenerate(&self) -> bool {
        planar_area_deg2(self.vertices()) < DEGENERATE_PLANAR_AREA_DEG2
    }
}

impl TryFrom<Vec<[f64; 2]>> for Ring {
    type Error = InvalidInput;

    fn try_from(coords: Vec<[f64; 2]>) -> Result<Self, Self::Error> {
        Self::from_lat_lng(&coords)
    }
}

impl From<Ring> for Vec<[f64; 2]> {
    fn from(ring: Ring) -> Self {
        ring.to_lat_lng()
    }
}

/// Spherical area in km². Degenerate rings yield exactly `0.0`.
pub fn area(ring: &Ring) -> f64 {
    if ring.is_degenerate() {
        return 0.0;
    }
    let km2 = ring.to_polygon().chamberlain_duquette_unsigned_area().abs() / 1e6;
    if km2.is_finite() { km2 } else { 0.0 }
}

pub(crate) fn distinct_points(points: &[GeoPoint]) -> usize {
    points
        .iter()
        .map(|p| p.bits())
        .collect::<HashSet<_>>()
        .len()
}

/// Absolute shoelace area in degree space, translated to the first vertex to limit cancellation.
fn planar_area_deg2(vertices: &[GeoPoint]) -> f64 {
    let Some(origin) = vertices.first() else {
        return 0.0;
    };
    let mut twice = 0.0;
    for (i, a) in vertices.iter().enumerate() {
        let b = vertices[(i + 1) % vertices.len()];
        let (ax, ay) = (a.lng - origin.lng, a.lat - origin.lat);
        let (bx, by) = (b.lng - origin.lng, b.lat - origin.lat);
        twice += ax * by - bx * ay;
    }
    let planar = (twice / 2.0).abs();
    if planar.is_finite() { planar } else { 0.0 }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Degrees of latitude spanned by `meters` on the haversine sphere.
    pub(crate) fn lat_offset(meters: f64) -> f64 {
        (meters / EARTH_RADIUS_M).to_degrees()
    }

    /// Degrees of longitude spanned by `meters` at latitude `lat`.
    pub(crate) fn lng_offset(meters: f64, lat: f64) -> f64 {
        (meters / (EARTH_RADIUS_M * lat.to_radians().cos())).to_degrees()
    }

    /// Axis-aligned square ring with its south-west corner at `origin`.
    pub(crate) fn square(origin: GeoPoint, side_m: f64) -> Ring {
        rect(origin, side_m, side_m)
    }

    pub(crate) fn rect(origin: GeoPoint, width_m: f64, height_m: f64) -> Ring {
        let d_lat = lat_offset(height_m);
        let d_lng = lng_offset(width_m, origin.lat);
        Ring::close(&[
            origin,
            GeoPoint::new(origin.lat, origin.lng + d_lng),
            GeoPoint::new(origin.lat + d_lat, origin.lng + d_lng),
            GeoPoint::new(origin.lat + d_lat, origin.lng),
        ])
        .expect("rectangle ring")
    }

    pub(crate) const OPOLE: GeoPoint = GeoPoint::new(50.6722, 17.9253);

    #[test]
    fn distance_of_one_degree_latitude() {
        let d = distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 111_194.93).abs() < 1.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_identity() {
        let a = OPOLE;
        let b = GeoPoint::new(50.68, 17.93);
        assert_eq!(distance(a, a), 0.0);
        assert!((distance(a, b) - distance(b, a)).abs() < 1e-9);
    }

    #[test]
    fn hundred_meter_square_is_a_hundredth_of_a_square_km() {
        let ring = square(OPOLE, 100.0);
        let km2 = area(&ring);
        assert!((km2 - 0.01).abs() < 0.0005, "got {km2}");
    }

    #[test]
    fn collinear_ring_has_zero_area() {
        let ring = Ring::close(&[
            GeoPoint::new(50.0, 17.0),
            GeoPoint::new(50.001, 17.001),
            GeoPoint::new(50.002, 17.002),
        ])
        .expect("three distinct points");
        assert!(ring.is_degenerate());
        assert_eq!(area(&ring), 0.0);
    }

    #[test]
    fn repeated_points_have_zero_area() {
        let ring = Ring::close(&[
            GeoPoint::new(50.0, 17.0),
            GeoPoint::new(50.001, 17.0),
            GeoPoint::new(50.0, 17.0),
            GeoPoint::new(50.001, 17.0),
            GeoPoint::new(50.002, 17.0),
        ])
        .expect("three distinct points");
        assert_eq!(area(&ring), 0.0);
    }

    #[test]
    fn close_rejects_too_few_distinct_points() {
        let err = Ring::close(&[OPOLE, OPOLE, GeoPoint::new(50.0, 17.0)]).unwrap_err();
        assert_eq!(err, InvalidInput::TooFewPoints { distinct: 2 });
    }

    #[test]
    fn close_rejects_non_finite_coordinates() {
        let err = Ring::close(&[
            OPOLE,
            GeoPoint::new(f64::NAN, 17.0),
            GeoPoint::new(50.0, 17.0),
        ])
        .unwrap_err();
        assert!(matches!(err, InvalidInput::NonFiniteCoordinate { .. }));
    }

    #[test]
    fn close_does_not_double_an_existing_closing_point() {
        let a = GeoPoint::new(50.0, 17.0);
        let b = GeoPoint::new(50.001, 17.0);
        let c = GeoPoint::new(50.001, 17.001);
        let ring = Ring::close(&[a, b, c, a]).expect("closed input");
        assert_eq!(ring.points(), &[a, b, c, a]);
        assert_eq!(ring.vertices().len(), 3);
    }

    #[test]
    fn engine_coordinates_swap_axes() {
        let p = GeoPoint::new(50.5, 17.25);
        let c = p.to_coord();
        assert_eq!((c.x, c.y), (17.25, 50.5));
        assert_eq!(GeoPoint::from_coord(c), p);
    }

    #[test]
    fn ring_serializes_as_lat_lng_pairs() {
        let ring = square(OPOLE, 50.0);
        let json = serde_json::to_value(&ring).expect("serialize ring");
        let first = &json[0];
        assert_eq!(first[0].as_f64(), Some(OPOLE.lat));
        assert_eq!(first[1].as_f64(), Some(OPOLE.lng));

        let back: Ring = serde_json::from_value(json).expect("deserialize ring");
        assert_eq!(back, ring);
    }
}

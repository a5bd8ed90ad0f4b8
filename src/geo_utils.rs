//! # Geographic Utilities
//!
//! Pure geometry helpers used by ingestion and the spatial range queries.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points |
//! | [`calculate_distance`] | Same, taking raw `lat, lng` pairs |
//! | [`polyline_length`] | Total length of a route polyline in meters |
//! | [`polygon_contains_point`] | Point-in-polygon test (holes respected) |
//! | [`polygon_vertex_in_circle`] | Vertex-only polygon/circle overlap |
//! | [`polygon_edge_in_circle`] | Edge-based polygon/circle proximity |
//! | [`search_envelope`] | Bounding box guaranteed to contain a circle |
//!
//! ## Example
//!
//! ```rust
//! use care_layers::{GpsPoint, geo_utils};
//!
//! let taipei = GpsPoint::new(25.0330, 121.5654);
//! let kaohsiung = GpsPoint::new(22.6273, 120.3014);
//!
//! let dist = geo_utils::haversine_distance(&taipei, &kaohsiung);
//! assert!((dist - 296_788.0).abs() < 300.0);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances use the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_METERS`] (6,371,000 m). Range queries compare these
//! distances against a radius inclusively, so the same function must be used
//! everywhere a distance is reported or tested.
//!
//! ### Coordinate System
//!
//! All functions expect WGS84 degrees. GeoJSON positions are `[lng, lat]`.

use geo::{Contains, Coord, LineString, Point, Polygon};
use crate::{Bounds, GpsPoint};

/// Sphere radius used by every distance computation in this crate.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two points using the Haversine formula.
///
/// Returns the distance in meters along a spherical Earth of radius
/// [`EARTH_RADIUS_METERS`].
///
/// # Example
///
/// ```rust
/// use care_layers::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_556.0).abs() < 350.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    calculate_distance(p1.latitude, p1.longitude, p2.latitude, p2.longitude)
}

/// Haversine distance in meters between `(lat1, lng1)` and `(lat2, lng2)`.
pub fn calculate_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Calculate the total length of a polyline in meters.
///
/// Sums the haversine distance between consecutive points. Empty or single-point
/// lines return 0.0. Used when a route feature carries no upstream distance.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Convert a GeoJSON position (`[lng, lat, ..]`) into a point.
///
/// Returns `None` for positions with fewer than two ordinates.
#[inline]
pub fn position_to_point(position: &[f64]) -> Option<GpsPoint> {
    match position {
        [lng, lat, ..] => Some(GpsPoint::new(*lat, *lng)),
        _ => None,
    }
}

// =============================================================================
// Polygon Functions
// =============================================================================

fn ring_to_linestring(ring: &[Vec<f64>]) -> LineString<f64> {
    ring.iter()
        .filter_map(|p| position_to_point(p))
        .map(|p| Coord { x: p.longitude, y: p.latitude })
        .collect::<Vec<_>>()
        .into()
}

/// Check whether a polygon (GeoJSON rings: exterior first, then holes) contains a point.
///
/// Points inside a hole are outside the polygon. Points exactly on the
/// boundary are treated as outside.
///
/// # Example
///
/// ```rust
/// use care_layers::{GpsPoint, geo_utils};
///
/// let square = vec![vec![
///     vec![120.0, 24.0], vec![121.0, 24.0], vec![121.0, 25.0],
///     vec![120.0, 25.0], vec![120.0, 24.0],
/// ]];
/// assert!(geo_utils::polygon_contains_point(&square, &GpsPoint::new(24.5, 120.5)));
/// assert!(!geo_utils::polygon_contains_point(&square, &GpsPoint::new(26.0, 120.5)));
/// ```
pub fn polygon_contains_point(rings: &[Vec<Vec<f64>>], point: &GpsPoint) -> bool {
    let Some((exterior, holes)) = rings.split_first() else {
        return false;
    };
    if exterior.len() < 3 {
        return false;
    }

    let polygon = Polygon::new(
        ring_to_linestring(exterior),
        holes.iter().map(|h| ring_to_linestring(h)).collect(),
    );
    polygon.contains(&Point::new(point.longitude, point.latitude))
}

/// Vertex-only overlap test between a polygon and a circle.
///
/// Returns `true` if any vertex of any ring lies within `radius_meters` of
/// `center` (inclusive). A polygon whose edge crosses the circle without a
/// vertex inside, or that fully encloses the circle, is NOT detected; see
/// [`polygon_edge_in_circle`] and [`polygon_contains_point`] for those cases.
pub fn polygon_vertex_in_circle(rings: &[Vec<Vec<f64>>], center: &GpsPoint, radius_meters: f64) -> bool {
    rings
        .iter()
        .flatten()
        .filter_map(|p| position_to_point(p))
        .any(|vertex| haversine_distance(center, &vertex) <= radius_meters)
}

/// Check whether any polygon edge passes within `radius_meters` of `center`.
///
/// Edges are measured in a local equirectangular projection around the
/// center, which is accurate for radii of a few kilometers.
pub fn polygon_edge_in_circle(rings: &[Vec<Vec<f64>>], center: &GpsPoint, radius_meters: f64) -> bool {
    let cos_lat = center.latitude.to_radians().cos();
    let project = |p: &GpsPoint| -> (f64, f64) {
        let x = (p.longitude - center.longitude).to_radians() * cos_lat * EARTH_RADIUS_METERS;
        let y = (p.latitude - center.latitude).to_radians() * EARTH_RADIUS_METERS;
        (x, y)
    };

    rings.iter().any(|ring| {
        let points: Vec<(f64, f64)> = ring
            .iter()
            .filter_map(|p| position_to_point(p))
            .map(|p| project(&p))
            .collect();
        points
            .windows(2)
            .any(|w| segment_distance_to_origin(w[0], w[1]) <= radius_meters)
    })
}

/// Distance from the origin to segment `a`-`b` in projected meters.
fn segment_distance_to_origin(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (-(a.0 * dx + a.1 * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (px, py) = (a.0 + t * dx, a.1 + t * dy);
    (px * px + py * py).sqrt()
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute a lat/lng box that contains every point within `radius_meters` of `center`.
///
/// The box is derived from the haversine inequality, so it never excludes a
/// point the exact distance test would accept. Near the poles or across the
/// antimeridian the longitude span widens to the full `[-180, 180]` range.
pub fn search_envelope(center: &GpsPoint, radius_meters: f64) -> Bounds {
    const MARGIN: f64 = 1e-9;
    let angular = (radius_meters.max(0.0) / EARTH_RADIUS_METERS).min(std::f64::consts::PI);

    let d_lat = angular.to_degrees() * (1.0 + 1e-9) + MARGIN;
    let min_lat = (center.latitude - d_lat).max(-90.0);
    let max_lat = (center.latitude + d_lat).min(90.0);

    let extreme_lat = min_lat.abs().max(max_lat.abs());
    let cos_extreme = extreme_lat.to_radians().cos();
    let s = if cos_extreme > 0.0 {
        (angular / 2.0).sin() / cos_extreme
    } else {
        f64::INFINITY
    };

    let (min_lng, max_lng) = if s >= 1.0 {
        (-180.0, 180.0)
    } else {
        let d_lng = (2.0 * s.asin()).to_degrees() * (1.0 + 1e-9) + MARGIN;
        let lo = center.longitude - d_lng;
        let hi = center.longitude + d_lng;
        if lo < -180.0 || hi > 180.0 {
            (-180.0, 180.0)
        } else {
            (lo, hi)
        }
    };

    Bounds { min_lat, max_lat, min_lng, max_lng }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn square(min_lng: f64, min_lat: f64, size: f64) -> Vec<Vec<Vec<f64>>> {
        vec![vec![
            vec![min_lng, min_lat],
            vec![min_lng + size, min_lat],
            vec![min_lng + size, min_lat + size],
            vec![min_lng, min_lat + size],
            vec![min_lng, min_lat],
        ]]
    }

    #[test]
    fn test_distance_same_point() {
        assert_eq!(calculate_distance(24.1477, 120.6736, 24.1477, 120.6736), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = calculate_distance(24.15, 120.67, 24.20, 120.70);
        let b = calculate_distance(24.20, 120.70, 24.15, 120.67);
        assert_eq!(a, b);
    }

    #[test]
    fn test_distance_known_values() {
        // Reference values for a 6,371 km sphere, 0.1% tolerance
        let london_paris = calculate_distance(51.5074, -0.1278, 48.8566, 2.3522);
        assert!(approx_eq(london_paris, 343_556.06, 343.6));

        let taipei_kaohsiung = calculate_distance(25.0330, 121.5654, 22.6273, 120.3014);
        assert!(approx_eq(taipei_kaohsiung, 296_787.66, 296.8));

        let one_hundredth_lat = calculate_distance(24.15, 120.67, 24.16, 120.67);
        assert!(approx_eq(one_hundredth_lat, 1_111.95, 0.01));
    }

    #[test]
    fn test_polyline_length() {
        assert_eq!(polyline_length(&[]), 0.0);
        assert_eq!(polyline_length(&[GpsPoint::new(24.15, 120.67)]), 0.0);

        let line = vec![
            GpsPoint::new(24.15, 120.67),
            GpsPoint::new(24.16, 120.67),
            GpsPoint::new(24.17, 120.67),
        ];
        assert!(approx_eq(polyline_length(&line), 2_223.9, 0.1));
    }

    #[test]
    fn test_position_to_point() {
        let p = position_to_point(&[120.5, 24.5]).unwrap();
        assert_eq!(p.latitude, 24.5);
        assert_eq!(p.longitude, 120.5);
        assert!(position_to_point(&[120.5]).is_none());
    }

    #[test]
    fn test_polygon_contains_point_with_hole() {
        let mut rings = square(120.0, 24.0, 1.0);
        rings.push(vec![
            vec![120.4, 24.4],
            vec![120.6, 24.4],
            vec![120.6, 24.6],
            vec![120.4, 24.6],
            vec![120.4, 24.4],
        ]);

        assert!(polygon_contains_point(&rings, &GpsPoint::new(24.2, 120.2)));
        assert!(!polygon_contains_point(&rings, &GpsPoint::new(24.5, 120.5)));
        assert!(!polygon_contains_point(&rings, &GpsPoint::new(25.5, 120.5)));
        assert!(!polygon_contains_point(&[], &GpsPoint::new(24.5, 120.5)));
    }

    #[test]
    fn test_vertex_only_overlap() {
        let rings = square(120.0, 24.0, 0.01);
        let near_corner = GpsPoint::new(24.0, 120.0);
        assert!(polygon_vertex_in_circle(&rings, &near_corner, 10.0));

        // Circle fully inside a large polygon: no vertex nearby
        let big = square(120.0, 24.0, 1.0);
        let inside = GpsPoint::new(24.5, 120.5);
        assert!(!polygon_vertex_in_circle(&big, &inside, 2_000.0));
        assert!(polygon_contains_point(&big, &inside));
    }

    #[test]
    fn test_edge_overlap_without_vertex() {
        // Center 500m south of the middle of the bottom edge of a 1-degree square
        let big = square(120.0, 24.0, 1.0);
        let center = GpsPoint::new(24.0 - 500.0 / 111_195.0, 120.5);
        assert!(!polygon_vertex_in_circle(&big, &center, 2_000.0));
        assert!(polygon_edge_in_circle(&big, &center, 2_000.0));
        assert!(!polygon_edge_in_circle(&big, &center, 100.0));
    }

    #[test]
    fn test_search_envelope_contains_circle() {
        let center = GpsPoint::new(24.15, 120.67);
        let radius = 2_000.0;
        let env = search_envelope(&center, radius);

        // Points exactly on the circle in the cardinal directions fall inside the box
        let d_lat = (radius / EARTH_RADIUS_METERS).to_degrees();
        assert!(env.min_lat <= center.latitude - d_lat);
        assert!(env.max_lat >= center.latitude + d_lat);

        let east = GpsPoint::new(24.15, 120.67 + 0.0197);
        assert!(haversine_distance(&center, &east) <= radius);
        assert!(env.max_lng >= east.longitude);
    }

    #[test]
    fn test_search_envelope_wraps_near_pole() {
        let env = search_envelope(&GpsPoint::new(89.99, 10.0), 5_000.0);
        assert_eq!(env.min_lng, -180.0);
        assert_eq!(env.max_lng, 180.0);
        assert_eq!(env.max_lat, 90.0);
    }
}

//! Great-circle helpers over WGS84 coordinates.
//!
//! Coordinates use the `geo` convention: `x = longitude`, `y = latitude`,
//! both in degrees.

use geo::Coord;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Whether `coord` is a finite WGS84 position.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use truckify_core::geodesy::is_valid_coordinate;
///
/// assert!(is_valid_coordinate(Coord { x: -0.1, y: 51.5 }));
/// assert!(!is_valid_coordinate(Coord { x: 0.0, y: 91.0 }));
/// assert!(!is_valid_coordinate(Coord { x: f64::NAN, y: 0.0 }));
/// ```
#[must_use]
pub fn is_valid_coordinate(coord: Coord<f64>) -> bool {
    coord.x.is_finite()
        && coord.y.is_finite()
        && (-180.0..=180.0).contains(&coord.x)
        && (-90.0..=90.0).contains(&coord.y)
}

/// Great-circle distance between two coordinates in metres.
#[expect(
    clippy::float_arithmetic,
    reason = "haversine distance is inherently floating-point"
)]
#[must_use]
pub fn haversine_distance_m(from: Coord<f64>, to: Coord<f64>) -> f64 {
    let lat1 = from.y.to_radians();
    let lat2 = to.y.to_radians();
    let d_lat = (to.y - from.y).to_radians();
    let d_lon = (to.x - from.x).to_radians();
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Distance in metres from `point` to the segment from `start` to `end`.
///
/// The segment is projected onto a local equirectangular plane centred on
/// `point`, which is accurate to well under a percent for segments of a few
/// hundred kilometres away from the poles.
#[expect(
    clippy::float_arithmetic,
    reason = "planar projection uses floating-point geometry"
)]
#[must_use]
pub fn distance_to_segment_m(point: Coord<f64>, start: Coord<f64>, end: Coord<f64>) -> f64 {
    let scale_x = point.y.to_radians().cos() * EARTH_RADIUS_M;
    let project = |c: Coord<f64>| {
        (
            (c.x - point.x).to_radians() * scale_x,
            (c.y - point.y).to_radians() * EARTH_RADIUS_M,
        )
    };
    let (ax, ay) = project(start);
    let (bx, by) = project(end);
    let (dx, dy) = (bx - ax, by - ay);
    let length_sq = dx * dx + dy * dy;
    if length_sq <= f64::EPSILON {
        return haversine_distance_m(point, start);
    }
    // The point sits at the origin of the projected plane.
    let t = (-(ax * dx + ay * dy) / length_sq).clamp(0.0, 1.0);
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (cx * cx + cy * cy).sqrt()
}

/// Distance in metres from `point` to the polyline through `vertices`.
///
/// Returns `None` when `vertices` is empty; a single vertex degenerates to
/// the point-to-point distance.
#[must_use]
pub fn distance_to_polyline_m(point: Coord<f64>, vertices: &[Coord<f64>]) -> Option<f64> {
    match vertices {
        [] => None,
        [only] => Some(haversine_distance_m(point, *only)),
        _ => vertices
            .windows(2)
            .filter_map(|pair| match pair {
                [start, end] => Some(distance_to_segment_m(point, *start, *end)),
                _ => None,
            })
            .min_by(f64::total_cmp),
    }
}

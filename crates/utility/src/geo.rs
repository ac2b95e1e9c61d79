use itertools::Itertools;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A `[longitude, latitude]` pair in degrees (GeoJSON order).
pub type Position = [f64; 2];

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

pub fn longitude(position: &Position) -> f64 {
    position[0]
}

pub fn latitude(position: &Position) -> f64 {
    position[1]
}

pub fn is_finite(position: &Position) -> bool {
    position[0].is_finite() && position[1].is_finite()
}

/// Great-circle distance in meters between two positions.
/// Non-finite input yields `NaN`.
pub fn haversine_distance(a: &Position, b: &Position) -> f64 {
    let lat1_rad = to_radians(latitude(a));
    let lat2_rad = to_radians(latitude(b));

    let dlat = to_radians(latitude(b) - latitude(a));
    let dlon = to_radians(longitude(b) - longitude(a));

    let h = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Length of a polyline in meters. 0 for less than two points.
pub fn polyline_length(points: &[Position]) -> f64 {
    points
        .iter()
        .tuple_windows()
        .map(|(a, b)| haversine_distance(a, b))
        .sum()
}

/// Running length at every vertex. The first entry is 0 and the last one
/// equals `polyline_length(points)`.
pub fn cumulative_lengths(points: &[Position]) -> Vec<f64> {
    let mut lengths = Vec::with_capacity(points.len());
    let mut total = 0.0;
    if !points.is_empty() {
        lengths.push(total);
    }
    for (a, b) in points.iter().tuple_windows() {
        total += haversine_distance(a, b);
        lengths.push(total);
    }
    lengths
}

/// Linear interpolation in coordinate space, `t` in `[0, 1]`.
pub fn interpolate(a: &Position, b: &Position, t: f64) -> Position {
    [
        longitude(a) + (longitude(b) - longitude(a)) * t,
        latitude(a) + (latitude(b) - latitude(a)) * t,
    ]
}

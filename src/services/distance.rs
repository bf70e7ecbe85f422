// src/services/distance.rs
// DOCUMENTATION: Great-circle distance between two coordinates
// PURPOSE: Ranking metric used by the geocode resolver

use geo_types::Point;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two points (x = longitude, y = latitude, degrees)
/// DOCUMENTATION: Pure function; NaN inputs propagate as NaN
pub fn haversine_distance(a: Point<f64>, b: Point<f64>) -> f64 {
    let (lat1, lon1) = (a.y(), a.x());
    let (lat2, lon2) = (b.y(), b.x());

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);

    // Rounding can push h marginally past 1.0 for antipodal points
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());

    EARTH_RADIUS_M * c
}

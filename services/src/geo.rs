//! Great-circle distance on a spherical Earth.

/// Mean Earth radius in meters (spherical approximation).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two (latitude, longitude) pairs given
/// in degrees. Pure and deterministic; callers must ensure the inputs are
/// finite and within coordinate ranges, or the result propagates `NaN`.
pub fn distance_meters(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    let phi_a = lat_a.to_radians();
    let phi_b = lat_b.to_radians();
    let d_phi = (lat_b - lat_a).to_radians();
    let d_lambda = (lon_b - lon_a).to_radians();

    let a =
        (d_phi / 2.0).sin().powi(2) + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// True when both values are finite and within valid latitude/longitude
/// ranges.
pub fn coordinates_in_range(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

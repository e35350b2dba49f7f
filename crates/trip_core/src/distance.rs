//! Great-circle distances and straight-line route interpolation.

use chrono::{DateTime, Duration, Utc};

use crate::{Coordinate, PlanError};

/// Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates in kilometers.
pub fn distance_km(a: &Coordinate, b: &Coordinate) -> Result<f64, PlanError> {
    a.validate()?;
    b.validate()?;
    Ok(haversine_km(a, b))
}

/// Haversine distance without range checks, for already validated input.
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lng = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Linear interpolation in latitude/longitude space, `steps + 1` points.
///
/// Good enough for short trips; the points do not follow the great circle.
pub fn interpolate_path(
    origin: &Coordinate,
    destination: &Coordinate,
    steps: u32,
) -> Result<Vec<Coordinate>, PlanError> {
    origin.validate()?;
    destination.validate()?;
    if steps == 0 {
        return Err(PlanError::InvalidParameter {
            name: "steps",
            value: 0.0,
        });
    }

    let lat_diff = destination.latitude - origin.latitude;
    let lng_diff = destination.longitude - origin.longitude;
    let mut path = Vec::with_capacity(steps as usize + 1);
    path.push(*origin);
    for i in 1..steps {
        let ratio = f64::from(i) / f64::from(steps);
        path.push(Coordinate {
            latitude: origin.latitude + lat_diff * ratio,
            longitude: origin.longitude + lng_diff * ratio,
        });
    }
    // Pushed as-is so the last point is bit-identical to the destination
    path.push(*destination);
    Ok(path)
}

/// Total length of a path in kilometers.
pub fn path_length_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|leg| haversine_km(&leg[0], &leg[1])).sum()
}

/// Drive time in minutes for `km` at `speed_kmh`.
pub fn drive_minutes(km: f64, speed_kmh: f64) -> f64 {
    km / speed_kmh * 60.0
}

/// Convert fractional minutes to a millisecond-precision duration.
pub fn minutes_to_duration(minutes: f64) -> Duration {
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

/// Arrival instant when covering `distance_km` at `speed_kmh` from `from`.
pub fn estimated_arrival(distance_km: f64, speed_kmh: f64, from: DateTime<Utc>) -> DateTime<Utc> {
    from + minutes_to_duration(drive_minutes(distance_km, speed_kmh))
}

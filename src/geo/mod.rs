use crate::models::assignment::RouteEstimate;
use crate::models::courier::GeoPoint;

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Planar approximation of the distance between two points, projected at the
/// latitude of `from`. Adequate at city scale.
pub fn equirectangular_meters(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let delta_lat = (to.lat - from.lat) * METERS_PER_DEGREE;
    let delta_lng = (to.lng - from.lng) * METERS_PER_DEGREE * from.lat.to_radians().cos();

    (delta_lat * delta_lat + delta_lng * delta_lng).sqrt()
}

/// Straight-line estimate used when the routing service cannot answer.
pub fn fallback_estimate(from: &GeoPoint, to: &GeoPoint, speed_kmh: f64) -> RouteEstimate {
    let distance_meters = equirectangular_meters(from, to);
    let meters_per_hour = speed_kmh * 1_000.0;

    RouteEstimate {
        duration_seconds: distance_meters / meters_per_hour * 3_600.0,
        distance_meters,
    }
}

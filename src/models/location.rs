//! Geographic coordinates and great-circle distance

use validator::Validate;

const EARTH_RADIUS_KM: f64 = 6371.0;
const KM_TO_MILES: f64 = 0.621371;

/// Latitude/longitude pair, degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Validate)]
pub struct Coordinates {
    #[validate(range(min = "-90", max = "90"))]
    pub latitude: f64,
    #[validate(range(min = "-180", max = "180"))]
    pub longitude: f64,
}

/// Haversine great-circle distance in miles, used for sorting and filtering
/// listings by proximity only.
pub fn distance_miles(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos() * to.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c * KM_TO_MILES
}

//! Great-circle distance between locations.
//!
//! Straight-line distance is the only distance model the optimizer uses;
//! travel time is derived from it with an assumed average speed.

use crate::model::Location;

/// Earth radius in miles.
const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Haversine distance between two points in miles.
pub fn distance(from: &Location, to: &Location) -> f64 {
    let lat1_rad = from.latitude.to_radians();
    let lat2_rad = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lng = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_MILES * c
}

/// Convert a distance in miles to driving minutes at the given speed.
pub fn travel_minutes(miles: f64, speed_mph: f64) -> f64 {
    if speed_mph <= 0.0 {
        return 0.0;
    }
    miles / speed_mph * 60.0
}

//! Collaborator interfaces consumed by the optimizer.
//!
//! Weather, traffic and history are external services. Each is injected so
//! tests can substitute fixed implementations; failures are recovered by the
//! caller, never propagated.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::model::Location;

/// Conditions at an appointment's location and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub conditions: String,
    /// Degrees Fahrenheit.
    pub temperature: f64,
    pub wind_speed: f64,
    pub precipitation: f64,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            conditions: "clear".to_string(),
            temperature: 65.0,
            wind_speed: 0.0,
            precipitation: 0.0,
        }
    }
}

impl Weather {
    /// Rain or freezing temperatures slow down on-site work.
    pub fn slows_service(&self) -> bool {
        self.conditions.to_ascii_lowercase().contains("rain") || self.temperature <= 32.0
    }
}

pub trait WeatherProvider: Sync {
    fn weather_at(&self, location: &Location, time: NaiveDateTime) -> Result<Weather, ProviderError>;
}

/// Extra minutes of driving expected when heading to a location at a time.
pub trait TrafficProvider: Sync {
    fn traffic_delay(&self, location: &Location, time: NaiveDateTime) -> Result<f64, ProviderError>;
}

/// One observed service duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSample {
    pub customer_id: String,
    pub service_type: String,
    pub duration: f64,
}

/// Summary of a completed optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecord {
    pub date: NaiveDate,
    pub appointment_count: usize,
    pub assigned_count: usize,
    pub route_count: usize,
    pub total_distance: f64,
    pub total_travel_time: f64,
    pub optimization_score: f64,
    pub samples: Vec<ServiceSample>,
}

/// Store of prior optimization runs, keyed by date.
///
/// Implementations must allow concurrent reads; writes are single appends.
pub trait HistoricalStore: Sync {
    fn get(&self, date: NaiveDate) -> Vec<OptimizationRecord>;

    fn put(&self, record: OptimizationRecord) -> Result<(), ProviderError>;

    /// Drop every record dated before `cutoff`. Returns how many were dropped.
    fn evict_older_than(&self, cutoff: NaiveDate) -> usize;

    /// Average recorded duration for a service type at a customer.
    fn average_duration(&self, service_type: &str, customer_id: &str) -> Option<f64>;

    /// How much longer than average this customer's visits tend to take.
    fn complexity_factor(&self, _customer_id: &str) -> f64 {
        1.0
    }
}

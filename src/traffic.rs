//! Traffic delay providers.

use chrono::{NaiveDateTime, Timelike};

use crate::error::ProviderError;
use crate::model::Location;
use crate::traits::TrafficProvider;

/// Time-of-day traffic estimate.
///
/// Also used as the fallback whenever another traffic provider fails.
#[derive(Debug, Clone)]
pub struct RushHourTraffic {
    pub base_delay_minutes: f64,
    pub morning_multiplier: f64,
    pub evening_multiplier: f64,
}

impl Default for RushHourTraffic {
    fn default() -> Self {
        Self {
            base_delay_minutes: 5.0,
            morning_multiplier: 1.5,
            evening_multiplier: 1.8,
        }
    }
}

/// 07:00 to 09:59 and 16:00 to 18:59.
pub fn is_peak_hour(time: NaiveDateTime) -> bool {
    matches!(time.hour(), 7..=9 | 16..=18)
}

impl RushHourTraffic {
    pub fn delay_at(&self, time: NaiveDateTime) -> f64 {
        let multiplier = match time.hour() {
            7..=9 => self.morning_multiplier,
            16..=18 => self.evening_multiplier,
            _ => 1.0,
        };
        self.base_delay_minutes * multiplier
    }
}

impl TrafficProvider for RushHourTraffic {
    fn traffic_delay(&self, _location: &Location, time: NaiveDateTime) -> Result<f64, ProviderError> {
        Ok(self.delay_at(time))
    }
}

/// Constant delay regardless of place and time.
#[derive(Debug, Clone, Default)]
pub struct FixedTraffic(pub f64);

impl TrafficProvider for FixedTraffic {
    fn traffic_delay(&self, _location: &Location, _time: NaiveDateTime) -> Result<f64, ProviderError> {
        Ok(self.0)
    }
}

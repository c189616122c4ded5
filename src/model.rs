//! Input data model: locations, appointments and technicians.
//!
//! These are supplied by the scheduling collaborator and are never mutated by
//! the optimizer. Enrichment works on copies.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{OptimizerError, Result};

/// A geographic point in degrees with a free-text address.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: String,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: String::new(),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// High and urgent appointments earn a customer satisfaction bonus.
    pub fn is_elevated(self) -> bool {
        matches!(self, Priority::High | Priority::Urgent)
    }
}

/// A clock-time window within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomerPreferences {
    #[serde(default)]
    pub preferred_window: Option<TimeWindow>,
    #[serde(default)]
    pub access_notes: Option<String>,
    /// 1 (easy) to 5 (hard).
    #[serde(default)]
    pub difficulty: Option<u8>,
}

/// Adjustments recorded by enrichment.
///
/// `base_duration` is the duration before any adjustment so that enriching an
/// already enriched appointment starts from the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub base_duration: f64,
    pub weather_factor: f64,
    pub traffic_delay: f64,
    pub historical_override: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub location: Location,
    #[serde(with = "timestamp")]
    pub scheduled_time: NaiveDateTime,
    /// Estimated service duration in minutes.
    pub estimated_duration: f64,
    #[serde(default)]
    pub priority: Priority,
    pub service_type: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferences: Option<CustomerPreferences>,
    #[serde(default)]
    pub enrichment: Option<Enrichment>,
}

impl Appointment {
    pub fn difficulty(&self) -> Option<u8> {
        self.preferences.as_ref().and_then(|prefs| prefs.difficulty)
    }

    pub fn preferred_window(&self) -> Option<TimeWindow> {
        self.preferences.as_ref().and_then(|prefs| prefs.preferred_window)
    }

    /// Duration before enrichment adjusted it.
    pub fn base_duration(&self) -> f64 {
        self.enrichment
            .as_ref()
            .map_or(self.estimated_duration, |enrichment| enrichment.base_duration)
    }

    /// Traffic delay in minutes attached by enrichment, zero otherwise.
    pub fn traffic_delay(&self) -> f64 {
        self.enrichment
            .as_ref()
            .map_or(0.0, |enrichment| enrichment.traffic_delay)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(OptimizerError::invalid_appointment(&self.id, "id is empty"));
        }
        if self.customer_id.trim().is_empty() {
            return Err(OptimizerError::invalid_appointment(&self.id, "customer id is empty"));
        }
        if !self.estimated_duration.is_finite() || self.estimated_duration < 0.0 {
            return Err(OptimizerError::invalid_appointment(
                &self.id,
                format!("estimated duration {} is not a non-negative number", self.estimated_duration),
            ));
        }
        if !self.location.is_valid() {
            return Err(OptimizerError::invalid_appointment(
                &self.id,
                format!(
                    "location ({}, {}) is out of range",
                    self.location.latitude, self.location.longitude
                ),
            ));
        }
        if let Some(difficulty) = self.difficulty() {
            if !(1..=5).contains(&difficulty) {
                return Err(OptimizerError::invalid_appointment(
                    &self.id,
                    format!("difficulty {difficulty} is outside 1-5"),
                ));
            }
        }
        if let Some(window) = self.preferred_window() {
            if !window.is_valid() {
                return Err(OptimizerError::invalid_appointment(
                    &self.id,
                    "preferred window ends before it starts",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub home: Location,
    pub working_hours: TimeWindow,
    #[serde(default = "default_working_days")]
    pub working_days: Vec<Weekday>,
    pub max_appointments: usize,
    #[serde(default)]
    pub current_location: Option<Location>,
}

impl Technician {
    /// Where the technician's day starts.
    pub fn start_location(&self) -> &Location {
        self.current_location.as_ref().unwrap_or(&self.home)
    }

    pub fn works_on(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        self.working_days.contains(&date.weekday())
    }

    /// Check if the technician has every skill the appointment requires.
    pub fn can_serve(&self, appointment: &Appointment) -> bool {
        appointment
            .required_skills
            .iter()
            .all(|skill| self.skills.contains(skill))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(OptimizerError::invalid_technician(&self.id, "id is empty"));
        }
        if !self.working_hours.is_valid() {
            return Err(OptimizerError::invalid_technician(
                &self.id,
                "working hours end before they start",
            ));
        }
        if !self.start_location().is_valid() {
            return Err(OptimizerError::invalid_technician(&self.id, "start location is out of range"));
        }
        Ok(())
    }
}

pub fn default_working_days() -> Vec<Weekday> {
    vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
}

/// Parse an appointment timestamp.
///
/// Accepts RFC 3339 (the offset is dropped after conversion to local wall
/// time) and naive `YYYY-MM-DDTHH:MM[:SS]` forms, with `T` or a space.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.naive_local());
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| OptimizerError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// Parse a JSON array of appointments, rejecting malformed timestamps.
pub fn appointments_from_json(json: &str) -> Result<Vec<Appointment>> {
    Ok(serde_json::from_str(json)?)
}

pub fn technicians_from_json(json: &str) -> Result<Vec<Technician>> {
    Ok(serde_json::from_str(json)?)
}

mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format("%Y-%m-%dT%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(de::Error::custom)
    }
}

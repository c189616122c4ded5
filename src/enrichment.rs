//! Appointment enrichment: duration prediction, weather and traffic.
//!
//! Produces adjusted copies. The inputs are left untouched so the optimizer
//! can be re-run with different parameters.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{OptimizerError, Result};
use crate::model::{Appointment, Enrichment};
use crate::traffic::RushHourTraffic;
use crate::traits::{HistoricalStore, TrafficProvider, Weather, WeatherProvider};

/// Duration multiplier applied when weather slows on-site work.
pub const WEATHER_DURATION_FACTOR: f64 = 1.2;

/// Multiplier keyed by service type.
pub fn service_type_factor(service_type: &str) -> f64 {
    match service_type {
        "Annual Test" => 1.0,
        "Repair & Retest" => 1.5,
        "Installation" => 2.0,
        "Emergency" => 1.3,
        _ => 1.0,
    }
}

/// 0.8x for difficulty 1 up to 1.2x for difficulty 5.
pub fn difficulty_factor(difficulty: Option<u8>) -> f64 {
    difficulty.map_or(1.0, |d| 0.7 + f64::from(d) * 0.1)
}

pub fn predict_duration(base_duration: f64, service_type: &str, difficulty: Option<u8>, complexity: f64) -> f64 {
    base_duration * service_type_factor(service_type) * difficulty_factor(difficulty) * complexity
}

pub struct Enricher<'a, W, T> {
    weather: &'a W,
    traffic: &'a T,
    history: Option<&'a dyn HistoricalStore>,
    weather_sensitive: bool,
    traffic_sensitive: bool,
    fallback_traffic: RushHourTraffic,
}

impl<'a, W, T> Enricher<'a, W, T>
where
    W: WeatherProvider,
    T: TrafficProvider,
{
    pub fn new(weather: &'a W, traffic: &'a T) -> Self {
        Self {
            weather,
            traffic,
            history: None,
            weather_sensitive: true,
            traffic_sensitive: true,
            fallback_traffic: RushHourTraffic::default(),
        }
    }

    pub fn with_history(mut self, history: Option<&'a dyn HistoricalStore>) -> Self {
        self.history = history;
        self
    }

    pub fn sensitivity(mut self, weather: bool, traffic: bool) -> Self {
        self.weather_sensitive = weather;
        self.traffic_sensitive = traffic;
        self
    }

    /// Validate and enrich every appointment.
    ///
    /// Fails on the first invalid appointment. Collaborator failures fall
    /// back to defaults.
    pub fn enrich(&self, appointments: &[Appointment]) -> Result<Vec<Appointment>> {
        let mut seen = HashSet::with_capacity(appointments.len());
        for appointment in appointments {
            appointment.validate()?;
            if !seen.insert(appointment.id.as_str()) {
                return Err(OptimizerError::DuplicateAppointment(appointment.id.clone()));
            }
        }

        let enriched: Vec<Appointment> = appointments
            .par_iter()
            .map(|appointment| self.enrich_one(appointment))
            .collect();

        let slowed = enriched
            .iter()
            .filter(|a| a.enrichment.as_ref().is_some_and(|e| e.weather_factor > 1.0))
            .count();
        info!(appointments = enriched.len(), weather_adjusted = slowed, "enrichment complete");
        Ok(enriched)
    }

    fn enrich_one(&self, appointment: &Appointment) -> Appointment {
        let base_duration = appointment.base_duration();

        let historical = self
            .history
            .and_then(|history| history.average_duration(&appointment.service_type, &appointment.customer_id));

        let duration = match historical {
            Some(average) => average,
            None => {
                let complexity = self
                    .history
                    .map_or(1.0, |history| history.complexity_factor(&appointment.customer_id));
                predict_duration(
                    base_duration,
                    &appointment.service_type,
                    appointment.difficulty(),
                    complexity,
                )
            }
        };

        let weather_factor = if self.weather_sensitive && self.weather_for(appointment).slows_service() {
            WEATHER_DURATION_FACTOR
        } else {
            1.0
        };

        let traffic_delay = if self.traffic_sensitive {
            self.traffic_for(appointment)
        } else {
            0.0
        };

        let mut enriched = appointment.clone();
        enriched.estimated_duration = duration * weather_factor;
        enriched.enrichment = Some(Enrichment {
            base_duration,
            weather_factor,
            traffic_delay,
            historical_override: historical.is_some(),
        });
        enriched
    }

    fn weather_for(&self, appointment: &Appointment) -> Weather {
        match self
            .weather
            .weather_at(&appointment.location, appointment.scheduled_time)
        {
            Ok(weather) => weather,
            Err(err) => {
                warn!(appointment = %appointment.id, error = %err, "weather lookup failed, using default");
                Weather::default()
            }
        }
    }

    fn traffic_for(&self, appointment: &Appointment) -> f64 {
        match self
            .traffic
            .traffic_delay(&appointment.location, appointment.scheduled_time)
        {
            Ok(delay) if delay.is_finite() && delay >= 0.0 => delay,
            Ok(delay) => {
                warn!(appointment = %appointment.id, delay, "traffic delay out of range, using heuristic");
                self.fallback_traffic.delay_at(appointment.scheduled_time)
            }
            Err(err) => {
                warn!(appointment = %appointment.id, error = %err, "traffic lookup failed, using heuristic");
                self.fallback_traffic.delay_at(appointment.scheduled_time)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::error::ProviderError;
    use crate::history::InMemoryHistory;
    use crate::model::{CustomerPreferences, Location, Priority};
    use crate::traffic::FixedTraffic;
    use crate::traits::{OptimizationRecord, ServiceSample};
    use crate::weather::FixedWeather;

    struct FailingWeather;

    impl WeatherProvider for FailingWeather {
        fn weather_at(&self, _: &Location, _: NaiveDateTime) -> std::result::Result<Weather, ProviderError> {
            Err(ProviderError::Unavailable("offline".into()))
        }
    }

    struct FailingTraffic;

    impl TrafficProvider for FailingTraffic {
        fn traffic_delay(&self, _: &Location, _: NaiveDateTime) -> std::result::Result<f64, ProviderError> {
            Err(ProviderError::Unavailable("offline".into()))
        }
    }

    fn appointment(id: &str, service_type: &str, difficulty: Option<u8>) -> Appointment {
        Appointment {
            id: id.into(),
            customer_id: format!("cust-{id}"),
            customer_name: "Customer".into(),
            location: Location::new(36.17, -115.14),
            scheduled_time: NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            estimated_duration: 60.0,
            priority: Priority::Normal,
            service_type: service_type.into(),
            required_skills: Vec::new(),
            preferences: difficulty.map(|d| CustomerPreferences {
                difficulty: Some(d),
                ..Default::default()
            }),
            enrichment: None,
        }
    }

    #[test]
    fn test_prediction_factors() {
        assert_eq!(service_type_factor("Installation"), 2.0);
        assert_eq!(service_type_factor("Inspection"), 1.0);
        assert!((difficulty_factor(Some(1)) - 0.8).abs() < 1e-9);
        assert!((difficulty_factor(Some(5)) - 1.2).abs() < 1e-9);
        assert!((predict_duration(60.0, "Repair & Retest", Some(5), 1.0) - 108.0).abs() < 1e-9);
    }

    #[test]
    fn test_rain_extends_duration() {
        let weather = FixedWeather::new("rain", 50.0);
        let traffic = FixedTraffic(0.0);
        let enriched = Enricher::new(&weather, &traffic)
            .enrich(&[appointment("a1", "Annual Test", None)])
            .unwrap();
        assert!((enriched[0].estimated_duration - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_weather_ignored_when_insensitive() {
        let weather = FixedWeather::new("rain", 20.0);
        let traffic = FixedTraffic(4.0);
        let enriched = Enricher::new(&weather, &traffic)
            .sensitivity(false, false)
            .enrich(&[appointment("a1", "Annual Test", None)])
            .unwrap();
        assert_eq!(enriched[0].estimated_duration, 60.0);
        assert_eq!(enriched[0].traffic_delay(), 0.0);
    }

    #[test]
    fn test_enrichment_is_idempotent() {
        let weather = FixedWeather::new("freezing rain", 30.0);
        let traffic = FixedTraffic(3.0);
        let enricher = Enricher::new(&weather, &traffic);
        let input = vec![
            appointment("a1", "Installation", Some(4)),
            appointment("a2", "Emergency", None),
        ];
        let once = enricher.enrich(&input).unwrap();
        let twice = enricher.enrich(&once).unwrap();
        assert_eq!(once, twice);
        // input untouched
        assert_eq!(input[0].estimated_duration, 60.0);
        assert!(input[0].enrichment.is_none());
    }

    #[test]
    fn test_history_overrides_prediction() {
        let history = InMemoryHistory::default();
        history
            .put(OptimizationRecord {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                appointment_count: 1,
                assigned_count: 1,
                route_count: 1,
                total_distance: 0.0,
                total_travel_time: 0.0,
                optimization_score: 1.0,
                samples: vec![ServiceSample {
                    customer_id: "cust-a1".into(),
                    service_type: "Installation".into(),
                    duration: 95.0,
                }],
            })
            .unwrap();
        let weather = FixedWeather::default();
        let traffic = FixedTraffic(0.0);
        let enriched = Enricher::new(&weather, &traffic)
            .with_history(Some(&history))
            .enrich(&[appointment("a1", "Installation", Some(5))])
            .unwrap();
        assert_eq!(enriched[0].estimated_duration, 95.0);
        assert!(enriched[0].enrichment.as_ref().unwrap().historical_override);
    }

    #[test]
    fn test_provider_failures_fall_back() {
        let enriched = Enricher::new(&FailingWeather, &FailingTraffic)
            .enrich(&[appointment("a1", "Annual Test", None)])
            .unwrap();
        assert_eq!(enriched[0].estimated_duration, 60.0);
        // noon is off-peak for the heuristic
        assert_eq!(enriched[0].traffic_delay(), 5.0);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let weather = FixedWeather::default();
        let traffic = FixedTraffic(0.0);
        let result = Enricher::new(&weather, &traffic).enrich(&[
            appointment("a1", "Annual Test", None),
            appointment("a1", "Annual Test", None),
        ]);
        assert!(matches!(result, Err(OptimizerError::DuplicateAppointment(_))));
    }
}

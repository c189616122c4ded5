//! Optimization options.
//!
//! Every field has a default so callers can supply a partial JSON document.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{OptimizerError, Result};

/// Relative importance of each objective. Used as linear coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationObjectives {
    pub minimize_time: f64,
    pub minimize_fuel: f64,
    pub maximize_customer_sat: f64,
    pub balance_workload: f64,
}

impl Default for OptimizationObjectives {
    fn default() -> Self {
        Self {
            minimize_time: 0.3,
            minimize_fuel: 0.2,
            maximize_customer_sat: 0.3,
            balance_workload: 0.2,
        }
    }
}

/// A single break taken once the day has run for `after_minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakPolicy {
    pub after_minutes: f64,
    pub duration_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConstraints {
    /// Longest allowed hop between consecutive stops, in minutes.
    pub max_drive_time_between_stops: Option<f64>,
    pub mandatory_break: Option<BreakPolicy>,
    pub weather_sensitive: bool,
    pub traffic_sensitive: bool,
}

impl Default for OptimizationConstraints {
    fn default() -> Self {
        Self {
            max_drive_time_between_stops: None,
            mandatory_break: None,
            weather_sensitive: true,
            traffic_sensitive: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationPreferences {
    pub prioritize_urgent: bool,
    pub cluster_similar_services: bool,
    pub minimize_backtracking: bool,
}

impl Default for OptimizationPreferences {
    fn default() -> Self {
        Self {
            prioritize_urgent: true,
            cluster_similar_services: false,
            minimize_backtracking: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticParams {
    pub population_size: usize,
    pub generations: usize,
    /// Probability that a child is mutated.
    pub mutation_rate: f64,
    pub tournament_size: usize,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            population_size: 20,
            generations: 50,
            mutation_rate: 0.1,
            tournament_size: 3,
        }
    }
}

/// Thresholds that trigger recommendation strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    pub min_average_efficiency: f64,
    pub max_workload_variance: f64,
    pub max_clustering_potential: f64,
    /// Peak-hour appointments allowed per route before suggesting a shift.
    pub peak_appointments_per_route: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            min_average_efficiency: 0.7,
            max_workload_variance: 0.3,
            max_clustering_potential: 0.5,
            peak_appointments_per_route: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationOptions {
    pub objectives: OptimizationObjectives,
    pub constraints: OptimizationConstraints,
    pub preferences: OptimizationPreferences,
    /// Day being planned. Defaults to the earliest appointment's date.
    pub service_date: Option<NaiveDate>,
    pub average_speed_mph: f64,
    pub fuel_cost_per_mile: f64,
    pub genetic: GeneticParams,
    pub local_search_iterations: usize,
    pub seed: u64,
    /// Wall-clock budget for the genetic loop.
    pub deadline_ms: Option<u64>,
    pub cluster_radius_miles: f64,
    pub recommendations: RecommendationThresholds,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            objectives: OptimizationObjectives::default(),
            constraints: OptimizationConstraints::default(),
            preferences: OptimizationPreferences::default(),
            service_date: None,
            average_speed_mph: 30.0,
            fuel_cost_per_mile: 0.15,
            genetic: GeneticParams::default(),
            local_search_iterations: 100,
            seed: 42,
            deadline_ms: None,
            cluster_radius_miles: 10.0,
            recommendations: RecommendationThresholds::default(),
        }
    }
}

impl OptimizationOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        let weights = [
            self.objectives.minimize_time,
            self.objectives.minimize_fuel,
            self.objectives.maximize_customer_sat,
            self.objectives.balance_workload,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(OptimizerError::InvalidOptions(
                "objective weights must be non-negative".into(),
            ));
        }
        if !(self.average_speed_mph.is_finite() && self.average_speed_mph > 0.0) {
            return Err(OptimizerError::InvalidOptions(
                "average speed must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.genetic.mutation_rate) {
            return Err(OptimizerError::InvalidOptions(
                "mutation rate must be within 0-1".into(),
            ));
        }
        Ok(())
    }
}

//! End-to-end optimization pipeline.
//!
//! enrichment -> three constructors (in parallel) -> genetic search seeded
//! with their output -> local search -> savings and recommendations.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;
use tracing::{info, warn};

use crate::baseline::{Baseline, estimate_baseline};
use crate::construct::{cluster_based, nearest_neighbor, time_window};
use crate::enrichment::Enricher;
use crate::error::{OptimizerError, Result};
use crate::fitness::{FitnessBreakdown, evaluate, score};
use crate::genetic::GeneticOptimizer;
use crate::local_search::LocalSearch;
use crate::model::{Appointment, Technician};
use crate::options::OptimizationOptions;
use crate::report::{Savings, compute_savings, recommendations};
use crate::route::OptimizedRoute;
use crate::solution::{Problem, Solution};
use crate::traffic::RushHourTraffic;
use crate::traits::{HistoricalStore, OptimizationRecord, ServiceSample, TrafficProvider, WeatherProvider};
use crate::weather::FixedWeather;

#[derive(Debug, Clone, Serialize)]
pub struct RouteOptimizationResult {
    pub service_date: NaiveDate,
    pub routes: Vec<OptimizedRoute>,
    pub unassigned_appointments: Vec<Arc<Appointment>>,
    pub optimization_score: f64,
    pub fitness: FitnessBreakdown,
    pub baseline: Baseline,
    pub savings: Savings,
    pub recommendations: Vec<String>,
}

impl RouteOptimizationResult {
    pub fn assigned_count(&self) -> usize {
        self.routes.iter().map(OptimizedRoute::len).sum()
    }

    pub fn total_distance(&self) -> f64 {
        self.routes.iter().map(OptimizedRoute::total_distance).sum()
    }

    pub fn total_travel_time(&self) -> f64 {
        self.routes.iter().map(OptimizedRoute::total_travel_time).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Optimize with clear weather and the rush-hour traffic heuristic.
pub fn optimize_routes(
    appointments: &[Appointment],
    technicians: &[Technician],
    options: &OptimizationOptions,
) -> Result<RouteOptimizationResult> {
    let weather = FixedWeather::default();
    let traffic = RushHourTraffic::default();
    Optimizer::new(&weather, &traffic).optimize(appointments, technicians, options)
}

pub struct Optimizer<'a, W, T> {
    weather: &'a W,
    traffic: &'a T,
    history: Option<&'a dyn HistoricalStore>,
}

impl<'a, W, T> Optimizer<'a, W, T>
where
    W: WeatherProvider,
    T: TrafficProvider,
{
    pub fn new(weather: &'a W, traffic: &'a T) -> Self {
        Self {
            weather,
            traffic,
            history: None,
        }
    }

    /// Read duration history during enrichment and record each run.
    pub fn with_history(mut self, history: &'a dyn HistoricalStore) -> Self {
        self.history = Some(history);
        self
    }

    /// Run the full pipeline.
    ///
    /// Only invalid input is an error. Appointments that fit nowhere come back
    /// in `unassigned_appointments`.
    pub fn optimize(
        &self,
        appointments: &[Appointment],
        technicians: &[Technician],
        options: &OptimizationOptions,
    ) -> Result<RouteOptimizationResult> {
        options.validate()?;
        validate_technicians(technicians)?;

        let enriched = Enricher::new(self.weather, self.traffic)
            .with_history(self.history)
            .sensitivity(
                options.constraints.weather_sensitive,
                options.constraints.traffic_sensitive,
            )
            .enrich(appointments)?;

        let problem = Problem::new(enriched, technicians, options);
        info!(
            appointments = problem.appointments.len(),
            technicians = problem.technicians.len(),
            service_date = %problem.service_date(),
            "optimizing routes"
        );
        if problem.technicians.len() < technicians.len() {
            warn!(
                off_duty = technicians.len() - problem.technicians.len(),
                "technicians not working on the service date"
            );
        }

        let (nearest, (clustered, windowed)) = rayon::join(
            || nearest_neighbor(&problem),
            || rayon::join(|| cluster_based(&problem), || time_window(&problem)),
        );
        info!(
            nearest_neighbor = score(&nearest, &problem.objectives),
            cluster = score(&clustered, &problem.objectives),
            time_window = score(&windowed, &problem.objectives),
            "constructors complete"
        );

        let mut rng = SmallRng::seed_from_u64(options.seed);
        let evolved = GeneticOptimizer::new(&problem, options.genetic.clone())
            .with_deadline(options.deadline())
            .evolve(vec![nearest, clustered, windowed], &mut rng);

        let refined = LocalSearch::new(&problem, options.local_search_iterations).refine(evolved.solution);

        let result = self.finish(&problem, refined.solution, options);
        info!(
            routes = result.routes.len(),
            assigned = result.assigned_count(),
            unassigned = result.unassigned_appointments.len(),
            score = result.optimization_score,
            distance = result.total_distance(),
            "optimization complete"
        );
        self.record(&result);
        Ok(result)
    }

    fn finish(&self, problem: &Problem, solution: Solution, options: &OptimizationOptions) -> RouteOptimizationResult {
        let fitness = evaluate(&solution, &problem.objectives);
        let baseline = estimate_baseline(problem.appointments.iter().map(|appointment| appointment.as_ref()));
        let savings = compute_savings(&baseline, &solution, options.fuel_cost_per_mile);
        let recommendations = recommendations(&solution, options);

        RouteOptimizationResult {
            service_date: problem.service_date(),
            routes: solution.routes,
            unassigned_appointments: solution.unassigned,
            optimization_score: fitness.total,
            fitness,
            baseline,
            savings,
            recommendations,
        }
    }

    fn record(&self, result: &RouteOptimizationResult) {
        let Some(history) = self.history else {
            return;
        };

        let samples = result
            .routes
            .iter()
            .flat_map(OptimizedRoute::appointments)
            .map(|appointment| ServiceSample {
                customer_id: appointment.customer_id.clone(),
                service_type: appointment.service_type.clone(),
                duration: planned_duration(appointment),
            })
            .collect();

        let record = OptimizationRecord {
            date: result.service_date,
            appointment_count: result.assigned_count() + result.unassigned_appointments.len(),
            assigned_count: result.assigned_count(),
            route_count: result.routes.len(),
            total_distance: result.total_distance(),
            total_travel_time: result.total_travel_time(),
            optimization_score: result.optimization_score,
            samples,
        };

        if let Err(error) = history.put(record) {
            warn!(%error, "failed to record optimization history");
        }
    }
}

/// Service duration without the weather adjustment, so history does not
/// compound weather from earlier runs.
fn planned_duration(appointment: &Appointment) -> f64 {
    appointment
        .enrichment
        .as_ref()
        .map_or(appointment.estimated_duration, |enrichment| {
            appointment.estimated_duration / enrichment.weather_factor
        })
}

fn validate_technicians(technicians: &[Technician]) -> Result<()> {
    let mut seen = HashSet::with_capacity(technicians.len());
    for technician in technicians {
        technician.validate()?;
        if !seen.insert(technician.id.as_str()) {
            return Err(OptimizerError::invalid_technician(&technician.id, "duplicate technician id"));
        }
    }
    Ok(())
}

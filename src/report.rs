//! Savings against the baseline and rule-based tuning advice.

use serde::Serialize;

use crate::baseline::Baseline;
use crate::fitness::workload_variance;
use crate::options::{OptimizationOptions, RecommendationThresholds};
use crate::route::OptimizedRoute;
use crate::solution::Solution;
use crate::traffic::is_peak_hour;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Savings {
    /// Minutes of travel plus service saved.
    pub time: f64,
    pub distance: f64,
    pub fuel_cost: f64,
}

pub fn compute_savings(baseline: &Baseline, solution: &Solution, fuel_cost_per_mile: f64) -> Savings {
    let optimized_time = solution.total_travel_time() + solution.total_service_time();
    let distance = (baseline.total_distance - solution.total_distance()).max(0.0);
    Savings {
        time: (baseline.total_time - optimized_time).max(0.0),
        distance,
        fuel_cost: distance * fuel_cost_per_mile,
    }
}

/// Mean efficiency of routes that have stops.
pub fn average_efficiency(routes: &[OptimizedRoute]) -> Option<f64> {
    let active: Vec<f64> = routes
        .iter()
        .filter(|route| !route.is_empty())
        .map(OptimizedRoute::efficiency_score)
        .collect();
    (!active.is_empty()).then(|| active.iter().sum::<f64>() / active.len() as f64)
}

/// Share of hops between consecutive stops longer than `radius_miles`.
pub fn clustering_potential(routes: &[OptimizedRoute], radius_miles: f64) -> f64 {
    let (long, total) = routes
        .iter()
        .flat_map(|route| route.stops().iter().skip(1))
        .fold((0usize, 0usize), |(long, total), stop| {
            (long + usize::from(stop.distance_from_previous > radius_miles), total + 1)
        });
    if total == 0 { 0.0 } else { long as f64 / total as f64 }
}

pub fn peak_hour_appointments(routes: &[OptimizedRoute]) -> usize {
    routes
        .iter()
        .flat_map(OptimizedRoute::stops)
        .filter(|stop| is_peak_hour(stop.scheduled_time))
        .count()
}

pub fn recommendations(solution: &Solution, options: &OptimizationOptions) -> Vec<String> {
    let thresholds: &RecommendationThresholds = &options.recommendations;
    let routes = &solution.routes;
    let mut advice = Vec::new();

    if let Some(efficiency) = average_efficiency(routes) {
        if efficiency < thresholds.min_average_efficiency {
            advice.push(format!(
                "Average route efficiency is {:.0}%. Consider adding technicians or reducing the service area.",
                efficiency * 100.0
            ));
        }
    }

    if !solution.unassigned.is_empty() {
        advice.push(format!(
            "{} appointment(s) could not be scheduled. Consider extending working hours or moving them to another day.",
            solution.unassigned.len()
        ));
    }

    if workload_variance(routes) > thresholds.max_workload_variance {
        advice.push(
            "Workload is unevenly distributed between technicians. Consider redistributing appointments.".to_string(),
        );
    }

    let potential = clustering_potential(routes, options.cluster_radius_miles);
    if potential > thresholds.max_clustering_potential {
        advice.push(format!(
            "{:.0}% of drives exceed {} miles. Grouping appointments by area could shorten routes.",
            potential * 100.0,
            options.cluster_radius_miles
        ));
    }

    let peak = peak_hour_appointments(routes);
    if peak as f64 > thresholds.peak_appointments_per_route * routes.len() as f64 {
        advice.push(format!(
            "{peak} appointments fall in rush hours. Shifting some to off-peak times would reduce travel delays."
        ));
    }

    advice
}

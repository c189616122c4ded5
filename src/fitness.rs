//! Multi-objective fitness of a candidate solution.
//!
//! Higher is better. Each sub-score lies in [0, 1]; the weighted sum is scaled
//! by the assignment rate so dropped appointments always cost score.

use serde::Serialize;

use crate::options::OptimizationObjectives;
use crate::route::OptimizedRoute;
use crate::solution::Solution;

/// Minutes of driving that zero out the time score for one route.
const DAY_MINUTES: f64 = 480.0;
/// Miles per route that zero out the fuel score.
const ROUTE_MILES: f64 = 200.0;
const BASE_SATISFACTION: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FitnessBreakdown {
    pub time: f64,
    pub fuel: f64,
    pub customer_satisfaction: f64,
    pub workload_balance: f64,
    pub assignment_rate: f64,
    pub total: f64,
}

pub fn score(solution: &Solution, objectives: &OptimizationObjectives) -> f64 {
    evaluate(solution, objectives).total
}

pub fn evaluate(solution: &Solution, objectives: &OptimizationObjectives) -> FitnessBreakdown {
    let route_count = solution.routes.len().max(1) as f64;

    let time = (1.0 - solution.total_travel_time() / (DAY_MINUTES * route_count)).max(0.0);
    let fuel = (1.0 - solution.total_distance() / (ROUTE_MILES * route_count)).max(0.0);
    let customer_satisfaction = customer_satisfaction(&solution.routes);
    let workload_balance = workload_balance(&solution.routes);

    let placed = solution.placed_count();
    let total_count = placed + solution.unassigned.len();
    let assignment_rate = if total_count == 0 {
        1.0
    } else {
        placed as f64 / total_count as f64
    };

    let weighted = time * objectives.minimize_time
        + fuel * objectives.minimize_fuel
        + customer_satisfaction * objectives.maximize_customer_sat
        + workload_balance * objectives.balance_workload;

    FitnessBreakdown {
        time,
        fuel,
        customer_satisfaction,
        workload_balance,
        assignment_rate,
        total: weighted * assignment_rate,
    }
}

/// Average per-stop satisfaction; 0.8 when nothing is placed.
pub fn customer_satisfaction(routes: &[OptimizedRoute]) -> f64 {
    let (sum, count) = routes
        .iter()
        .flat_map(OptimizedRoute::stops)
        .fold((0.0, 0usize), |(sum, count), stop| {
            let mut value = BASE_SATISFACTION;
            value += if stop.lateness <= 15.0 {
                0.2
            } else if stop.lateness <= 30.0 {
                0.1
            } else {
                -0.1
            };
            if stop.appointment.priority.is_elevated() {
                value += 0.1;
            }
            (sum + value.clamp(0.0, 1.0), count + 1)
        });
    if count == 0 {
        BASE_SATISFACTION
    } else {
        sum / count as f64
    }
}

/// Variance of appointment counts relative to their mean.
pub fn workload_variance(routes: &[OptimizedRoute]) -> f64 {
    if routes.len() < 2 {
        return 0.0;
    }
    let n = routes.len() as f64;
    let mean = routes.iter().map(|r| r.len() as f64).sum::<f64>() / n;
    let variance = routes
        .iter()
        .map(|r| (r.len() as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    variance / (mean + 1.0)
}

pub fn workload_balance(routes: &[OptimizedRoute]) -> f64 {
    if routes.len() < 2 {
        return 1.0;
    }
    (1.0 - workload_variance(routes)).max(0.0)
}

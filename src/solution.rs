//! Candidate solutions and the planning problem they belong to.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::model::{Appointment, Technician};
use crate::options::{OptimizationObjectives, OptimizationOptions, OptimizationPreferences};
use crate::route::{OptimizedRoute, RouteContext};

/// Inputs shared by every stage of one optimization run.
#[derive(Debug, Clone)]
pub struct Problem {
    pub appointments: Vec<Arc<Appointment>>,
    /// Technicians working on the service date, in input order.
    pub technicians: Vec<Arc<Technician>>,
    pub context: RouteContext,
    pub objectives: OptimizationObjectives,
    pub preferences: OptimizationPreferences,
}

impl Problem {
    /// Plans the day `options.service_date`. Without one, the earliest
    /// appointment date on which some technician works is used, then the
    /// earliest appointment date at all. With no appointments and no
    /// `service_date`, the day falls back to today on the local clock, so
    /// callers that need reproducible output must set `service_date`.
    ///
    /// Appointments requested for any other day stay unassigned.
    pub fn new(appointments: Vec<Appointment>, technicians: &[Technician], options: &OptimizationOptions) -> Self {
        let service_date = options
            .service_date
            .or_else(|| default_service_date(&appointments, technicians))
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        Self {
            appointments: appointments.into_iter().map(Arc::new).collect(),
            technicians: technicians
                .iter()
                .filter(|technician| technician.works_on(service_date))
                .cloned()
                .map(Arc::new)
                .collect(),
            context: RouteContext::new(service_date, options),
            objectives: options.objectives.clone(),
            preferences: options.preferences.clone(),
        }
    }

    pub fn service_date(&self) -> NaiveDate {
        self.context.service_date
    }

    /// One empty route per technician, everything unassigned.
    pub fn empty_solution(&self) -> Solution {
        Solution {
            routes: self
                .technicians
                .iter()
                .map(|technician| OptimizedRoute::new(technician.clone(), &self.context))
                .collect(),
            unassigned: self.appointments.clone(),
        }
    }
}

fn default_service_date(appointments: &[Appointment], technicians: &[Technician]) -> Option<NaiveDate> {
    let dates = || appointments.iter().map(|a| a.scheduled_time.date());
    dates()
        .filter(|&date| technicians.iter().any(|t| t.works_on(date)))
        .min()
        .or_else(|| dates().min())
}

/// A complete candidate: routes plus whatever could not be placed.
///
/// Cloning copies route vectors and reference counts only; appointments and
/// technicians are shared.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub routes: Vec<OptimizedRoute>,
    pub unassigned: Vec<Arc<Appointment>>,
}

impl Solution {
    pub fn placed_count(&self) -> usize {
        self.routes.iter().map(OptimizedRoute::len).sum()
    }

    pub fn total_count(&self) -> usize {
        self.placed_count() + self.unassigned.len()
    }

    pub fn total_distance(&self) -> f64 {
        self.routes.iter().map(OptimizedRoute::total_distance).sum()
    }

    pub fn total_travel_time(&self) -> f64 {
        self.routes.iter().map(OptimizedRoute::total_travel_time).sum()
    }

    pub fn total_service_time(&self) -> f64 {
        self.routes.iter().map(OptimizedRoute::total_service_time).sum()
    }

    pub fn is_feasible(&self) -> bool {
        self.routes.iter().all(OptimizedRoute::is_feasible)
    }

    /// Ids of every appointment in the solution, placed first.
    pub fn appointment_ids(&self) -> Vec<&str> {
        self.routes
            .iter()
            .flat_map(OptimizedRoute::appointments)
            .chain(self.unassigned.iter())
            .map(|appointment| appointment.id.as_str())
            .collect()
    }

    /// Restore the solution invariants after recombination.
    ///
    /// Duplicates keep their first occurrence, infeasible routes shed their
    /// last stops, and every problem appointment not on a route ends up
    /// unassigned exactly once.
    pub fn repair(&mut self, problem: &Problem) {
        let ctx = &problem.context;
        let mut placed: HashSet<String> = HashSet::new();

        for route in &mut self.routes {
            let before = route.len();
            let kept: Vec<Arc<Appointment>> = route
                .appointments()
                .filter(|appointment| !placed.contains(&appointment.id))
                .cloned()
                .collect();
            if kept.len() != before {
                route.set_appointments(kept, ctx);
            }
            while !route.is_feasible() && route.pop(ctx).is_some() {}
            placed.extend(route.appointments().map(|appointment| appointment.id.clone()));
        }

        self.unassigned = problem
            .appointments
            .iter()
            .filter(|appointment| !placed.contains(&appointment.id))
            .cloned()
            .collect();
    }
}

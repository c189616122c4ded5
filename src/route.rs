//! Per-technician routes.
//!
//! A route owns its stop sequence. Every mutation goes through a method that
//! recomputes the schedule and the aggregates from the sequence, so stored
//! totals always match the stops.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::haversine::{distance, travel_minutes};
use crate::model::{Appointment, Technician};
use crate::options::{BreakPolicy, OptimizationOptions};

/// Everything needed to turn a stop sequence into a timed schedule.
#[derive(Debug, Clone)]
pub struct RouteContext {
    pub service_date: NaiveDate,
    pub average_speed_mph: f64,
    pub fuel_cost_per_mile: f64,
    pub traffic_sensitive: bool,
    pub max_drive_time: Option<f64>,
    pub mandatory_break: Option<BreakPolicy>,
}

impl RouteContext {
    pub fn new(service_date: NaiveDate, options: &OptimizationOptions) -> Self {
        Self {
            service_date,
            average_speed_mph: options.average_speed_mph,
            fuel_cost_per_mile: options.fuel_cost_per_mile,
            traffic_sensitive: options.constraints.traffic_sensitive,
            max_drive_time: options.constraints.max_drive_time_between_stops,
            mandatory_break: options.constraints.mandatory_break,
        }
    }

    /// When the customer asked service to start.
    pub fn requested_start(&self, appointment: &Appointment) -> NaiveDateTime {
        appointment.scheduled_time
    }

    /// Appointments requested for another day cannot go on this day's routes.
    pub fn is_service_day(&self, appointment: &Appointment) -> bool {
        appointment.scheduled_time.date() == self.service_date
    }
}

pub(crate) fn minutes(value: f64) -> TimeDelta {
    TimeDelta::milliseconds((value * 60_000.0).round() as i64)
}

pub(crate) fn minutes_between(later: NaiveDateTime, earlier: NaiveDateTime) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 60_000.0
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteStop {
    pub appointment: Arc<Appointment>,
    /// When service starts.
    pub scheduled_time: NaiveDateTime,
    pub estimated_arrival: NaiveDateTime,
    pub travel_time_from_previous: f64,
    pub distance_from_previous: f64,
    /// Minutes service starts after the requested time.
    pub lateness: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizedRoute {
    technician: Arc<Technician>,
    stops: Vec<RouteStop>,
    total_distance: f64,
    total_travel_time: f64,
    total_service_time: f64,
    estimated_fuel_cost: f64,
    efficiency_score: f64,
    feasible: bool,
}

impl OptimizedRoute {
    pub fn new(technician: Arc<Technician>, ctx: &RouteContext) -> Self {
        Self::with_appointments(technician, Vec::new(), ctx)
    }

    pub fn with_appointments(
        technician: Arc<Technician>,
        appointments: Vec<Arc<Appointment>>,
        ctx: &RouteContext,
    ) -> Self {
        let mut route = Self {
            technician,
            stops: Vec::new(),
            total_distance: 0.0,
            total_travel_time: 0.0,
            total_service_time: 0.0,
            estimated_fuel_cost: 0.0,
            efficiency_score: 0.0,
            feasible: true,
        };
        route.set_appointments(appointments, ctx);
        route
    }

    pub fn technician(&self) -> &Arc<Technician> {
        &self.technician
    }

    pub fn stops(&self) -> &[RouteStop] {
        &self.stops
    }

    pub fn appointments(&self) -> impl Iterator<Item = &Arc<Appointment>> + '_ {
        self.stops.iter().map(|stop| &stop.appointment)
    }

    pub fn appointment(&self, position: usize) -> &Arc<Appointment> {
        &self.stops[position].appointment
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn total_travel_time(&self) -> f64 {
        self.total_travel_time
    }

    pub fn total_service_time(&self) -> f64 {
        self.total_service_time
    }

    pub fn estimated_fuel_cost(&self) -> f64 {
        self.estimated_fuel_cost
    }

    /// Service time over service plus travel time; zero for an empty route.
    pub fn efficiency_score(&self) -> f64 {
        self.efficiency_score
    }

    /// Whether the route satisfies the service day, capacity, skills, working
    /// hours, preferred windows and the drive-time limit.
    pub fn is_feasible(&self) -> bool {
        self.feasible
    }

    /// Cheap precheck before building a candidate with one more stop.
    pub fn can_take(&self, appointment: &Appointment) -> bool {
        self.stops.len() < self.technician.max_appointments && self.technician.can_serve(appointment)
    }

    pub fn set_appointments(&mut self, appointments: Vec<Arc<Appointment>>, ctx: &RouteContext) {
        self.stops = appointments
            .into_iter()
            .map(|appointment| RouteStop {
                scheduled_time: appointment.scheduled_time,
                estimated_arrival: appointment.scheduled_time,
                travel_time_from_previous: 0.0,
                distance_from_previous: 0.0,
                lateness: 0.0,
                appointment,
            })
            .collect();
        self.recompute(ctx);
    }

    pub fn insert(&mut self, position: usize, appointment: Arc<Appointment>, ctx: &RouteContext) {
        let mut appointments = self.take_appointments();
        appointments.insert(position, appointment);
        self.set_appointments(appointments, ctx);
    }

    pub fn push(&mut self, appointment: Arc<Appointment>, ctx: &RouteContext) {
        let position = self.stops.len();
        self.insert(position, appointment, ctx);
    }

    pub fn remove(&mut self, position: usize, ctx: &RouteContext) -> Arc<Appointment> {
        let mut appointments = self.take_appointments();
        let removed = appointments.remove(position);
        self.set_appointments(appointments, ctx);
        removed
    }

    pub fn pop(&mut self, ctx: &RouteContext) -> Option<Arc<Appointment>> {
        if self.stops.is_empty() {
            return None;
        }
        Some(self.remove(self.stops.len() - 1, ctx))
    }

    /// Put `appointment` at `position`, returning the one it displaced.
    pub fn replace(&mut self, position: usize, appointment: Arc<Appointment>, ctx: &RouteContext) -> Arc<Appointment> {
        let mut appointments = self.take_appointments();
        let old = std::mem::replace(&mut appointments[position], appointment);
        self.set_appointments(appointments, ctx);
        old
    }

    /// Reverse stops `from..=to`.
    pub fn reverse(&mut self, from: usize, to: usize, ctx: &RouteContext) {
        let mut appointments = self.take_appointments();
        appointments[from..=to].reverse();
        self.set_appointments(appointments, ctx);
    }

    /// Candidate copy with `appointment` inserted at `position`.
    pub fn with_inserted(&self, position: usize, appointment: Arc<Appointment>, ctx: &RouteContext) -> Self {
        let mut candidate = self.clone();
        candidate.insert(position, appointment, ctx);
        candidate
    }

    fn take_appointments(&mut self) -> Vec<Arc<Appointment>> {
        std::mem::take(&mut self.stops)
            .into_iter()
            .map(|stop| stop.appointment)
            .collect()
    }

    /// Rebuild the timed schedule and every aggregate from the stop sequence.
    pub fn recompute(&mut self, ctx: &RouteContext) {
        let technician = &self.technician;
        let day_start = ctx.service_date.and_time(technician.working_hours.start);
        let day_end = ctx.service_date.and_time(technician.working_hours.end);

        let mut feasible =
            technician.works_on(ctx.service_date) && self.stops.len() <= technician.max_appointments;
        let mut time = day_start;
        let mut previous = technician.start_location().clone();
        let mut break_taken = false;
        let mut total_distance = 0.0;
        let mut total_travel = 0.0;
        let mut total_service = 0.0;

        for stop in &mut self.stops {
            let appointment = &stop.appointment;
            if !technician.can_serve(appointment) || !ctx.is_service_day(appointment) {
                feasible = false;
            }

            let hop = distance(&previous, &appointment.location);
            let mut travel = travel_minutes(hop, ctx.average_speed_mph);
            if ctx.traffic_sensitive && hop > 0.0 {
                travel += appointment.traffic_delay();
            }
            if ctx.max_drive_time.is_some_and(|limit| travel > limit) {
                feasible = false;
            }

            if let Some(policy) = ctx.mandatory_break {
                if !break_taken && minutes_between(time, day_start) >= policy.after_minutes {
                    time += minutes(policy.duration_minutes);
                    break_taken = true;
                }
            }

            let arrival = time + minutes(travel);
            let requested = ctx.requested_start(appointment);
            let mut start = arrival.max(requested);
            if let Some(window) = appointment.preferred_window() {
                start = start.max(ctx.service_date.and_time(window.start));
                if start > ctx.service_date.and_time(window.end) {
                    feasible = false;
                }
            }
            let end = start + minutes(appointment.estimated_duration);
            if end > day_end {
                feasible = false;
            }

            stop.estimated_arrival = arrival;
            stop.scheduled_time = start;
            stop.travel_time_from_previous = travel;
            stop.distance_from_previous = hop;
            stop.lateness = minutes_between(start, requested).max(0.0);

            total_distance += hop;
            total_travel += travel;
            total_service += appointment.estimated_duration;
            time = end;
            previous = appointment.location.clone();
        }

        self.total_distance = total_distance;
        self.total_travel_time = total_travel;
        self.total_service_time = total_service;
        self.estimated_fuel_cost = total_distance * ctx.fuel_cost_per_mile;
        let worked = total_service + total_travel;
        self.efficiency_score = if worked > 0.0 { total_service / worked } else { 0.0 };
        self.feasible = feasible;
    }
}

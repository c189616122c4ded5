//! Test fixtures for route-optimizer.
//!
//! Provides realistic test data including:
//! - Real Las Vegas / Henderson locations
//! - Builders for appointments and technicians with sensible defaults

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

pub mod las_vegas_sites;

use chrono::{NaiveDate, NaiveTime, Weekday};

use route_optimizer::model::default_working_days;
use route_optimizer::{Appointment, CustomerPreferences, Location, Priority, Technician, TimeWindow};

pub use las_vegas_sites::*;

/// Monday 2024-03-04.
pub fn service_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

pub fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

/// Builder for test appointments.
#[derive(Clone, Debug)]
pub struct TestAppointment {
    inner: Appointment,
}

impl TestAppointment {
    pub fn new(id: &str) -> Self {
        Self {
            inner: Appointment {
                id: id.to_string(),
                customer_id: format!("cust-{id}"),
                customer_name: format!("Customer {id}"),
                location: Location::new(36.1147, -115.1728),
                scheduled_time: service_date().and_time(clock(9, 0)),
                estimated_duration: 30.0,
                priority: Priority::Normal,
                service_type: "Annual Test".to_string(),
                required_skills: Vec::new(),
                preferences: None,
                enrichment: None,
            },
        }
    }

    pub fn at(mut self, site: &Site) -> Self {
        self.inner.location = site.location();
        self
    }

    pub fn scheduled(mut self, hour: u32, minute: u32) -> Self {
        self.inner.scheduled_time = self.inner.scheduled_time.date().and_time(clock(hour, minute));
        self
    }

    /// Moves the appointment to another day, keeping its clock time.
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.inner.scheduled_time = date.and_time(self.inner.scheduled_time.time());
        self
    }

    pub fn duration(mut self, minutes: f64) -> Self {
        self.inner.estimated_duration = minutes;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.inner.priority = priority;
        self
    }

    pub fn service_type(mut self, service_type: &str) -> Self {
        self.inner.service_type = service_type.to_string();
        self
    }

    pub fn customer(mut self, customer_id: &str) -> Self {
        self.inner.customer_id = customer_id.to_string();
        self
    }

    pub fn requires(mut self, skill: &str) -> Self {
        self.inner.required_skills.push(skill.to_string());
        self
    }

    pub fn difficulty(mut self, difficulty: u8) -> Self {
        self.preferences().difficulty = Some(difficulty);
        self
    }

    pub fn preferred_window(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.preferences().preferred_window = Some(TimeWindow::new(start, end));
        self
    }

    fn preferences(&mut self) -> &mut CustomerPreferences {
        self.inner.preferences.get_or_insert_with(CustomerPreferences::default)
    }

    pub fn build(self) -> Appointment {
        self.inner
    }
}

/// Builder for test technicians. Works 08:00-17:00, Monday to Friday.
#[derive(Clone, Debug)]
pub struct TestTechnician {
    inner: Technician,
}

impl TestTechnician {
    pub fn new(id: &str) -> Self {
        Self {
            inner: Technician {
                id: id.to_string(),
                name: format!("Tech {id}"),
                skills: Vec::new(),
                home: Location::new(36.1147, -115.1728),
                working_hours: TimeWindow::new(clock(8, 0), clock(17, 0)),
                working_days: default_working_days(),
                max_appointments: 8,
                current_location: None,
            },
        }
    }

    pub fn home(mut self, site: &Site) -> Self {
        self.inner.home = site.location();
        self
    }

    pub fn hours(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.inner.working_hours = TimeWindow::new(start, end);
        self
    }

    pub fn max_appointments(mut self, max: usize) -> Self {
        self.inner.max_appointments = max;
        self
    }

    pub fn skill(mut self, skill: &str) -> Self {
        self.inner.skills.push(skill.to_string());
        self
    }

    pub fn works(mut self, days: &[Weekday]) -> Self {
        self.inner.working_days = days.to_vec();
        self
    }

    pub fn build(self) -> Technician {
        self.inner
    }
}

/// One appointment per site, an hour apart from 08:00 (wrapping after 8).
pub fn appointments_at(prefix: &str, sites: &[Site]) -> Vec<Appointment> {
    sites
        .iter()
        .enumerate()
        .map(|(i, site)| {
            TestAppointment::new(&format!("{prefix}{i}"))
                .at(site)
                .scheduled(8 + (i % 8) as u32, 0)
                .build()
        })
        .collect()
}

/// Sorted ids across routes and the unassigned list.
pub fn all_ids(result: &route_optimizer::RouteOptimizationResult) -> Vec<String> {
    let mut ids: Vec<String> = result
        .routes
        .iter()
        .flat_map(|route| route.appointments())
        .chain(result.unassigned_appointments.iter())
        .map(|appointment| appointment.id.clone())
        .collect();
    ids.sort();
    ids
}

pub fn sorted_input_ids(appointments: &[Appointment]) -> Vec<String> {
    let mut ids: Vec<String> = appointments.iter().map(|a| a.id.clone()).collect();
    ids.sort();
    ids
}

//! Naive routing metrics used as the savings denominator.

use serde::Serialize;

use crate::model::Appointment;

const BASELINE_HOP_MILES: f64 = 15.0;
const BASELINE_TRAVEL_MINUTES: f64 = 25.0;

/// Totals for an unoptimized day: every appointment costs a fixed hop.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Baseline {
    pub total_distance: f64,
    /// Travel plus service, in minutes.
    pub total_time: f64,
}

pub fn estimate_baseline<'a>(appointments: impl IntoIterator<Item = &'a Appointment>) -> Baseline {
    appointments
        .into_iter()
        .fold(Baseline::default(), |acc, appointment| Baseline {
            total_distance: acc.total_distance + BASELINE_HOP_MILES,
            total_time: acc.total_time + BASELINE_TRAVEL_MINUTES + appointment.estimated_duration,
        })
}

//! In-memory historical store with a retention window.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use parking_lot::RwLock;

use crate::error::ProviderError;
use crate::traits::{HistoricalStore, OptimizationRecord};

pub const DEFAULT_RETENTION_DAYS: u64 = 90;

/// Append-only history of optimization runs.
///
/// Reads take a shared lock; each `put` appends under the write lock and
/// evicts records older than the retention window relative to the new
/// record's date.
#[derive(Debug)]
pub struct InMemoryHistory {
    retention_days: u64,
    records: RwLock<BTreeMap<NaiveDate, Vec<OptimizationRecord>>>,
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_DAYS)
    }
}

impl InMemoryHistory {
    pub fn new(retention_days: u64) -> Self {
        Self {
            retention_days,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn durations<'a>(
        records: &'a BTreeMap<NaiveDate, Vec<OptimizationRecord>>,
    ) -> impl Iterator<Item = &'a crate::traits::ServiceSample> + 'a {
        records
            .values()
            .flatten()
            .flat_map(|record| record.samples.iter())
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

impl HistoricalStore for InMemoryHistory {
    fn get(&self, date: NaiveDate) -> Vec<OptimizationRecord> {
        self.records.read().get(&date).cloned().unwrap_or_default()
    }

    fn put(&self, record: OptimizationRecord) -> Result<(), ProviderError> {
        let cutoff = record
            .date
            .checked_sub_days(Days::new(self.retention_days))
            .ok_or_else(|| ProviderError::Malformed(format!("record date {} out of range", record.date)))?;

        let mut records = self.records.write();
        records.entry(record.date).or_default().push(record);
        let kept = records.split_off(&cutoff);
        *records = kept;
        Ok(())
    }

    fn evict_older_than(&self, cutoff: NaiveDate) -> usize {
        let mut records = self.records.write();
        let kept = records.split_off(&cutoff);
        let dropped = records.values().map(Vec::len).sum();
        *records = kept;
        dropped
    }

    fn average_duration(&self, service_type: &str, customer_id: &str) -> Option<f64> {
        let records = self.records.read();
        mean(
            Self::durations(&records)
                .filter(|s| s.service_type == service_type && s.customer_id == customer_id)
                .map(|s| s.duration),
        )
    }

    fn complexity_factor(&self, customer_id: &str) -> f64 {
        let records = self.records.read();
        let overall = mean(Self::durations(&records).map(|s| s.duration));
        let customer = mean(
            Self::durations(&records)
                .filter(|s| s.customer_id == customer_id)
                .map(|s| s.duration),
        );
        match (customer, overall) {
            (Some(customer), Some(overall)) if overall > 0.0 => (customer / overall).clamp(0.8, 1.5),
            _ => 1.0,
        }
    }
}

//! Field-service route optimizer.
//!
//! Assigns appointments to technicians and orders each technician's day.
//! Start from [`optimize_routes`] or build an [`Optimizer`] with custom
//! weather, traffic and history collaborators.

pub mod baseline;
pub mod construct;
pub mod enrichment;
pub mod error;
pub mod fitness;
pub mod genetic;
pub mod haversine;
pub mod history;
pub mod local_search;
pub mod model;
pub mod options;
pub mod report;
pub mod route;
pub mod solution;
pub mod solver;
pub mod traffic;
pub mod traits;
pub mod weather;

pub use error::{OptimizerError, ProviderError, Result};
pub use history::InMemoryHistory;
pub use model::{Appointment, CustomerPreferences, Location, Priority, Technician, TimeWindow};
pub use options::OptimizationOptions;
pub use route::{OptimizedRoute, RouteStop};
pub use solver::{Optimizer, RouteOptimizationResult, optimize_routes};
pub use traits::{HistoricalStore, TrafficProvider, Weather, WeatherProvider};

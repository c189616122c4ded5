//! Error types for the optimizer and its collaborators.

use thiserror::Error;

/// Errors surfaced to callers of the optimizer.
///
/// Only invalid input is reported this way. Infeasible placements, failed
/// lookups and non-convergence all degrade the result instead.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("invalid appointment {id:?}: {reason}")]
    InvalidAppointment { id: String, reason: String },

    #[error("invalid technician {id:?}: {reason}")]
    InvalidTechnician { id: String, reason: String },

    #[error("duplicate appointment id {0:?}")]
    DuplicateAppointment(String),

    #[error("invalid timestamp {value:?}")]
    InvalidTimestamp { value: String },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

impl OptimizerError {
    pub fn invalid_appointment(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAppointment {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_technician(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTechnician {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of an external data collaborator (weather, traffic, history).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

//! Lifecycle error taxonomy.
//!
//! Validation and not-found failures happen before any mutation; an
//! `InvalidTransition` or `Rejected` guarantees nothing was persisted;
//! `Store` is the catch-all for unexpected persistence failures.

use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::AppointmentStatus;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Operation not allowed: {0}")]
    Rejected(String),

    #[error("Appointment not found: {0}")]
    NotFound(String),

    #[error("Appointment {id} was modified concurrently; retry with fresh state")]
    Conflict { id: String },

    #[error("Store error: {0}")]
    Store(DatabaseError),
}

impl From<DatabaseError> for LifecycleError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { id, .. } => LifecycleError::NotFound(id),
            DatabaseError::VersionConflict { id, .. } => LifecycleError::Conflict { id },
            other => LifecycleError::Store(other),
        }
    }
}

impl LifecycleError {
    /// Stable machine-readable code, used in batch item results.
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::Validation(_) => "validation_error",
            LifecycleError::InvalidTransition { .. } => "invalid_transition",
            LifecycleError::Rejected(_) => "failed",
            LifecycleError::NotFound(_) => "resource_not_found",
            LifecycleError::Conflict { .. } => "conflict",
            LifecycleError::Store(_) => "internal_server_error",
        }
    }
}

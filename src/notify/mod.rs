//! Notification dispatch after committed lifecycle transitions.
//!
//! The lifecycle layer calls `NotificationDispatcher::notify` only after the
//! store accepted the write. Dispatch errors are logged by the caller and
//! never undo or fail the transition.

mod logging;
#[cfg(test)]
mod recording;
mod webhook;

use serde::Serialize;
use thiserror::Error;

use crate::models::{AppointmentStatus, TestResult};

pub use logging::LogDispatcher;
#[cfg(test)]
pub use recording::RecordingDispatcher;
pub use webhook::WebhookDispatcher;

/// What happened to an appointment, as seen by downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum NotificationEvent {
    /// Final result available (status `Reported`).
    ResultReady { result: TestResult },
    /// Sample must be re-run by the lab.
    ReRunRequired { result: TestResult },
    /// A new sample must be collected from the patient.
    ReCollectRequired { result: TestResult },
    /// Any other status change (admin transitions, check-in, cancel).
    StatusChanged {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}

impl NotificationEvent {
    /// Event describing a committed move from `from` to `to`.
    pub fn for_transition(
        from: AppointmentStatus,
        to: AppointmentStatus,
        result: Option<TestResult>,
    ) -> Self {
        match (to, result) {
            (AppointmentStatus::Reported, Some(result)) => Self::ResultReady { result },
            (AppointmentStatus::ReRunRequired, Some(result)) => Self::ReRunRequired { result },
            (AppointmentStatus::ReCollectRequired, Some(result)) => {
                Self::ReCollectRequired { result }
            }
            _ => Self::StatusChanged { from, to },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ResultReady { .. } => "resultReady",
            Self::ReRunRequired { .. } => "reRunRequired",
            Self::ReCollectRequired { .. } => "reCollectRequired",
            Self::StatusChanged { .. } => "statusChanged",
        }
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification queue full")]
    QueueFull,

    #[error("Notification worker stopped")]
    Closed,

    #[error("Notification sink error: {0}")]
    Sink(String),
}

/// Downstream sink for lifecycle events (email/push/pub-sub bridges).
pub trait NotificationDispatcher: Send + Sync {
    fn notify(&self, appointment_id: &str, event: &NotificationEvent) -> Result<(), NotifyError>;
}

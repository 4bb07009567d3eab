//! Appointment lifecycle: the transition table, lab-result processing and the
//! admin/check-in operations built on it.
//!
//! All mutations share one load-decide-save path with optimistic
//! concurrency, and every committed change is announced to the
//! notification dispatcher afterwards.

pub mod barcode;
pub mod error;
pub mod processor;
pub mod service;
pub mod transition;
pub mod types;

pub use error::LifecycleError;
pub use processor::ResultProcessor;
pub use service::{AppointmentService, OrganizationReport, TransitionRequest};
pub use transition::{allowed_transitions, can_transition, is_terminal, validate_transition};
pub use types::*;

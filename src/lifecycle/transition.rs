//! Status transition table for test appointments.
//!
//! Forward progression Pending → Submitted → InTransit → Received →
//! CheckedIn → InProgress → Reported, with two loops: ReRunRequired goes
//! back to InProgress, ReCollectRequired goes back to CheckedIn. Every
//! non-terminal state may be canceled. Reported and Canceled are terminal.

use crate::models::AppointmentStatus;

use super::error::LifecycleError;

/// Legal targets from `current`.
pub fn allowed_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
    use AppointmentStatus::*;
    match current {
        Pending => &[Submitted, Canceled],
        Submitted => &[InTransit, Canceled],
        InTransit => &[Received, Canceled],
        Received => &[CheckedIn, Canceled],
        CheckedIn => &[InProgress, Canceled],
        InProgress => &[Reported, ReRunRequired, ReCollectRequired, Canceled],
        ReRunRequired => &[InProgress, Canceled],
        ReCollectRequired => &[CheckedIn, Canceled],
        Reported | Canceled => &[],
    }
}

pub fn can_transition(current: AppointmentStatus, requested: AppointmentStatus) -> bool {
    allowed_transitions(current).contains(&requested)
}

pub fn is_terminal(status: AppointmentStatus) -> bool {
    allowed_transitions(status).is_empty()
}

/// `can_transition` as a `Result`, carrying the attempted pair on rejection.
pub fn validate_transition(
    current: AppointmentStatus,
    requested: AppointmentStatus,
) -> Result<(), LifecycleError> {
    if can_transition(current, requested) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition {
            from: current,
            to: requested,
        })
    }
}

//! Lab-result processing.
//!
//! Every mutation goes through `update_with_retry`: load the freshest copy,
//! decide, then compare-and-swap save. A version conflict reloads and
//! decides again, so two concurrent payloads for one appointment are
//! serialized by the store and a replayed payload lands as `AlreadyApplied`.
//! Notifications are dispatched only after the save returned (commit, then
//! notify).

use std::sync::Arc;

use chrono::Utc;

use crate::db::{AppointmentStore, DatabaseError};
use crate::models::{Appointment, AppointmentStatus, ResultAction, TestResult};
use crate::notify::{NotificationDispatcher, NotificationEvent};

use super::error::LifecycleError;
use super::transition::{is_terminal, validate_transition};
use super::types::*;

/// Outcome of a load-decide-save cycle.
pub(crate) struct Committed {
    pub before: Appointment,
    pub after: Appointment,
    pub written: bool,
}

/// Load, let `decide` produce the next record (or `None` for no write), save
/// with compare-and-swap. Version conflicts reload up to `retries` times.
pub(crate) fn update_with_retry<F>(
    store: &dyn AppointmentStore,
    id: &str,
    retries: u32,
    mut decide: F,
) -> Result<Committed, LifecycleError>
where
    F: FnMut(&Appointment) -> Result<Option<Appointment>, LifecycleError>,
{
    let mut attempt = 0;
    loop {
        let current = store.get(id)?;
        let Some(next) = decide(&current)? else {
            return Ok(Committed {
                after: current.clone(),
                before: current,
                written: false,
            });
        };

        match store.save(&next) {
            Ok(saved) => {
                return Ok(Committed {
                    before: current,
                    after: saved,
                    written: true,
                })
            }
            Err(DatabaseError::VersionConflict { stored, .. }) if attempt < retries => {
                attempt += 1;
                tracing::debug!(appointment_id = id, attempt, stored, "Version conflict, reloading");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Copy of `current` moved to `status`. The result is kept only for
/// result-bearing statuses.
pub(crate) fn with_status(
    current: &Appointment,
    status: AppointmentStatus,
    result: Option<TestResult>,
) -> Appointment {
    let mut next = current.clone();
    next.status = status;
    next.result = if status.carries_result() { result } else { None };
    next.updated_at = Utc::now();
    next
}

/// Hand an event to the dispatcher; failures are logged, never returned.
pub(crate) fn dispatch(
    notifier: &dyn NotificationDispatcher,
    appointment_id: &str,
    event: &NotificationEvent,
) {
    if let Err(e) = notifier.notify(appointment_id, event) {
        tracing::warn!(
            appointment_id,
            event = event.name(),
            error = %e,
            "Notification dispatch failed; transition kept"
        );
    }
}

pub(crate) fn validate_appointment_id(id: &str) -> Result<(), LifecycleError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(LifecycleError::Validation("appointmentID is required".into()));
    }
    if trimmed.len() != id.len() || id.len() > 128 {
        return Err(LifecycleError::Validation(format!(
            "appointmentID is malformed: {id:?}"
        )));
    }
    Ok(())
}

/// Applies lab-result actions to appointments.
pub struct ResultProcessor {
    store: Arc<dyn AppointmentStore>,
    notifier: Arc<dyn NotificationDispatcher>,
    conflict_retries: u32,
    max_batch_size: usize,
}

impl ResultProcessor {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        notifier: Arc<dyn NotificationDispatcher>,
        conflict_retries: u32,
        max_batch_size: usize,
    ) -> Self {
        Self {
            store,
            notifier,
            conflict_retries,
            max_batch_size,
        }
    }

    /// Apply one lab-result action.
    ///
    /// Fails with `InvalidTransition` when the action's target is not
    /// reachable from the current status (nothing is persisted). Replaying the
    /// action an appointment already reflects succeeds as `AlreadyApplied`
    /// without a second notification.
    pub fn process_result(
        &self,
        appointment_id: &str,
        payload: &LabPayload,
    ) -> Result<ProcessedResult, LifecycleError> {
        validate_appointment_id(appointment_id)?;
        let action = payload.action;

        let committed = update_with_retry(
            self.store.as_ref(),
            appointment_id,
            self.conflict_retries,
            |current| decide_result(current, action),
        )
        .inspect_err(|e| {
            tracing::warn!(appointment_id, action = %action, error = %e, "Result rejected");
        })?;

        let after = &committed.after;
        let (outcome, notification) = if committed.written {
            let event = NotificationEvent::for_transition(
                committed.before.status,
                after.status,
                after.result,
            );
            tracing::info!(
                appointment_id,
                action = %action,
                from = %committed.before.status,
                to = %after.status,
                version = after.version,
                "Result applied"
            );
            dispatch(self.notifier.as_ref(), appointment_id, &event);
            (ProcessOutcome::Applied, Some(event))
        } else if action == ResultAction::DoNothing {
            (ProcessOutcome::NoOp, None)
        } else {
            tracing::info!(appointment_id, action = %action, "Result already applied");
            (ProcessOutcome::AlreadyApplied, None)
        };

        Ok(ProcessedResult {
            appointment_id: appointment_id.to_string(),
            outcome,
            status: after.status,
            result: after.result,
            version: after.version,
            notification,
        })
    }

    /// Process entries in order; one entry's failure never affects another.
    ///
    /// The batch itself is rejected up front (before any store access) only
    /// when it is empty or over the size limit. A malformed id fails just its
    /// own entry.
    pub fn process_batch(
        &self,
        entries: &[BatchEntry],
    ) -> Result<Vec<BatchItemResult>, LifecycleError> {
        if entries.is_empty() {
            return Err(LifecycleError::Validation("batch must not be empty".into()));
        }
        if entries.len() > self.max_batch_size {
            return Err(LifecycleError::Validation(format!(
                "batch of {} entries exceeds the limit of {}",
                entries.len(),
                self.max_batch_size
            )));
        }

        let results: Vec<BatchItemResult> = entries
            .iter()
            .map(|entry| {
                let payload = LabPayload {
                    action: entry.action,
                };
                BatchItemResult::new(entry, self.process_result(&entry.appointment_id, &payload))
            })
            .collect();

        let failed = results.iter().filter(|r| !r.is_success()).count();
        tracing::info!(
            total = results.len(),
            failed,
            "Result batch processed"
        );
        Ok(results)
    }
}

/// Next record for `action`, or `None` when nothing should be written.
fn decide_result(
    current: &Appointment,
    action: ResultAction,
) -> Result<Option<Appointment>, LifecycleError> {
    let Some((status, result)) = action.target() else {
        if is_terminal(current.status) {
            return Err(LifecycleError::InvalidTransition {
                from: current.status,
                to: current.status,
            });
        }
        return Ok(None);
    };

    if current.status == status && current.result == Some(result) {
        return Ok(None);
    }

    validate_transition(current.status, status)?;
    Ok(Some(with_status(current, status, Some(result))))
}

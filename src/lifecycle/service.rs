//! Booking, admin transitions, check-in and barcode management.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{AppointmentStore, DatabaseError};
use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, TestResult};
use crate::notify::{NotificationDispatcher, NotificationEvent};

use super::barcode::{generate_barcode, validate_barcode};
use super::error::LifecycleError;
use super::processor::{dispatch, update_with_retry, validate_appointment_id, with_status};
use super::transition::validate_transition;

/// Generated barcodes retried this many times on a uniqueness collision.
const BARCODE_ATTEMPTS: usize = 5;

/// Statuses at which a specimen exists and may be (re)labelled.
const BARCODE_STATUSES: &[AppointmentStatus] = &[
    AppointmentStatus::Received,
    AppointmentStatus::CheckedIn,
    AppointmentStatus::InProgress,
    AppointmentStatus::ReRunRequired,
    AppointmentStatus::ReCollectRequired,
];

/// Admin status change request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub status: AppointmentStatus,
    #[serde(default)]
    pub result: Option<TestResult>,
    /// Optimistic-concurrency guard; the change is refused when the stored
    /// version differs.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// Status and result counts for one organization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationReport {
    pub organization_id: String,
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_result: BTreeMap<&'static str, usize>,
}

pub struct AppointmentService {
    store: Arc<dyn AppointmentStore>,
    notifier: Arc<dyn NotificationDispatcher>,
    conflict_retries: u32,
}

impl AppointmentService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        notifier: Arc<dyn NotificationDispatcher>,
        conflict_retries: u32,
    ) -> Self {
        Self {
            store,
            notifier,
            conflict_retries,
        }
    }

    /// Book a new appointment (status `Pending`).
    pub fn create_appointment(
        &self,
        organization_id: &str,
        user_id: &str,
    ) -> Result<Appointment, LifecycleError> {
        require_reference("organizationId", organization_id)?;
        require_reference("userId", user_id)?;

        let appt = Appointment::new(organization_id.to_string(), user_id.to_string());
        self.store.insert(&appt)?;
        tracing::info!(
            appointment_id = %appt.id,
            organization_id,
            "Appointment booked"
        );
        Ok(appt)
    }

    pub fn get_appointment(&self, id: &str) -> Result<Appointment, LifecycleError> {
        validate_appointment_id(id)?;
        Ok(self.store.get(id)?)
    }

    pub fn find_by_barcode(&self, bar_code: &str) -> Result<Appointment, LifecycleError> {
        validate_barcode(bar_code)?;
        self.store
            .find_by_barcode(bar_code)?
            .ok_or_else(|| LifecycleError::NotFound(format!("bar code {bar_code}")))
    }

    pub fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, LifecycleError> {
        Ok(self.store.list(filter)?)
    }

    /// Admin status change.
    ///
    /// `result` must be given exactly when the target status is
    /// result-bearing. Leaving a result-bearing status clears the result.
    pub fn transition(
        &self,
        id: &str,
        request: &TransitionRequest,
    ) -> Result<Appointment, LifecycleError> {
        validate_appointment_id(id)?;
        match (request.status.carries_result(), request.result) {
            (true, None) => {
                return Err(LifecycleError::Validation(format!(
                    "result is required for status {}",
                    request.status
                )))
            }
            (false, Some(_)) => {
                return Err(LifecycleError::Validation(format!(
                    "result is not allowed for status {}",
                    request.status
                )))
            }
            _ => {}
        }

        let committed = update_with_retry(self.store.as_ref(), id, self.conflict_retries, |current| {
            if let Some(expected) = request.expected_version {
                if current.version != expected {
                    return Err(LifecycleError::Conflict { id: id.to_string() });
                }
            }
            validate_transition(current.status, request.status)?;
            Ok(Some(with_status(current, request.status, request.result)))
        })?;

        self.announce(&committed.before, &committed.after);
        Ok(committed.after)
    }

    /// Move to `CheckedIn` and label the specimen.
    ///
    /// An explicit `bar_code` is used as-is. Without one, the existing code is
    /// kept, or a fresh one generated when there is none or when the patient
    /// is back for a re-collection (new specimen, new code).
    pub fn check_in(
        &self,
        id: &str,
        bar_code: Option<&str>,
    ) -> Result<Appointment, LifecycleError> {
        validate_appointment_id(id)?;
        if let Some(code) = bar_code {
            validate_barcode(code)?;
        }

        let committed = self.with_barcode_retries(bar_code.is_none(), |candidate| {
            update_with_retry(self.store.as_ref(), id, self.conflict_retries, |current| {
                validate_transition(current.status, AppointmentStatus::CheckedIn)?;
                let mut next = with_status(current, AppointmentStatus::CheckedIn, None);
                next.bar_code = match bar_code {
                    Some(code) => Some(code.to_string()),
                    None if current.bar_code.is_none()
                        || current.status == AppointmentStatus::ReCollectRequired =>
                    {
                        Some(candidate.to_string())
                    }
                    None => current.bar_code.clone(),
                };
                Ok(Some(next))
            })
        })?;

        self.announce(&committed.before, &committed.after);
        Ok(committed.after)
    }

    /// Replace the specimen barcode; identity and status are unchanged.
    pub fn regenerate_barcode(&self, id: &str) -> Result<Appointment, LifecycleError> {
        validate_appointment_id(id)?;

        let committed = self.with_barcode_retries(true, |candidate| {
            update_with_retry(self.store.as_ref(), id, self.conflict_retries, |current| {
                if !BARCODE_STATUSES.contains(&current.status) {
                    return Err(LifecycleError::Rejected(format!(
                        "bar code cannot be assigned while appointment is {}",
                        current.status
                    )));
                }
                let mut next = current.clone();
                next.bar_code = Some(candidate.to_string());
                next.updated_at = Utc::now();
                Ok(Some(next))
            })
        })?;

        tracing::info!(
            appointment_id = id,
            previous = ?committed.before.bar_code,
            "Bar code regenerated"
        );
        Ok(committed.after)
    }

    /// Counts per status and per result for one organization; every status
    /// appears, zero or not.
    pub fn organization_report(
        &self,
        organization_id: &str,
    ) -> Result<OrganizationReport, LifecycleError> {
        require_reference("organizationId", organization_id)?;
        let appointments = self.store.list(&AppointmentFilter {
            organization_id: Some(organization_id.to_string()),
            ..Default::default()
        })?;

        let mut by_status: BTreeMap<&'static str, usize> = AppointmentStatus::ALL
            .iter()
            .map(|s| (s.as_str(), 0))
            .collect();
        let mut by_result: BTreeMap<&'static str, usize> = BTreeMap::new();
        for appt in &appointments {
            *by_status.entry(appt.status.as_str()).or_default() += 1;
            if let Some(result) = appt.result {
                *by_result.entry(result.as_str()).or_default() += 1;
            }
        }

        Ok(OrganizationReport {
            organization_id: organization_id.to_string(),
            total: appointments.len(),
            by_status,
            by_result,
        })
    }

    /// Run `attempt` with a fresh generated barcode until it does not collide.
    /// When `generated` is false the caller supplied the code and a collision
    /// is a validation error.
    fn with_barcode_retries<T, F>(&self, generated: bool, mut attempt: F) -> Result<T, LifecycleError>
    where
        F: FnMut(&str) -> Result<T, LifecycleError>,
    {
        let mut tries = 0;
        loop {
            let candidate = generate_barcode();
            match attempt(&candidate) {
                Err(LifecycleError::Store(DatabaseError::ConstraintViolation(detail))) => {
                    if !generated {
                        return Err(LifecycleError::Validation(
                            "barCode is already assigned to another appointment".into(),
                        ));
                    }
                    tries += 1;
                    if tries >= BARCODE_ATTEMPTS {
                        return Err(LifecycleError::Store(DatabaseError::ConstraintViolation(
                            detail,
                        )));
                    }
                    tracing::debug!(tries, "Generated bar code collided, retrying");
                }
                other => return other,
            }
        }
    }

    fn announce(&self, before: &Appointment, after: &Appointment) {
        tracing::info!(
            appointment_id = %after.id,
            from = %before.status,
            to = %after.status,
            version = after.version,
            "Appointment status changed"
        );
        let event = NotificationEvent::for_transition(before.status, after.status, after.result);
        dispatch(self.notifier.as_ref(), &after.id, &event);
    }
}

fn require_reference(field: &str, value: &str) -> Result<(), LifecycleError> {
    if value.trim().is_empty() {
        return Err(LifecycleError::Validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryAppointmentStore;
    use crate::notify::RecordingDispatcher;

    fn service() -> (AppointmentService, Arc<InMemoryAppointmentStore>, Arc<RecordingDispatcher>) {
        let store = Arc::new(InMemoryAppointmentStore::new());
        let notifier = Arc::new(RecordingDispatcher::new());
        (
            AppointmentService::new(store.clone(), notifier.clone(), 3),
            store,
            notifier,
        )
    }

    fn request(status: AppointmentStatus, result: Option<TestResult>) -> TransitionRequest {
        TransitionRequest {
            status,
            result,
            expected_version: None,
        }
    }

    fn walk_to(svc: &AppointmentService, id: &str, path: &[AppointmentStatus]) {
        for status in path {
            svc.transition(id, &request(*status, None)).unwrap();
        }
    }

    #[test]
    fn booking_starts_pending() {
        let (svc, store, _) = service();
        let appt = svc.create_appointment("org-1", "user-1").unwrap();
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert_eq!(store.get(&appt.id).unwrap(), appt);
        assert!(matches!(
            svc.create_appointment(" ", "user-1"),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn admin_walk_through_lifecycle() {
        use AppointmentStatus::*;
        let (svc, _, notifier) = service();
        let appt = svc.create_appointment("org-1", "user-1").unwrap();

        walk_to(&svc, &appt.id, &[Submitted, InTransit, Received, CheckedIn, InProgress]);
        let reported = svc
            .transition(&appt.id, &request(Reported, Some(TestResult::Positive)))
            .unwrap();

        assert_eq!(reported.status, Reported);
        assert_eq!(reported.result, Some(TestResult::Positive));
        assert_eq!(reported.version, 7);

        let events = notifier.events_for(&appt.id);
        assert_eq!(events.len(), 6);
        assert_eq!(
            events.last(),
            Some(&NotificationEvent::ResultReady {
                result: TestResult::Positive
            })
        );
    }

    #[test]
    fn result_is_required_exactly_for_result_states() {
        let (svc, _, _) = service();
        let appt = svc.create_appointment("org-1", "user-1").unwrap();

        assert!(matches!(
            svc.transition(&appt.id, &request(AppointmentStatus::Reported, None)),
            Err(LifecycleError::Validation(_))
        ));
        assert!(matches!(
            svc.transition(
                &appt.id,
                &request(AppointmentStatus::Submitted, Some(TestResult::Negative))
            ),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn rerun_loop_clears_result() {
        use AppointmentStatus::*;
        let (svc, _, _) = service();
        let appt = svc.create_appointment("org-1", "user-1").unwrap();
        walk_to(&svc, &appt.id, &[Submitted, InTransit, Received, CheckedIn, InProgress]);

        let rerun = svc
            .transition(&appt.id, &request(ReRunRequired, Some(TestResult::Inconclusive)))
            .unwrap();
        assert!(rerun.result_invariant_holds());

        let back = svc.transition(&appt.id, &request(InProgress, None)).unwrap();
        assert_eq!(back.result, None);
        assert!(back.result_invariant_holds());
    }

    #[test]
    fn stale_expected_version_is_conflict() {
        let (svc, store, _) = service();
        let appt = svc.create_appointment("org-1", "user-1").unwrap();

        let err = svc
            .transition(
                &appt.id,
                &TransitionRequest {
                    status: AppointmentStatus::Submitted,
                    result: None,
                    expected_version: Some(5),
                },
            )
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict { .. }));
        assert_eq!(store.get(&appt.id).unwrap().status, AppointmentStatus::Pending);
    }

    #[test]
    fn illegal_admin_transition_is_rejected() {
        let (svc, _, notifier) = service();
        let appt = svc.create_appointment("org-1", "user-1").unwrap();
        let err = svc
            .transition(&appt.id, &request(AppointmentStatus::CheckedIn, None))
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                from: AppointmentStatus::Pending,
                to: AppointmentStatus::CheckedIn,
            }
        ));
        assert!(notifier.events().is_empty());
    }

    #[test]
    fn check_in_assigns_barcode() {
        use AppointmentStatus::*;
        let (svc, _, _) = service();
        let appt = svc.create_appointment("org-1", "user-1").unwrap();
        walk_to(&svc, &appt.id, &[Submitted, InTransit, Received]);

        let checked_in = svc.check_in(&appt.id, None).unwrap();
        assert_eq!(checked_in.status, CheckedIn);
        let code = checked_in.bar_code.clone().unwrap();
        assert_eq!(svc.find_by_barcode(&code).unwrap().id, appt.id);
    }

    #[test]
    fn recollection_gets_new_barcode() {
        use AppointmentStatus::*;
        let (svc, _, _) = service();
        let appt = svc.create_appointment("org-1", "user-1").unwrap();
        walk_to(&svc, &appt.id, &[Submitted, InTransit, Received]);
        let first = svc.check_in(&appt.id, Some("LAB-0001")).unwrap();
        walk_to(&svc, &appt.id, &[InProgress]);
        svc.transition(&appt.id, &request(ReCollectRequired, Some(TestResult::Invalid)))
            .unwrap();

        let second = svc.check_in(&appt.id, None).unwrap();
        assert_eq!(second.id, first.id);
        assert_ne!(second.bar_code, first.bar_code);
        assert_eq!(second.result, None);
    }

    #[test]
    fn duplicate_supplied_barcode_is_validation_error() {
        use AppointmentStatus::*;
        let (svc, _, _) = service();
        let a = svc.create_appointment("org-1", "user-1").unwrap();
        let b = svc.create_appointment("org-1", "user-2").unwrap();
        walk_to(&svc, &a.id, &[Submitted, InTransit, Received]);
        walk_to(&svc, &b.id, &[Submitted, InTransit, Received]);

        svc.check_in(&a.id, Some("LAB-7")).unwrap();
        assert!(matches!(
            svc.check_in(&b.id, Some("LAB-7")),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn regenerate_keeps_identity() {
        use AppointmentStatus::*;
        let (svc, _, notifier) = service();
        let appt = svc.create_appointment("org-1", "user-1").unwrap();
        assert!(matches!(
            svc.regenerate_barcode(&appt.id),
            Err(LifecycleError::Rejected(_))
        ));

        walk_to(&svc, &appt.id, &[Submitted, InTransit, Received]);
        let checked_in = svc.check_in(&appt.id, None).unwrap();
        let events_before = notifier.events().len();

        let regenerated = svc.regenerate_barcode(&appt.id).unwrap();
        assert_eq!(regenerated.id, appt.id);
        assert_eq!(regenerated.status, CheckedIn);
        assert_ne!(regenerated.bar_code, checked_in.bar_code);
        assert_eq!(notifier.events().len(), events_before);
    }

    #[test]
    fn report_counts_every_status() {
        use AppointmentStatus::*;
        let (svc, _, _) = service();
        let a = svc.create_appointment("org-r", "user-1").unwrap();
        svc.create_appointment("org-r", "user-2").unwrap();
        svc.create_appointment("org-other", "user-3").unwrap();
        walk_to(&svc, &a.id, &[Submitted, InTransit, Received, CheckedIn, InProgress]);
        svc.transition(&a.id, &request(Reported, Some(TestResult::Negative)))
            .unwrap();

        let report = svc.organization_report("org-r").unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.by_status["Pending"], 1);
        assert_eq!(report.by_status["Reported"], 1);
        assert_eq!(report.by_status["Canceled"], 0);
        assert_eq!(report.by_status.len(), AppointmentStatus::ALL.len());
        assert_eq!(report.by_result["Negative"], 1);
    }
}

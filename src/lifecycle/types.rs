use serde::{Deserialize, Serialize};

use crate::models::{AppointmentStatus, ResultAction, TestResult};
use crate::notify::NotificationEvent;

use super::error::LifecycleError;

/// Lab-result payload as delivered by HTTP callers or pub/sub pushes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabPayload {
    pub action: ResultAction,
}

impl ResultAction {
    /// Target `(status, result)` for an action; `None` for `DoNothing`.
    pub fn target(&self) -> Option<(AppointmentStatus, TestResult)> {
        match self {
            ResultAction::DoNothing => None,
            ResultAction::SendNegative => Some((AppointmentStatus::Reported, TestResult::Negative)),
            ResultAction::SendPositive => Some((AppointmentStatus::Reported, TestResult::Positive)),
            ResultAction::SendInconclusive => {
                Some((AppointmentStatus::ReRunRequired, TestResult::Inconclusive))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessOutcome {
    /// State changed and was persisted.
    Applied,
    /// `DoNothing`: appointment checked, nothing written.
    NoOp,
    /// Appointment already carried the target state; nothing written or sent.
    AlreadyApplied,
}

/// Result of one `process_result` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedResult {
    pub appointment_id: String,
    pub outcome: ProcessOutcome,
    pub status: AppointmentStatus,
    pub result: Option<TestResult>,
    pub version: u64,
    /// Event handed to the dispatcher, if any. `None` means no
    /// notification should (or did) fire.
    pub notification: Option<NotificationEvent>,
}

/// One entry of a bulk result request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    #[serde(rename = "appointmentID", alias = "appointmentId")]
    pub appointment_id: String,
    pub action: ResultAction,
}

/// Per-entry outcome of a batch; failures are isolated to their entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub appointment_id: String,
    pub action: ResultAction,
    #[serde(flatten)]
    pub outcome: BatchItemOutcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum BatchItemOutcome {
    Succeeded { result: ProcessedResult },
    Failed { code: &'static str, message: String },
}

impl BatchItemResult {
    pub fn new(entry: &BatchEntry, outcome: Result<ProcessedResult, LifecycleError>) -> Self {
        let outcome = match outcome {
            Ok(result) => BatchItemOutcome::Succeeded { result },
            Err(err) => BatchItemOutcome::Failed {
                code: err.code(),
                message: err.to_string(),
            },
        };
        Self {
            appointment_id: entry.appointment_id.clone(),
            action: entry.action,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchItemOutcome::Succeeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_targets() {
        assert_eq!(ResultAction::DoNothing.target(), None);
        assert_eq!(
            ResultAction::SendNegative.target(),
            Some((AppointmentStatus::Reported, TestResult::Negative))
        );
        assert_eq!(
            ResultAction::SendPositive.target(),
            Some((AppointmentStatus::Reported, TestResult::Positive))
        );
        assert_eq!(
            ResultAction::SendInconclusive.target(),
            Some((AppointmentStatus::ReRunRequired, TestResult::Inconclusive))
        );
    }

    #[test]
    fn batch_entry_accepts_both_id_spellings() {
        let upper: BatchEntry =
            serde_json::from_str(r#"{"appointmentID":"a-1","action":"SendNegative"}"#).unwrap();
        let camel: BatchEntry =
            serde_json::from_str(r#"{"appointmentId":"a-1","action":"SendNegative"}"#).unwrap();
        assert_eq!(upper, camel);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let parsed: Result<BatchEntry, _> =
            serde_json::from_str(r#"{"appointmentID":"a-1","action":"SendMaybe"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn failed_item_serializes_code() {
        let entry = BatchEntry {
            appointment_id: "a-4".into(),
            action: ResultAction::SendPositive,
        };
        let item = BatchItemResult::new(
            &entry,
            Err(LifecycleError::InvalidTransition {
                from: AppointmentStatus::Canceled,
                to: AppointmentStatus::Reported,
            }),
        );
        assert!(!item.is_success());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["appointmentId"], "a-4");
        assert_eq!(json["state"], "failed");
        assert_eq!(json["code"], "invalid_transition");
    }
}

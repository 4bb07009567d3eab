use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AppointmentStatus, TestResult};

/// A scheduled test and its lab-result state.
///
/// `version` starts at 1 and is bumped by the store on every successful
/// save; a save carrying a stale version is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub status: AppointmentStatus,
    pub bar_code: Option<String>,
    pub result: Option<TestResult>,
    pub organization_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Appointment {
    /// New booking: `Pending`, no barcode, no result.
    pub fn new(organization_id: String, user_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            status: AppointmentStatus::Pending,
            bar_code: None,
            result: None,
            organization_id,
            user_id,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// `result` is present iff the status is result-bearing.
    pub fn result_invariant_holds(&self) -> bool {
        self.result.is_some() == self.status.carries_result()
    }
}

/// Filter for appointment listings. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentFilter {
    pub organization_id: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appt: &Appointment) -> bool {
        self.organization_id
            .as_ref()
            .map_or(true, |org| &appt.organization_id == org)
            && self.user_id.as_ref().map_or(true, |user| &appt.user_id == user)
            && self.status.map_or(true, |status| appt.status == status)
    }
}

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::AppointmentStore;
use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentFilter};

/// In-process appointment store. Same compare-and-swap and barcode
/// uniqueness rules as the SQLite store, without persistence.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    records: RwLock<HashMap<String, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Appointment>>, DatabaseError> {
        self.records.read().map_err(|_| DatabaseError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Appointment>>, DatabaseError> {
        self.records.write().map_err(|_| DatabaseError::LockPoisoned)
    }
}

fn ensure_barcode_free(
    records: &HashMap<String, Appointment>,
    appt: &Appointment,
) -> Result<(), DatabaseError> {
    let Some(code) = appt.bar_code.as_deref() else {
        return Ok(());
    };
    let taken = records
        .values()
        .any(|other| other.id != appt.id && other.bar_code.as_deref() == Some(code));
    if taken {
        return Err(DatabaseError::ConstraintViolation(format!(
            "bar code {code} already assigned"
        )));
    }
    Ok(())
}

impl AppointmentStore for InMemoryAppointmentStore {
    fn get(&self, id: &str) -> Result<Appointment, DatabaseError> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| DatabaseError::appointment_not_found(id))
    }

    fn insert(&self, appt: &Appointment) -> Result<(), DatabaseError> {
        let mut records = self.write()?;
        if records.contains_key(&appt.id) {
            return Err(DatabaseError::ConstraintViolation(format!(
                "appointment {} already exists",
                appt.id
            )));
        }
        ensure_barcode_free(&records, appt)?;
        records.insert(appt.id.clone(), appt.clone());
        Ok(())
    }

    fn save(&self, appt: &Appointment) -> Result<Appointment, DatabaseError> {
        let mut records = self.write()?;
        let stored_version = records
            .get(&appt.id)
            .map(|stored| stored.version)
            .ok_or_else(|| DatabaseError::appointment_not_found(&appt.id))?;

        if stored_version != appt.version {
            return Err(DatabaseError::VersionConflict {
                id: appt.id.clone(),
                expected: appt.version,
                stored: stored_version,
            });
        }
        ensure_barcode_free(&records, appt)?;

        let mut saved = appt.clone();
        saved.version += 1;
        records.insert(saved.id.clone(), saved.clone());
        Ok(saved)
    }

    fn find_by_barcode(&self, bar_code: &str) -> Result<Option<Appointment>, DatabaseError> {
        Ok(self
            .read()?
            .values()
            .find(|appt| appt.bar_code.as_deref() == Some(bar_code))
            .cloned())
    }

    fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, DatabaseError> {
        let mut matching: Vec<Appointment> = self
            .read()?
            .values()
            .filter(|appt| filter.matches(appt))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matching)
    }
}

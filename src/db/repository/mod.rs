//! Repository layer: appointment persistence behind an injected trait.
//!
//! Handlers and the lifecycle service only ever see `dyn AppointmentStore`;
//! the SQLite store backs real deployments and the in-memory store backs
//! tests and throwaway instances.

mod appointment;
mod memory;

use crate::models::{Appointment, AppointmentFilter};

use super::DatabaseError;

pub use appointment::SqliteAppointmentStore;
pub use memory::InMemoryAppointmentStore;

/// Per-record persistence for appointments.
///
/// Single-record atomicity only. `save` is a compare-and-swap on
/// `Appointment::version`: the write lands only if the stored version equals
/// the one carried by the record, and the stored copy (with the bumped
/// version) is returned.
pub trait AppointmentStore: Send + Sync {
    /// Load one appointment. `DatabaseError::NotFound` when absent.
    fn get(&self, id: &str) -> Result<Appointment, DatabaseError>;

    /// Persist a brand-new appointment.
    fn insert(&self, appointment: &Appointment) -> Result<(), DatabaseError>;

    /// Conditional update. `VersionConflict` on a stale version,
    /// `ConstraintViolation` on a duplicate barcode.
    fn save(&self, appointment: &Appointment) -> Result<Appointment, DatabaseError>;

    fn find_by_barcode(&self, bar_code: &str) -> Result<Option<Appointment>, DatabaseError>;

    /// Matching appointments, oldest first.
    fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, TestResult};

    #[test]
    fn store_is_object_safe() {
        fn _assert_store(_: &dyn AppointmentStore) {}
    }

    /// Behaviour every store must share; run against both implementations.
    fn exercise_store(store: &dyn AppointmentStore) {
        let appt = Appointment::new("org-1".into(), "user-1".into());
        store.insert(&appt).unwrap();

        let loaded = store.get(&appt.id).unwrap();
        assert_eq!(loaded.id, appt.id);
        assert_eq!(loaded.version, 1);

        let mut update = loaded.clone();
        update.status = AppointmentStatus::Submitted;
        let saved = store.save(&update).unwrap();
        assert_eq!(saved.version, 2);
        assert_eq!(store.get(&appt.id).unwrap().status, AppointmentStatus::Submitted);

        // Stale write: `loaded` still carries version 1.
        let mut stale = loaded;
        stale.status = AppointmentStatus::Canceled;
        match store.save(&stale) {
            Err(DatabaseError::VersionConflict { expected, stored, .. }) => {
                assert_eq!(expected, 1);
                assert_eq!(stored, 2);
            }
            other => panic!("expected version conflict, got {other:?}"),
        }
        assert_eq!(store.get(&appt.id).unwrap().status, AppointmentStatus::Submitted);

        assert!(matches!(
            store.get("missing"),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    fn exercise_barcodes(store: &dyn AppointmentStore) {
        let mut first = Appointment::new("org-1".into(), "user-1".into());
        let mut second = Appointment::new("org-1".into(), "user-2".into());
        store.insert(&first).unwrap();
        store.insert(&second).unwrap();

        first.bar_code = Some("HP00000001".into());
        first = store.save(&first).unwrap();
        assert_eq!(
            store.find_by_barcode("HP00000001").unwrap().map(|a| a.id),
            Some(first.id.clone())
        );

        second.bar_code = Some("HP00000001".into());
        assert!(matches!(
            store.save(&second),
            Err(DatabaseError::ConstraintViolation(_))
        ));

        // Same record may keep its own code across saves.
        first.status = AppointmentStatus::Submitted;
        assert!(store.save(&first).is_ok());
        assert!(store.find_by_barcode("HP99999999").unwrap().is_none());
    }

    fn exercise_listing(store: &dyn AppointmentStore) {
        let mut reported = Appointment::new("org-a".into(), "user-1".into());
        reported.status = AppointmentStatus::Reported;
        reported.result = Some(TestResult::Negative);
        store.insert(&reported).unwrap();
        store
            .insert(&Appointment::new("org-a".into(), "user-2".into()))
            .unwrap();
        store
            .insert(&Appointment::new("org-b".into(), "user-1".into()))
            .unwrap();

        let org_a = store
            .list(&AppointmentFilter {
                organization_id: Some("org-a".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(org_a.len(), 2);

        let org_a_reported = store
            .list(&AppointmentFilter {
                organization_id: Some("org-a".into()),
                status: Some(AppointmentStatus::Reported),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(org_a_reported.len(), 1);
        assert_eq!(org_a_reported[0].result, Some(TestResult::Negative));

        let user_1 = store
            .list(&AppointmentFilter {
                user_id: Some("user-1".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(user_1.len(), 2);
    }

    #[test]
    fn memory_store_contract() {
        exercise_store(&InMemoryAppointmentStore::new());
        exercise_barcodes(&InMemoryAppointmentStore::new());
        exercise_listing(&InMemoryAppointmentStore::new());
    }

    #[test]
    fn sqlite_store_contract() {
        exercise_store(&SqliteAppointmentStore::open_in_memory().unwrap());
        exercise_barcodes(&SqliteAppointmentStore::open_in_memory().unwrap());
        exercise_listing(&SqliteAppointmentStore::open_in_memory().unwrap());
    }
}

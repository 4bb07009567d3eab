use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::AppointmentStore;
use crate::db::sqlite::{open_database, open_memory_database};
use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, TestResult};

const SELECT_COLUMNS: &str = "SELECT id, status, bar_code, result, organization_id, user_id,
     created_at, updated_at, version FROM appointments";

/// SQLite-backed appointment store.
///
/// One connection behind a mutex; each operation is a single statement, so
/// per-record atomicity comes from SQLite itself and the version check lives
/// in the `UPDATE ... WHERE version = ?` clause.
pub struct SqliteAppointmentStore {
    conn: Mutex<Connection>,
}

impl SqliteAppointmentStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(open_memory_database()?))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

impl AppointmentStore for SqliteAppointmentStore {
    fn get(&self, id: &str) -> Result<Appointment, DatabaseError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                appointment_row_from_rusqlite,
            )
            .optional()?;
        match row {
            Some(row) => appointment_from_row(row),
            None => Err(DatabaseError::appointment_not_found(id)),
        }
    }

    fn insert(&self, appt: &Appointment) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO appointments (id, status, bar_code, result, organization_id, user_id,
             created_at, updated_at, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                appt.id,
                appt.status.as_str(),
                appt.bar_code,
                appt.result.map(|r| r.as_str()),
                appt.organization_id,
                appt.user_id,
                format_timestamp(&appt.created_at),
                format_timestamp(&appt.updated_at),
                appt.version as i64,
            ],
        )
        .map_err(constraint_error)?;
        Ok(())
    }

    fn save(&self, appt: &Appointment) -> Result<Appointment, DatabaseError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE appointments
                 SET status = ?1, bar_code = ?2, result = ?3, updated_at = ?4,
                     version = version + 1
                 WHERE id = ?5 AND version = ?6",
                params![
                    appt.status.as_str(),
                    appt.bar_code,
                    appt.result.map(|r| r.as_str()),
                    format_timestamp(&appt.updated_at),
                    appt.id,
                    appt.version as i64,
                ],
            )
            .map_err(constraint_error)?;

        if changed == 0 {
            let stored: Option<i64> = conn
                .query_row(
                    "SELECT version FROM appointments WHERE id = ?1",
                    params![appt.id],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(match stored {
                Some(stored) => DatabaseError::VersionConflict {
                    id: appt.id.clone(),
                    expected: appt.version,
                    stored: stored as u64,
                },
                None => DatabaseError::appointment_not_found(&appt.id),
            });
        }

        let mut saved = appt.clone();
        saved.version += 1;
        Ok(saved)
    }

    fn find_by_barcode(&self, bar_code: &str) -> Result<Option<Appointment>, DatabaseError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{SELECT_COLUMNS} WHERE bar_code = ?1"),
            params![bar_code],
            appointment_row_from_rusqlite,
        )
        .optional()?
        .map(appointment_from_row)
        .transpose()
    }

    fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, DatabaseError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS}
             WHERE (?1 IS NULL OR organization_id = ?1)
               AND (?2 IS NULL OR user_id = ?2)
               AND (?3 IS NULL OR status = ?3)
             ORDER BY created_at ASC, id ASC"
        ))?;

        let rows = stmt.query_map(
            params![
                filter.organization_id,
                filter.user_id,
                filter.status.map(|s| s.as_str()),
            ],
            appointment_row_from_rusqlite,
        )?;

        let mut appointments = Vec::new();
        for row in rows {
            appointments.push(appointment_from_row(row?)?);
        }
        Ok(appointments)
    }
}

/// Raw column values, parsed into domain types by `appointment_from_row`.
struct AppointmentRow {
    id: String,
    status: String,
    bar_code: Option<String>,
    result: Option<String>,
    organization_id: String,
    user_id: String,
    created_at: String,
    updated_at: String,
    version: i64,
}

fn appointment_row_from_rusqlite(row: &Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        status: row.get(1)?,
        bar_code: row.get(2)?,
        result: row.get(3)?,
        organization_id: row.get(4)?,
        user_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        version: row.get(8)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: row.id,
        status: AppointmentStatus::from_str(&row.status)?,
        bar_code: row.bar_code,
        result: row.result.as_deref().map(TestResult::from_str).transpose()?,
        organization_id: row.organization_id,
        user_id: row.user_id,
        created_at: parse_timestamp("created_at", &row.created_at)?,
        updated_at: parse_timestamp("updated_at", &row.updated_at)?,
        version: row.version as u64,
    })
}

/// Fixed-width UTC form so `ORDER BY created_at` sorts chronologically.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidTimestamp {
            column: column.into(),
            value: value.into(),
        })
}

/// Unique-index hits surface as `ConstraintViolation`; everything else stays SQLite.
fn constraint_error(err: rusqlite::Error) -> DatabaseError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
            DatabaseError::ConstraintViolation(
                msg.clone().unwrap_or_else(|| "unique constraint".into()),
            )
        }
        _ => DatabaseError::Sqlite(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_result_and_timestamps() {
        let store = SqliteAppointmentStore::open_in_memory().unwrap();
        let mut appt = Appointment::new("org-1".into(), "user-1".into());
        appt.status = AppointmentStatus::ReRunRequired;
        appt.result = Some(TestResult::Inconclusive);
        appt.bar_code = Some("HP12345678".into());
        store.insert(&appt).unwrap();

        let loaded = store.get(&appt.id).unwrap();
        assert_eq!(loaded.result, Some(TestResult::Inconclusive));
        assert_eq!(loaded.bar_code.as_deref(), Some("HP12345678"));
        assert_eq!(loaded.created_at.timestamp(), appt.created_at.timestamp());
    }

    #[test]
    fn duplicate_id_is_constraint_violation() {
        let store = SqliteAppointmentStore::open_in_memory().unwrap();
        let appt = Appointment::new("org-1".into(), "user-1".into());
        store.insert(&appt).unwrap();
        assert!(matches!(
            store.insert(&appt),
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn save_of_unknown_id_is_not_found() {
        let store = SqliteAppointmentStore::open_in_memory().unwrap();
        let appt = Appointment::new("org-1".into(), "user-1".into());
        assert!(matches!(
            store.save(&appt),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn corrupt_status_surfaces_invalid_enum() {
        let store = SqliteAppointmentStore::open_in_memory().unwrap();
        let appt = Appointment::new("org-1".into(), "user-1".into());
        store.insert(&appt).unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "UPDATE appointments SET status = 'Lost' WHERE id = ?1",
                params![appt.id],
            )
            .unwrap();
        assert!(matches!(
            store.get(&appt.id),
            Err(DatabaseError::InvalidEnum { .. })
        ));
    }

    #[test]
    fn file_store_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("appointments.db");
        let appt = Appointment::new("org-1".into(), "user-1".into());
        {
            let store = SqliteAppointmentStore::open(&path).unwrap();
            store.insert(&appt).unwrap();
        }
        let reopened = SqliteAppointmentStore::open(&path).unwrap();
        assert_eq!(reopened.get(&appt.id).unwrap().organization_id, "org-1");
    }
}

use std::sync::Arc;

use tracing::info;

use biblio_core::{ServiceError, new_id, now_rfc3339};
use biblio_sql::{Row, SQLStore, Value};

use crate::model::{Appointment, AppointmentListQuery, AppointmentStatus};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS appointments (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL,
    date        TEXT NOT NULL,
    time_slot   TEXT NOT NULL,
    purpose     TEXT NOT NULL,
    notes       TEXT,
    status      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_appointments_email ON appointments(email);
CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments(status)
";

/// Persistent storage for appointments, backed by SQLStore (SQLite).
pub struct ScheduleStore {
    db: Arc<dyn SQLStore>,
}

impl ScheduleStore {
    /// Create a new ScheduleStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        for stmt in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            db.exec(stmt, &[])
                .map_err(|e| ServiceError::Storage(format!("schedule schema init: {e}")))?;
        }
        Ok(Self { db })
    }

    /// Book a slot. New appointments start PENDING.
    pub fn create(
        &self,
        name: &str,
        email: &str,
        date: &str,
        time_slot: &str,
        purpose: &str,
        notes: Option<&str>,
    ) -> Result<Appointment, ServiceError> {
        if name.trim().is_empty()
            || email.trim().is_empty()
            || date.trim().is_empty()
            || time_slot.trim().is_empty()
            || purpose.trim().is_empty()
        {
            return Err(ServiceError::Validation(
                "name, email, date, timeSlot and purpose are required".into(),
            ));
        }

        let appointment = Appointment {
            id: new_id(),
            name: name.to_string(),
            email: email.to_string(),
            date: date.to_string(),
            time_slot: time_slot.to_string(),
            purpose: purpose.to_string(),
            notes: notes.map(String::from),
            status: AppointmentStatus::Pending,
            created_at: now_rfc3339(),
        };
        self.db
            .exec(
                "INSERT INTO appointments \
                 (id, name, email, date, time_slot, purpose, notes, status, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                &[
                    Value::Text(appointment.id.clone()),
                    Value::Text(appointment.name.clone()),
                    Value::Text(appointment.email.clone()),
                    Value::Text(appointment.date.clone()),
                    Value::Text(appointment.time_slot.clone()),
                    Value::Text(appointment.purpose.clone()),
                    match &appointment.notes {
                        Some(n) => Value::Text(n.clone()),
                        None => Value::Null,
                    },
                    Value::Text(appointment.status.as_str().to_string()),
                    Value::Text(appointment.created_at.clone()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        info!(appointment_id = %appointment.id, date, time_slot, "appointment booked");
        Ok(appointment)
    }

    /// Get an appointment by ID.
    pub fn get(&self, id: &str) -> Result<Appointment, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT id, name, email, date, time_slot, purpose, notes, status, created_at \
                 FROM appointments WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("appointment {id}")))?;
        row_to_appointment(row)
    }

    /// List appointments, upcoming first.
    pub fn list(&self, query: &AppointmentListQuery) -> Result<Vec<Appointment>, ServiceError> {
        let mut where_clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(ref email) = query.email {
            where_clauses.push(format!("email = ?{}", params.len() + 1));
            params.push(Value::Text(email.clone()));
        }
        if query.open.unwrap_or(false) {
            where_clauses.push("status IN ('PENDING', 'CONFIRMED')".to_string());
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT id, name, email, date, time_slot, purpose, notes, status, created_at \
             FROM appointments {where_sql} ORDER BY date ASC, time_slot ASC"
        );

        let rows = self
            .db
            .query(&sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        rows.iter().map(row_to_appointment).collect()
    }

    /// Set an appointment's status (librarian action).
    pub fn set_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, ServiceError> {
        let affected = self
            .db
            .exec(
                "UPDATE appointments SET status = ?1 WHERE id = ?2",
                &[
                    Value::Text(status.as_str().to_string()),
                    Value::Text(id.to_string()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("appointment {id}")));
        }
        self.get(id)
    }

    /// Cancel an open appointment (CAS on PENDING/CONFIRMED).
    ///
    /// An appointment that is already cancelled conflicts rather than
    /// cancelling twice.
    pub fn cancel(&self, id: &str) -> Result<Appointment, ServiceError> {
        let affected = self
            .db
            .exec(
                "UPDATE appointments SET status = 'CANCELLED' \
                 WHERE id = ?1 AND status IN ('PENDING', 'CONFIRMED')",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        if affected == 0 {
            // Unknown id is a 404 from the lookup; otherwise it was already
            // cancelled.
            let current = self.get(id)?;
            return Err(ServiceError::Conflict(format!(
                "appointment {id} is already {}",
                current.status
            )));
        }
        info!(appointment_id = id, "appointment cancelled");
        self.get(id)
    }
}

fn row_to_appointment(row: &Row) -> Result<Appointment, ServiceError> {
    let get = |name: &str| -> Result<String, ServiceError> {
        row.get_str(name)
            .map(String::from)
            .ok_or_else(|| ServiceError::Storage(format!("missing {name} column")))
    };
    let status_str = get("status")?;
    let status = AppointmentStatus::from_str(&status_str)
        .ok_or_else(|| ServiceError::Internal(format!("unknown appointment status: {status_str}")))?;

    Ok(Appointment {
        id: get("id")?,
        name: get("name")?,
        email: get("email")?,
        date: get("date")?,
        time_slot: get("time_slot")?,
        purpose: get("purpose")?,
        notes: row.get_str("notes").map(String::from),
        status,
        created_at: get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_sql::SqliteStore;

    fn test_store() -> ScheduleStore {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        ScheduleStore::new(db).unwrap()
    }

    fn book(store: &ScheduleStore, email: &str) -> Appointment {
        store
            .create("Maria Cruz", email, "2026-08-12", "10:00-12:00", "Group study", None)
            .unwrap()
    }

    #[test]
    fn create_starts_pending() {
        let store = test_store();
        let a = book(&store, "maria@school.edu");
        assert_eq!(a.status, AppointmentStatus::Pending);
        assert_eq!(store.get(&a.id).unwrap(), a);
    }

    #[test]
    fn missing_fields_rejected() {
        let store = test_store();
        let result = store.create("Maria", "", "2026-08-12", "10:00", "Study", None);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn list_filters_by_email_and_open() {
        let store = test_store();
        let a = book(&store, "maria@school.edu");
        book(&store, "ben@school.edu");
        store.cancel(&a.id).unwrap();

        let marias = store
            .list(&AppointmentListQuery {
                email: Some("maria@school.edu".into()),
                open: None,
            })
            .unwrap();
        assert_eq!(marias.len(), 1);

        let open = store
            .list(&AppointmentListQuery {
                email: None,
                open: Some(true),
            })
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].email, "ben@school.edu");
    }

    #[test]
    fn confirm_then_cancel() {
        let store = test_store();
        let a = book(&store, "maria@school.edu");

        let confirmed = store.set_status(&a.id, AppointmentStatus::Confirmed).unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

        let cancelled = store.cancel(&a.id).unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        // A second cancel conflicts instead of silently succeeding.
        let again = store.cancel(&a.id);
        assert!(matches!(again, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn cancel_unknown_not_found() {
        let store = test_store();
        assert!(matches!(store.cancel("ghost"), Err(ServiceError::NotFound(_))));
    }
}

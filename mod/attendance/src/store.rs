use std::sync::Arc;

use biblio_core::{ServiceError, new_id};
use biblio_sql::{Row, SQLStore, Value};

use crate::model::{AttendanceEntry, OpenEntryView};

/// SQL schema for attendance entries.
///
/// The partial unique index is the database-level backstop for the
/// one-open-entry-per-student invariant.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS attendance_entries (
    id          TEXT PRIMARY KEY,
    student_id  TEXT NOT NULL,
    entered_at  TEXT NOT NULL,
    exited_at   TEXT
);
CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance_entries(student_id);
CREATE UNIQUE INDEX IF NOT EXISTS ux_attendance_open
    ON attendance_entries(student_id) WHERE exited_at IS NULL
";

/// Persistent storage for attendance entries, backed by SQLStore (SQLite).
pub struct AttendanceStore {
    db: Arc<dyn SQLStore>,
}

impl AttendanceStore {
    /// Create a new AttendanceStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        for stmt in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            db.exec(stmt, &[])
                .map_err(|e| ServiceError::Storage(format!("attendance schema init: {e}")))?;
        }
        Ok(Self { db })
    }

    /// The student's open entry, if they are currently inside.
    pub fn open_entry(&self, student_id: &str) -> Result<Option<AttendanceEntry>, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT id, student_id, entered_at, exited_at FROM attendance_entries \
                 WHERE student_id = ?1 AND exited_at IS NULL",
                &[Value::Text(student_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        rows.first().map(row_to_entry).transpose()
    }

    /// Current occupancy: entries with no recorded exit.
    pub fn occupancy(&self) -> Result<i64, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT COUNT(*) as cnt FROM attendance_entries WHERE exited_at IS NULL",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0))
    }

    /// Record a check-in.
    pub fn insert_entry(
        &self,
        student_id: &str,
        entered_at: &str,
    ) -> Result<AttendanceEntry, ServiceError> {
        let entry = AttendanceEntry {
            id: new_id(),
            student_id: student_id.to_string(),
            entered_at: entered_at.to_string(),
            exited_at: None,
        };
        self.db
            .exec(
                "INSERT INTO attendance_entries (id, student_id, entered_at, exited_at) \
                 VALUES (?1, ?2, ?3, NULL)",
                &[
                    Value::Text(entry.id.clone()),
                    Value::Text(entry.student_id.clone()),
                    Value::Text(entry.entered_at.clone()),
                ],
            )
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE constraint") {
                    ServiceError::Conflict(format!(
                        "student {student_id} already has an open attendance entry"
                    ))
                } else {
                    ServiceError::Storage(msg)
                }
            })?;
        Ok(entry)
    }

    /// Close an open entry (CAS on `exited_at IS NULL`).
    ///
    /// Returns `false` if the entry was already closed.
    pub fn close_entry(&self, id: &str, exited_at: &str) -> Result<bool, ServiceError> {
        let affected = self
            .db
            .exec(
                "UPDATE attendance_entries SET exited_at = ?1 \
                 WHERE id = ?2 AND exited_at IS NULL",
                &[
                    Value::Text(exited_at.to_string()),
                    Value::Text(id.to_string()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Everyone currently inside, oldest check-in first.
    pub fn list_open(&self) -> Result<Vec<OpenEntryView>, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT a.id, a.student_id, a.entered_at, a.exited_at, s.name as student_name \
                 FROM attendance_entries a \
                 JOIN students s ON a.student_id = s.id \
                 WHERE a.exited_at IS NULL ORDER BY a.entered_at ASC",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut items = Vec::new();
        for row in &rows {
            items.push(OpenEntryView {
                entry: row_to_entry(row)?,
                student_name: row
                    .get_str("student_name")
                    .map(String::from)
                    .ok_or_else(|| ServiceError::Storage("missing student_name column".into()))?,
            });
        }
        Ok(items)
    }
}

/// Deserialize an AttendanceEntry from a row's columns.
fn row_to_entry(row: &Row) -> Result<AttendanceEntry, ServiceError> {
    Ok(AttendanceEntry {
        id: row
            .get_str("id")
            .map(String::from)
            .ok_or_else(|| ServiceError::Storage("missing id column".into()))?,
        student_id: row
            .get_str("student_id")
            .map(String::from)
            .ok_or_else(|| ServiceError::Storage("missing student_id column".into()))?,
        entered_at: row
            .get_str("entered_at")
            .map(String::from)
            .ok_or_else(|| ServiceError::Storage("missing entered_at column".into()))?,
        exited_at: row.get_str("exited_at").map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_core::now_rfc3339;
    use biblio_sql::SqliteStore;

    fn test_store() -> AttendanceStore {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        AttendanceStore::new(db).unwrap()
    }

    #[test]
    fn insert_open_and_close() {
        let store = test_store();
        assert_eq!(store.occupancy().unwrap(), 0);

        let entry = store.insert_entry("s1", &now_rfc3339()).unwrap();
        assert_eq!(store.occupancy().unwrap(), 1);
        assert_eq!(
            store.open_entry("s1").unwrap().map(|e| e.id),
            Some(entry.id.clone())
        );

        assert!(store.close_entry(&entry.id, &now_rfc3339()).unwrap());
        assert_eq!(store.occupancy().unwrap(), 0);
        assert!(store.open_entry("s1").unwrap().is_none());

        // Closing again is a no-op.
        assert!(!store.close_entry(&entry.id, &now_rfc3339()).unwrap());
    }

    #[test]
    fn unique_index_blocks_second_open_entry() {
        let store = test_store();
        store.insert_entry("s1", &now_rfc3339()).unwrap();

        let result = store.insert_entry("s1", &now_rfc3339());
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
        assert_eq!(store.occupancy().unwrap(), 1);
    }

    #[test]
    fn reentry_after_checkout_is_allowed() {
        let store = test_store();
        let first = store.insert_entry("s1", &now_rfc3339()).unwrap();
        store.close_entry(&first.id, &now_rfc3339()).unwrap();

        let second = store.insert_entry("s1", &now_rfc3339()).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.occupancy().unwrap(), 1);
    }
}

use std::sync::Arc;

use tracing::info;

use biblio_core::{ListResult, ServiceError, now_rfc3339};
use biblio_sql::{Row, SQLStore, Value};

use crate::model::Student;

/// SQL schema for the students table.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS students (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    email        TEXT NOT NULL UNIQUE,
    grade_level  TEXT,
    created_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_students_email ON students(email);
";

/// Persistent storage for the student directory, backed by SQLStore (SQLite).
pub struct StudentStore {
    db: Arc<dyn SQLStore>,
}

impl StudentStore {
    /// Create a new StudentStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        for stmt in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            db.exec(stmt, &[])
                .map_err(|e| ServiceError::Storage(format!("directory schema init: {e}")))?;
        }
        Ok(Self { db })
    }

    /// Register a new student. Duplicate id or email is a conflict.
    pub fn register(
        &self,
        id: &str,
        name: &str,
        email: &str,
        grade_level: Option<&str>,
    ) -> Result<Student, ServiceError> {
        if id.trim().is_empty() || name.trim().is_empty() || email.trim().is_empty() {
            return Err(ServiceError::Validation(
                "id, name and email are required".into(),
            ));
        }

        let student = Student {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            grade_level: grade_level.map(String::from),
            created_at: now_rfc3339(),
        };

        self.db
            .exec(
                "INSERT INTO students (id, name, email, grade_level, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                &[
                    Value::Text(student.id.clone()),
                    Value::Text(student.name.clone()),
                    Value::Text(student.email.clone()),
                    match &student.grade_level {
                        Some(g) => Value::Text(g.clone()),
                        None => Value::Null,
                    },
                    Value::Text(student.created_at.clone()),
                ],
            )
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE constraint") {
                    ServiceError::Conflict("student id or email already exists".into())
                } else {
                    ServiceError::Storage(msg)
                }
            })?;

        info!(student_id = %student.id, "student registered");
        Ok(student)
    }

    /// Get a student by ID.
    pub fn get(&self, id: &str) -> Result<Student, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT id, name, email, grade_level, created_at FROM students WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("student {id}")))?;
        row_to_student(row)
    }

    /// List all students, ordered by id.
    pub fn list(&self, limit: usize, offset: usize) -> Result<ListResult<Student>, ServiceError> {
        let count_rows = self
            .db
            .query("SELECT COUNT(*) as cnt FROM students", &[])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let rows = self
            .db
            .query(
                "SELECT id, name, email, grade_level, created_at FROM students \
                 ORDER BY id ASC LIMIT ?1 OFFSET ?2",
                &[Value::Integer(limit as i64), Value::Integer(offset as i64)],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let items = rows
            .iter()
            .map(row_to_student)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListResult { items, total })
    }

    /// Delete a student by ID.
    pub fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let affected = self
            .db
            .exec(
                "DELETE FROM students WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("student {id}")));
        }
        info!(student_id = id, "student removed");
        Ok(())
    }

    /// Resolve a scanned badge id to the student record.
    ///
    /// Same lookup as [`get`](Self::get), but the not-found message matches
    /// what a scanning station should display.
    pub fn verify(&self, id: &str) -> Result<Student, ServiceError> {
        self.get(id)
            .map_err(|_| ServiceError::NotFound("invalid badge: no matching student".into()))
    }
}

/// Deserialize a Student from a row's columns.
fn row_to_student(row: &Row) -> Result<Student, ServiceError> {
    Ok(Student {
        id: get_text(row, "id")?,
        name: get_text(row, "name")?,
        email: get_text(row, "email")?,
        grade_level: row.get_str("grade_level").map(String::from),
        created_at: get_text(row, "created_at")?,
    })
}

fn get_text(row: &Row, name: &str) -> Result<String, ServiceError> {
    row.get_str(name)
        .map(String::from)
        .ok_or_else(|| ServiceError::Storage(format!("missing {name} column")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_sql::SqliteStore;

    fn test_store() -> StudentStore {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        StudentStore::new(db).unwrap()
    }

    #[test]
    fn register_and_get() {
        let store = test_store();
        store
            .register("2021-00123", "Maria Cruz", "maria@school.edu", Some("3rd Year"))
            .unwrap();

        let got = store.get("2021-00123").unwrap();
        assert_eq!(got.name, "Maria Cruz");
        assert_eq!(got.grade_level.as_deref(), Some("3rd Year"));
    }

    #[test]
    fn duplicate_id_or_email_conflicts() {
        let store = test_store();
        store
            .register("s1", "Ana", "ana@school.edu", None)
            .unwrap();

        let same_id = store.register("s1", "Other", "other@school.edu", None);
        assert!(matches!(same_id, Err(ServiceError::Conflict(_))));

        let same_email = store.register("s2", "Other", "ana@school.edu", None);
        assert!(matches!(same_email, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn verify_maps_missing_to_badge_message() {
        let store = test_store();
        let err = store.verify("ghost").unwrap_err();
        assert!(err.to_string().contains("invalid badge"));
    }

    #[test]
    fn list_and_delete() {
        let store = test_store();
        store.register("s1", "Ana", "ana@school.edu", None).unwrap();
        store.register("s2", "Ben", "ben@school.edu", None).unwrap();

        let all = store.list(50, 0).unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].id, "s1");

        store.delete("s1").unwrap();
        assert!(store.get("s1").is_err());
        assert!(matches!(store.delete("s1"), Err(ServiceError::NotFound(_))));
    }
}

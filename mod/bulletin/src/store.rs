use std::sync::Arc;

use tracing::info;

use biblio_core::{ServiceError, new_id, now_rfc3339};
use biblio_sql::{Row, SQLStore, Value};

use crate::model::Announcement;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS announcements (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    message     TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
)
";

/// Persistent storage for announcements, backed by SQLStore (SQLite).
pub struct BulletinStore {
    db: Arc<dyn SQLStore>,
}

impl BulletinStore {
    /// Create a new BulletinStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        db.exec(SCHEMA, &[])
            .map_err(|e| ServiceError::Storage(format!("bulletin schema init: {e}")))?;
        Ok(Self { db })
    }

    /// Post a new announcement.
    pub fn create(&self, title: &str, message: &str) -> Result<Announcement, ServiceError> {
        if title.trim().is_empty() || message.trim().is_empty() {
            return Err(ServiceError::Validation(
                "title and message are required".into(),
            ));
        }

        let now = now_rfc3339();
        let announcement = Announcement {
            id: new_id(),
            title: title.to_string(),
            message: message.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.db
            .exec(
                "INSERT INTO announcements (id, title, message, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                &[
                    Value::Text(announcement.id.clone()),
                    Value::Text(announcement.title.clone()),
                    Value::Text(announcement.message.clone()),
                    Value::Text(announcement.created_at.clone()),
                    Value::Text(announcement.updated_at.clone()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        info!(announcement_id = %announcement.id, title, "announcement posted");
        Ok(announcement)
    }

    /// All announcements, newest first.
    pub fn list(&self) -> Result<Vec<Announcement>, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT id, title, message, created_at, updated_at FROM announcements \
                 ORDER BY created_at DESC",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        rows.iter().map(row_to_announcement).collect()
    }

    /// Rewrite an announcement's title and message.
    pub fn update(
        &self,
        id: &str,
        title: &str,
        message: &str,
    ) -> Result<Announcement, ServiceError> {
        if title.trim().is_empty() || message.trim().is_empty() {
            return Err(ServiceError::Validation(
                "title and message are required".into(),
            ));
        }

        let affected = self
            .db
            .exec(
                "UPDATE announcements SET title = ?1, message = ?2, updated_at = ?3 \
                 WHERE id = ?4",
                &[
                    Value::Text(title.to_string()),
                    Value::Text(message.to_string()),
                    Value::Text(now_rfc3339()),
                    Value::Text(id.to_string()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("announcement {id}")));
        }
        self.get(id)
    }

    /// Get an announcement by ID.
    pub fn get(&self, id: &str) -> Result<Announcement, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT id, title, message, created_at, updated_at FROM announcements \
                 WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("announcement {id}")))?;
        row_to_announcement(row)
    }

    /// Delete an announcement by ID.
    pub fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let affected = self
            .db
            .exec(
                "DELETE FROM announcements WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("announcement {id}")));
        }
        Ok(())
    }
}

fn row_to_announcement(row: &Row) -> Result<Announcement, ServiceError> {
    let get = |name: &str| -> Result<String, ServiceError> {
        row.get_str(name)
            .map(String::from)
            .ok_or_else(|| ServiceError::Storage(format!("missing {name} column")))
    };
    Ok(Announcement {
        id: get("id")?,
        title: get("title")?,
        message: get("message")?,
        created_at: get("created_at")?,
        updated_at: get("updated_at")?,
    })
}

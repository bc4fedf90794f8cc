use serde::{Deserialize, Serialize};

/// A staff announcement shown on the library's board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub message: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Body for `POST /announcements` and `PUT /announcements/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementBody {
    pub title: String,
    pub message: String,
}

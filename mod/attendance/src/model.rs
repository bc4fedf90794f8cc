use serde::{Deserialize, Serialize};

/// One visit: a check-in, and eventually a check-out.
///
/// A student has at most one entry with `exited_at = NULL` at any time —
/// that row is what "currently inside" means, and the open-entry count is
/// the room's occupancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub id: String,
    pub student_id: String,
    pub entered_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exited_at: Option<String>,
}

/// An open entry joined with the student's name (the "who is inside" view).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenEntryView {
    #[serde(flatten)]
    pub entry: AttendanceEntry,
    pub student_name: String,
}

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToggleAction {
    CheckedIn,
    CheckedOut,
}

/// Body for `POST /@toggle`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleBody {
    pub student_id: String,
    /// Overrides the configured capacity for this call when present.
    #[serde(default)]
    pub max_capacity: Option<u32>,
}

/// Result of a toggle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub action: ToggleAction,
    pub student_id: String,
    pub student_name: String,
    /// Occupancy after this toggle took effect.
    pub occupancy: i64,
}

/// Response for `GET /occupancy`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyReport {
    pub count: i64,
    pub max_capacity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_action_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&ToggleAction::CheckedIn).unwrap(),
            "\"CHECKED_IN\""
        );
        assert_eq!(
            serde_json::to_string(&ToggleAction::CheckedOut).unwrap(),
            "\"CHECKED_OUT\""
        );
    }

    #[test]
    fn entry_json_omits_null_exit() {
        let entry = AttendanceEntry {
            id: "e1".into(),
            student_id: "s1".into(),
            entered_at: "2026-08-04T09:00:00+00:00".into(),
            exited_at: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("exitedAt"));
    }

    #[test]
    fn toggle_body_capacity_optional() {
        let body: ToggleBody = serde_json::from_str(r#"{"studentId":"s1"}"#).unwrap();
        assert!(body.max_capacity.is_none());

        let body: ToggleBody =
            serde_json::from_str(r#"{"studentId":"s1","maxCapacity":25}"#).unwrap();
        assert_eq!(body.max_capacity, Some(25));
    }
}

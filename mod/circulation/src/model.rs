use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RequestStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a borrow request.
///
/// ```text
/// PENDING → ACCEPTED
///         → REJECTED
/// ```
///
/// Terminal once resolved — requests are append-only history and are never
/// re-opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "ACCEPTED" => Some(Self::Accepted),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Whether the request has been resolved.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LoanStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a loan record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Active,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Returned => "RETURNED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(Self::Active),
            "RETURNED" => Some(Self::Returned),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A librarian's decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accept,
    Reject,
}

// ---------------------------------------------------------------------------
// BorrowRequest / BorrowRecord — map 1:1 to SQL columns
// ---------------------------------------------------------------------------

/// A borrower's intent to pick up a specific copy, pending approval.
///
/// Submitting a request does NOT reserve the copy: availability is
/// re-checked at acceptance time, last writer wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub id: String,
    pub student_id: String,
    pub copy_id: String,
    /// Desired pickup day, as given by the borrower (e.g. "2026-08-10").
    pub pickup_date: String,
    /// Desired pickup time slot (e.g. "14:00").
    pub pickup_time: String,
    pub status: RequestStatus,
    pub requested_at: String,
}

/// The authoritative record of an active or completed borrowing period.
///
/// At most one ACTIVE record exists per copy at any time; the store backs
/// this with a partial unique index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRecord {
    pub id: String,
    pub student_id: String,
    pub copy_id: String,
    pub borrow_date: String,
    pub due_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    pub status: LoanStatus,
}

/// A loan joined with its book's metadata, as listed to students and staff.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanView {
    #[serde(flatten)]
    pub record: BorrowRecord,
    pub book_id: String,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

// ---------------------------------------------------------------------------
// API request / query types
// ---------------------------------------------------------------------------

/// Body for `POST /requests`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestBody {
    pub copy_id: String,
    pub student_id: String,
    pub pickup_date: String,
    pub pickup_time: String,
}

/// Body for `POST /requests/{id}/@resolve`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveBody {
    pub decision: Decision,
}

/// Body for `POST /returns`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnBody {
    pub copy_id: String,
}

/// Body for `POST /loans` — librarian-initiated loan, no request involved.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectBorrowBody {
    pub copy_id: String,
    pub student_id: String,
}

/// Query parameters for `GET /requests`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestListQuery {
    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default)]
    pub offset: Option<usize>,

    #[serde(default)]
    pub status: Option<String>,
}

/// Query parameters for `GET /loans`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanListQuery {
    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default)]
    pub offset: Option<usize>,

    #[serde(default)]
    pub student_id: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    /// When true, only ACTIVE loans past their due date.
    #[serde(default)]
    pub overdue: Option<bool>,
}

/// Query parameters for `GET /stats`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    #[serde(default)]
    pub student_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of resolving a borrow request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutcome {
    pub request_id: String,
    pub status: RequestStatus,
    pub book_title: String,
    /// Present only on acceptance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrow_record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub message: String,
}

/// Result of returning a copy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnOutcome {
    pub book_title: String,
    /// Absent on the idempotent already-available path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrow_record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub message: String,
}

/// Per-student circulation summary (dashboard).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: String,
    pub active_loans: i64,
    pub overdue_loans: i64,
    pub pending_requests: i64,
}

/// Library-wide circulation statistics (dashboard).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub total_books: i64,
    pub total_copies: i64,
    pub borrowed_copies: i64,
    pub active_loans: i64,
    pub overdue_loans: i64,
    pub pending_requests: i64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_status_roundtrip() {
        for s in [
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::Rejected,
        ] {
            let json = serde_json::to_string(&s).unwrap();
            let back: RequestStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(s, back);
            assert_eq!(RequestStatus::from_str(s.as_str()), Some(s));
        }
    }

    #[test]
    fn request_status_terminal() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Accepted.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
    }

    #[test]
    fn decision_deserialize() {
        let d: Decision = serde_json::from_str("\"ACCEPT\"").unwrap();
        assert_eq!(d, Decision::Accept);
        let d: Decision = serde_json::from_str("\"REJECT\"").unwrap();
        assert_eq!(d, Decision::Reject);
        assert!(serde_json::from_str::<Decision>("\"MAYBE\"").is_err());
    }

    #[test]
    fn record_json_omits_null_return_date() {
        let record = BorrowRecord {
            id: "r1".into(),
            student_id: "s1".into(),
            copy_id: "c1".into(),
            borrow_date: "2026-08-01T10:00:00+00:00".into(),
            due_date: "2026-08-15T10:00:00+00:00".into(),
            return_date: None,
            status: LoanStatus::Active,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("returnDate"));

        let back: BorrowRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn loan_view_flattens_record() {
        let view = LoanView {
            record: BorrowRecord {
                id: "r1".into(),
                student_id: "s1".into(),
                copy_id: "c1".into(),
                borrow_date: "2026-08-01T10:00:00+00:00".into(),
                due_date: "2026-08-15T10:00:00+00:00".into(),
                return_date: None,
                status: LoanStatus::Active,
            },
            book_id: "b1".into(),
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            isbn: "isbn-1".into(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "r1");
        assert_eq!(json["title"], "Dune");
    }
}

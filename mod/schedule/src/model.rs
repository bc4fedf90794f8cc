use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AppointmentStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a room-booking appointment.
///
/// ```text
/// PENDING → CONFIRMED
///         → CANCELLED   (also reachable from CONFIRMED)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "CONFIRMED" => Some(Self::Confirmed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether the appointment still occupies a slot.
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Appointment
// ---------------------------------------------------------------------------

/// A study-room / facility booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Booked day, as given (e.g. "2026-08-12").
    pub date: String,
    /// Booked slot, as given (e.g. "10:00-12:00").
    pub time_slot: String,
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: String,
}

/// Body for `POST /appointments`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentBody {
    pub name: String,
    pub email: String,
    pub date: String,
    pub time_slot: String,
    pub purpose: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body for `POST /appointments/{id}/@status`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusBody {
    pub status: AppointmentStatus,
}

/// Query parameters for `GET /appointments`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    #[serde(default)]
    pub email: Option<String>,

    /// When true, only PENDING and CONFIRMED appointments.
    #[serde(default)]
    pub open: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for s in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
        ] {
            let json = serde_json::to_string(&s).unwrap();
            let back: AppointmentStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(s, back);
            assert_eq!(AppointmentStatus::from_str(s.as_str()), Some(s));
        }
    }

    #[test]
    fn open_means_not_cancelled() {
        assert!(AppointmentStatus::Pending.is_open());
        assert!(AppointmentStatus::Confirmed.is_open());
        assert!(!AppointmentStatus::Cancelled.is_open());
    }
}

// libs/booking-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

/// Appointments and consultations share one flow; the kind only selects the
/// table. The two historical paths diverged in time-normalization order,
/// which is exactly the bug class this unification removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingKind {
    #[serde(rename = "appointments", alias = "appointment")]
    Appointment,
    #[serde(rename = "consultations", alias = "consultation")]
    Consultation,
}

impl BookingKind {
    pub fn table(&self) -> &'static str {
        match self {
            BookingKind::Appointment => "appointments",
            BookingKind::Consultation => "consultations",
        }
    }

    pub fn singular(&self) -> &'static str {
        match self {
            BookingKind::Appointment => "appointment",
            BookingKind::Consultation => "consultation",
        }
    }
}

impl fmt::Display for BookingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.singular())
    }
}

/// Stored row casing varied across the original write paths; aliases accept
/// the lowercase variants while everything new serializes capitalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "approved")]
    Approved,
    #[serde(alias = "declined")]
    Declined,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "Pending"),
            BookingStatus::Approved => write!(f, "Approved"),
            BookingStatus::Declined => write!(f, "Declined"),
        }
    }
}

/// A persisted appointment/consultation row. Times are canonical
/// `HH:MM:SS`; date/time/parties never change after creation. The
/// pediatrician is stamped only on approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time_start: NaiveTime,
    pub time_end: NaiveTime,
    pub guardian_id: String,
    pub patient_id: String,
    pub description: String,
    pub email: String,
    pub status: BookingStatus,
    #[serde(default)]
    pub pediatrician_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Transient booking input. `time_start`/`time_end` arrive in the 12-hour
/// display form guardians see; `email` is the pediatrician contact the
/// availability row is keyed by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub date: NaiveDate,
    pub time_start: String,
    pub time_end: String,
    pub guardian_id: String,
    pub patient_id: String,
    pub description: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub booking_id: Uuid,
    pub status: BookingStatus,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid time format: {0}")]
    ParseError(String),

    #[error("No availability found for the selected date")]
    NoAvailability,

    #[error("Requested time slot is not available")]
    SlotUnavailable,

    #[error("Booking not found")]
    NotFound,

    #[error("Status cannot change from {0}")]
    InvalidStatusTransition(BookingStatus),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

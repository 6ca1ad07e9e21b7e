// libs/availability-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::timeslot;

// ==============================================================================
// TIME SLOT
// ==============================================================================

/// A half-open interval of a single day. Canonical storage form is the
/// 24-hour label `"HH:MM:SS - HH:MM:SS"`; the display form renders each
/// bound as `H:MM AM/PM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    /// Invariant: `start < end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, AvailabilityError> {
        if start >= end {
            return Err(AvailabilityError::InvalidSlot(format!(
                "slot start {} is not before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Canonical label, e.g. `"09:00:00 - 09:30:00"`.
    pub fn label(&self) -> String {
        timeslot::format_label(self.start, self.end)
    }

    /// Display label, e.g. `"9:00 AM - 9:30 AM"`.
    pub fn display_label(&self) -> String {
        format!(
            "{} - {}",
            timeslot::to_12_hour(self.start),
            timeslot::to_12_hour(self.end)
        )
    }

    /// Parses a label whose sides may be in either the canonical 24-hour or
    /// the legacy 12-hour form. Both paths wrote labels historically, so
    /// every read normalizes here before comparing anything.
    pub fn from_label(label: &str) -> Result<Self, AvailabilityError> {
        let parts: Vec<&str> = label.split(" - ").collect();
        if parts.len() != 2 {
            return Err(AvailabilityError::ParseError(format!(
                "malformed slot label: {}",
                label
            )));
        }
        let start = timeslot::parse_time(parts[0].trim())?;
        let end = timeslot::parse_time(parts[1].trim())?;
        Self::new(start, end)
    }
}

// ==============================================================================
// AVAILABILITY ROW
// ==============================================================================

/// One pediatrician's published slots for one date, keyed by
/// (contact email, date). `version` is the optimistic-concurrency counter
/// bumped by every write; booking and republishing both compare-and-swap
/// against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityDay {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub date: NaiveDate,
    #[serde(rename = "time_slots")]
    pub open_slots: Vec<String>,
    #[serde(default)]
    pub booked_slots: Option<Vec<String>>,
    pub status: String,
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AvailabilityDay {
    /// Open slots normalized to canonical labels. Unparseable labels are an
    /// error rather than a silent skip: a label we cannot read is a row we
    /// cannot safely book against.
    pub fn normalized_open(&self) -> Result<Vec<String>, AvailabilityError> {
        self.open_slots
            .iter()
            .map(|label| timeslot::normalize_label(label))
            .collect()
    }

    pub fn normalized_booked(&self) -> Result<Vec<String>, AvailabilityError> {
        self.booked_slots
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(|label| timeslot::normalize_label(label))
            .collect()
    }

    /// Membership test on the normalized open set.
    pub fn contains(&self, canonical_label: &str) -> Result<bool, AvailabilityError> {
        Ok(self
            .normalized_open()?
            .iter()
            .any(|slot| slot == canonical_label))
    }

    /// Pure open→booked move. Returns the updated (open, booked) label sets;
    /// persistence is the caller's job. Fails with `SlotUnavailable` when the
    /// slot is not open.
    pub fn book(
        &self,
        canonical_label: &str,
    ) -> Result<(Vec<String>, Vec<String>), AvailabilityError> {
        if !self.contains(canonical_label)? {
            return Err(AvailabilityError::SlotUnavailable);
        }

        let open = self.normalized_open()?;
        let updated_open: Vec<String> = open
            .into_iter()
            .filter(|slot| slot != canonical_label)
            .collect();

        let mut updated_booked = self.normalized_booked()?;
        updated_booked.push(canonical_label.to_string());

        Ok((updated_open, updated_booked))
    }

    /// Pure booked→open move, used when a booking is declined or deleted.
    /// Returns `None` when the slot is not currently booked (nothing to do).
    pub fn release(
        &self,
        canonical_label: &str,
    ) -> Result<Option<(Vec<String>, Vec<String>)>, AvailabilityError> {
        let booked = self.normalized_booked()?;
        if !booked.iter().any(|slot| slot == canonical_label) {
            return Ok(None);
        }

        let updated_booked: Vec<String> = booked
            .into_iter()
            .filter(|slot| slot != canonical_label)
            .collect();

        let mut updated_open = self.normalized_open()?;
        if !updated_open.iter().any(|slot| slot == canonical_label) {
            updated_open.push(canonical_label.to_string());
        }

        Ok(Some((updated_open, updated_booked)))
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishAvailabilityRequest {
    pub name: String,
    pub email: String,
    pub date: NaiveDate,
    pub time_slots: Vec<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AvailabilityError {
    #[error("No availability found for the selected date")]
    NotFound,

    #[error("Requested time slot is not available")]
    SlotUnavailable,

    #[error("Invalid time format: {0}")]
    ParseError(String),

    #[error("Invalid time slot: {0}")]
    InvalidSlot(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

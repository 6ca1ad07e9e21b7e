// libs/booking-cell/src/services/booking.rs
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use chrono::Utc;
use shared_config::AppConfig;
use shared_database::supabase::{returning_representation, SupabaseClient};
use shared_models::auth::User;

use availability_cell::models::{AvailabilityError, TimeSlot};
use availability_cell::services::availability::AvailabilityService;
use availability_cell::services::timeslot;

use crate::models::{Booking, BookingError, BookingKind, BookingRequest, BookingStatus, SetStatusRequest};
use crate::services::lifecycle::BookingLifecycleService;
use crate::services::notify::NotificationService;

const MAX_BOOKING_ATTEMPTS: u32 = 3;

fn from_availability(e: AvailabilityError) -> BookingError {
    match e {
        AvailabilityError::NotFound => BookingError::NoAvailability,
        AvailabilityError::SlotUnavailable => BookingError::SlotUnavailable,
        AvailabilityError::ParseError(msg) | AvailabilityError::InvalidSlot(msg) => {
            BookingError::ParseError(msg)
        }
        AvailabilityError::ValidationError(msg) => BookingError::ValidationError(msg),
        AvailabilityError::DatabaseError(msg) => BookingError::DatabaseError(msg),
    }
}

pub struct BookingService {
    supabase: SupabaseClient,
    availability: AvailabilityService,
    lifecycle: BookingLifecycleService,
    notifier: NotificationService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = SupabaseClient::new(config);
        Self {
            availability: AvailabilityService::new(config),
            lifecycle: BookingLifecycleService::new(),
            notifier: NotificationService::new(supabase.clone()),
            supabase,
        }
    }

    /// The booking transaction: normalize the requested range, check it
    /// against the doctor's open set, move it open→booked with a
    /// compare-and-swap on the availability row's version, then insert the
    /// Pending booking row. A lost CAS reloads and retries; a slot missing
    /// from the reloaded open set is the race surfacing as `SlotUnavailable`.
    pub async fn request_booking(
        &self,
        kind: BookingKind,
        request: BookingRequest,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        info!(
            "Received {} request for {} with {}",
            kind, request.date, request.email
        );

        self.validate_request(&request)?;

        // Convert before any comparison; stored labels normalize on read.
        let start = timeslot::parse_time(&request.time_start).map_err(from_availability)?;
        let end = timeslot::parse_time(&request.time_end).map_err(from_availability)?;
        let slot = TimeSlot::new(start, end).map_err(from_availability)?;
        let label = slot.label();

        debug!("Requested slot in canonical form: {}", label);

        for attempt in 1..=MAX_BOOKING_ATTEMPTS {
            let day = self
                .availability
                .load_for_date(&request.email, request.date, auth_token)
                .await
                .map_err(from_availability)?;

            let (open, booked) = day.book(&label).map_err(from_availability)?;

            let committed = self
                .availability
                .commit_slots(
                    &request.email,
                    request.date,
                    day.version,
                    &open,
                    &booked,
                    None,
                    auth_token,
                )
                .await
                .map_err(from_availability)?;

            if committed.is_none() {
                // Version moved under us: someone booked or republished.
                // Reload; if the slot is gone the next iteration fails with
                // SlotUnavailable, otherwise we retry the swap.
                warn!(
                    "Availability version moved while booking {} on {} (attempt {})",
                    label, request.date, attempt
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(100 * attempt as u64))
                    .await;
                continue;
            }

            let booking = match self.insert_booking(kind, &request, slot, auth_token).await {
                Ok(booking) => booking,
                Err(e) => {
                    // The slot moved but the row insert failed; put the slot
                    // back before surfacing the store failure.
                    warn!(
                        "Booking insert failed after slot reservation, restoring {}: {}",
                        label, e
                    );
                    if let Err(restore_err) = self
                        .availability
                        .restore_slot(&request.email, request.date, &label, auth_token)
                        .await
                    {
                        warn!("Slot restore also failed for {}: {}", label, restore_err);
                    }
                    return Err(e);
                }
            };

            info!("{} {} created with status Pending", kind, booking.id);
            self.notifier.booking_created(kind, &booking, auth_token);
            return Ok(booking);
        }

        Err(BookingError::DatabaseError(
            "Failed to book slot after multiple attempts".to_string(),
        ))
    }

    /// Approve or decline a pending booking. Repeating the current status is
    /// an idempotent no-op; approval stamps the approving pediatrician;
    /// declining returns the slot to the open set.
    pub async fn set_status(
        &self,
        kind: BookingKind,
        request: SetStatusRequest,
        approver: &User,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let booking = self.get_booking(kind, request.booking_id, auth_token).await?;

        if booking.status == request.status {
            info!(
                "{} {} already has status {}, nothing to do",
                kind, booking.id, booking.status
            );
            return Ok(booking);
        }

        self.lifecycle
            .validate_status_transition(&booking.status, &request.status)?;

        let mut update = json!({
            "status": request.status,
            "updated_at": Utc::now().to_rfc3339(),
        });
        if request.status == BookingStatus::Approved {
            update["pediatrician_id"] = json!(approver.id);
        }

        // Conditional on the status that was read, so two racing approvals
        // cannot both pass the transition check and overwrite each other's
        // pediatrician stamp.
        let path = format!(
            "/rest/v1/{}?id=eq.{}&status=eq.{}",
            kind.table(),
            request.booking_id,
            booking.status
        );
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update),
                Some(returning_representation()),
            )
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let Some(row) = result.into_iter().next() else {
            // Someone else moved the status first. A matching outcome is the
            // idempotent case; anything else is a terminal row now.
            let current = self.get_booking(kind, request.booking_id, auth_token).await?;
            if current.status == request.status {
                info!(
                    "{} {} already reached {} concurrently, nothing to do",
                    kind, current.id, current.status
                );
                return Ok(current);
            }
            return Err(BookingError::InvalidStatusTransition(current.status));
        };
        let updated: Booking = serde_json::from_value(row)
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse {}: {}", kind, e)))?;

        info!("{} {} status updated to {}", kind, updated.id, updated.status);

        if request.status == BookingStatus::Declined {
            self.restore_booking_slot(&updated, auth_token).await;
        }

        self.notifier.status_changed(kind, &updated, auth_token);
        Ok(updated)
    }

    pub async fn get_booking(
        &self,
        kind: BookingKind,
        booking_id: Uuid,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        debug!("Fetching {} {}", kind, booking_id);

        let path = format!("/rest/v1/{}?id=eq.{}", kind.table(), booking_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(BookingError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse {}: {}", kind, e)))
    }

    /// Role-scoped listing: admins see everything, pediatricians see
    /// approved requests, guardians see their own.
    pub async fn list_bookings(
        &self,
        kind: BookingKind,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        let base = format!("/rest/v1/{}", kind.table());
        let path = if user.is_admin() {
            format!("{}?order=date.asc,time_start.asc", base)
        } else if user.is_pediatrician() {
            format!("{}?status=eq.Approved&order=date.asc,time_start.asc", base)
        } else {
            format!(
                "{}?guardian_id=eq.{}&order=date.asc,time_start.asc",
                base,
                urlencoding::encode(&user.id)
            )
        };

        self.fetch_bookings(kind, &path, auth_token).await
    }

    /// A guardian's bookings from today onward.
    pub async fn upcoming_for_guardian(
        &self,
        kind: BookingKind,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        let today = Utc::now().date_naive();
        let path = format!(
            "/rest/v1/{}?guardian_id=eq.{}&date=gte.{}&order=date.asc,time_start.asc",
            kind.table(),
            urlencoding::encode(&user.id),
            today
        );

        self.fetch_bookings(kind, &path, auth_token).await
    }

    /// Delete a booking and return its slot to the open set when the slot
    /// is still marked booked. Only the owning guardian or an admin may
    /// delete; existence is not confirmed to anyone else.
    pub async fn delete_booking(
        &self,
        kind: BookingKind,
        booking_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let booking = self.get_booking(kind, booking_id, auth_token).await?;

        if !user.is_admin() && !(user.is_guardian() && booking.guardian_id == user.id) {
            return Err(BookingError::NotFound);
        }

        let path = format!("/rest/v1/{}?id=eq.{}", kind.table(), booking_id);
        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                Some(auth_token),
                None,
                Some(returning_representation()),
            )
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        info!("{} {} deleted", kind, booking_id);
        self.restore_booking_slot(&booking, auth_token).await;

        Ok(booking)
    }

    // Private helpers

    fn validate_request(&self, request: &BookingRequest) -> Result<(), BookingError> {
        let missing = [
            &request.time_start,
            &request.time_end,
            &request.guardian_id,
            &request.patient_id,
            &request.description,
            &request.email,
        ]
        .iter()
        .any(|value| value.trim().is_empty());

        if missing {
            return Err(BookingError::ValidationError(
                "All fields are required".to_string(),
            ));
        }
        Ok(())
    }

    async fn insert_booking(
        &self,
        kind: BookingKind,
        request: &BookingRequest,
        slot: TimeSlot,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let row = json!({
            "id": Uuid::new_v4(),
            "date": request.date,
            "time_start": slot.start.format("%H:%M:%S").to_string(),
            "time_end": slot.end.format("%H:%M:%S").to_string(),
            "guardian_id": request.guardian_id,
            "patient_id": request.patient_id,
            "description": request.description,
            "email": request.email,
            "status": BookingStatus::Pending,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/{}", kind.table());
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                &path,
                Some(auth_token),
                Some(row),
                Some(returning_representation()),
            )
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or_else(|| {
            BookingError::DatabaseError(format!("Failed to create {}", kind))
        })?;

        serde_json::from_value(row)
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse {}: {}", kind, e)))
    }

    async fn restore_booking_slot(&self, booking: &Booking, auth_token: &str) {
        let label = timeslot::format_label(booking.time_start, booking.time_end);
        match self
            .availability
            .restore_slot(&booking.email, booking.date, &label, auth_token)
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(
                "Slot {} on {} was not booked, nothing to restore",
                label, booking.date
            ),
            // Slot left stranded in booked_slots; needs operator reconciliation.
            Err(e) => error!(
                "Failed to restore slot {} on {} for {} after booking {} left {}: {}",
                label, booking.date, booking.email, booking.id, booking.status, e
            ),
        }
    }

    async fn fetch_bookings(
        &self,
        kind: BookingKind,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Booking>, _>>()
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse {}: {}", kind, e)))
    }
}

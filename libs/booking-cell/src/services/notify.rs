// libs/booking-cell/src/services/notify.rs
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use chrono::Utc;
use shared_database::supabase::{returning_representation, SupabaseClient};

use crate::models::{Booking, BookingKind};

/// Fire-and-forget record of booking events for the messaging collaborator.
/// The booking flow never waits on or fails because of a notification.
pub struct NotificationService {
    supabase: SupabaseClient,
}

impl NotificationService {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    pub fn booking_created(&self, kind: BookingKind, booking: &Booking, auth_token: &str) {
        self.record_event(
            kind,
            booking,
            "created",
            format!("New {} request for {}", kind, booking.date),
            auth_token,
        );
    }

    pub fn status_changed(&self, kind: BookingKind, booking: &Booking, auth_token: &str) {
        self.record_event(
            kind,
            booking,
            "status_changed",
            format!("{} status updated to {}", kind, booking.status),
            auth_token,
        );
    }

    fn record_event(
        &self,
        kind: BookingKind,
        booking: &Booking,
        event: &str,
        message: String,
        auth_token: &str,
    ) {
        let row = json!({
            "kind": kind.singular(),
            "booking_id": booking.id,
            "guardian_id": booking.guardian_id,
            "email": booking.email,
            "event": event,
            "message": message,
            "created_at": Utc::now().to_rfc3339(),
        });

        let supabase = self.supabase.clone();
        let token = auth_token.to_string();
        let booking_id = booking.id;

        tokio::spawn(async move {
            debug!("Recording {} notification for booking {}", kind, booking_id);
            if let Err(e) = supabase
                .request_with_headers::<Vec<Value>>(
                    Method::POST,
                    "/rest/v1/notifications",
                    Some(&token),
                    Some(row),
                    Some(returning_representation()),
                )
                .await
            {
                warn!("Failed to record notification for booking {}: {}", booking_id, e);
            }
        });
    }
}

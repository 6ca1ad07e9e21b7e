// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{Booking, BookingError, BookingKind, BookingRequest, SetStatusRequest};
use crate::services::booking::BookingService;

fn into_app_error(kind: BookingKind, e: BookingError) -> AppError {
    match e {
        BookingError::NotFound => AppError::NotFound(format!("{} not found", kind)),
        BookingError::NoAvailability => {
            AppError::NotFound("No availability found for the selected date".to_string())
        }
        BookingError::SlotUnavailable => {
            AppError::Conflict("Requested time slot is not available".to_string())
        }
        BookingError::InvalidStatusTransition(current) => AppError::BadRequest(format!(
            "Cannot change status of a {} {}",
            current, kind
        )),
        BookingError::ParseError(msg) => AppError::BadRequest(msg),
        BookingError::ValidationError(msg) => AppError::ValidationError(msg),
        BookingError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn can_view(user: &User, booking: &Booking) -> bool {
    if user.is_admin() {
        return true;
    }
    if user.is_guardian() && booking.guardian_id == user.id {
        return true;
    }
    user.is_pediatrician()
        && booking
            .pediatrician_id
            .as_deref()
            .map(|id| id == user.id)
            .unwrap_or(false)
}

/// Create a Pending booking, reserving the requested slot.
#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<AppConfig>>,
    Path(kind): Path<BookingKind>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "Guardian")?;

    // Guardians book for themselves; admins may book on a guardian's behalf.
    if !user.is_admin() && request.guardian_id != user.id {
        return Err(AppError::Auth(
            "You can only book for your own account".to_string(),
        ));
    }

    let service = BookingService::new(&state);
    let booking = service
        .request_booking(kind, request, auth.token())
        .await
        .map_err(|e| into_app_error(kind, e))?;

    Ok(Json(json!({
        "message": format!("{} request submitted", kind.singular()),
        (kind.singular()): booking,
    })))
}

#[axum::debug_handler]
pub async fn list_bookings(
    State(state): State<Arc<AppConfig>>,
    Path(kind): Path<BookingKind>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let service = BookingService::new(&state);
    let bookings = service
        .list_bookings(kind, &user, auth.token())
        .await
        .map_err(|e| into_app_error(kind, e))?;

    Ok(Json(bookings))
}

/// A guardian's bookings from today onward.
#[axum::debug_handler]
pub async fn upcoming_bookings(
    State(state): State<Arc<AppConfig>>,
    Path(kind): Path<BookingKind>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Booking>>, AppError> {
    require_role(&user, "Guardian")?;

    let service = BookingService::new(&state);
    let bookings = service
        .upcoming_for_guardian(kind, &user, auth.token())
        .await
        .map_err(|e| into_app_error(kind, e))?;

    Ok(Json(bookings))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<AppConfig>>,
    Path((kind, booking_id)): Path<(BookingKind, Uuid)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Booking>, AppError> {
    let service = BookingService::new(&state);
    let booking = service
        .get_booking(kind, booking_id, auth.token())
        .await
        .map_err(|e| into_app_error(kind, e))?;

    // Hide other guardians' bookings rather than confirming they exist.
    if !can_view(&user, &booking) {
        return Err(AppError::NotFound(format!("{} not found", kind)));
    }

    Ok(Json(booking))
}

/// Approve or decline a pending booking. Pediatricians and admins only.
#[axum::debug_handler]
pub async fn set_booking_status(
    State(state): State<Arc<AppConfig>>,
    Path(kind): Path<BookingKind>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "Pediatrician")?;

    let service = BookingService::new(&state);
    let booking = service
        .set_status(kind, request, &user, auth.token())
        .await
        .map_err(|e| into_app_error(kind, e))?;

    Ok(Json(json!({
        "message": format!("{} status updated", kind.singular()),
        (kind.singular()): booking,
    })))
}

/// Cancel a booking and return its slot to the open set.
#[axum::debug_handler]
pub async fn delete_booking(
    State(state): State<Arc<AppConfig>>,
    Path((kind, booking_id)): Path<(BookingKind, Uuid)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    service
        .delete_booking(kind, booking_id, &user, auth.token())
        .await
        .map_err(|e| into_app_error(kind, e))?;

    Ok(Json(json!({
        "message": format!("{} deleted", kind.singular()),
    })))
}

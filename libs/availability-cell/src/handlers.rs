// libs/availability-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{AvailabilityError, AvailabilityQuery, PublishAvailabilityRequest, TimeSlot};
use crate::services::availability::AvailabilityService;

fn into_app_error(e: AvailabilityError) -> AppError {
    match e {
        AvailabilityError::NotFound => {
            AppError::NotFound("No availability found for the selected date".to_string())
        }
        AvailabilityError::SlotUnavailable => {
            AppError::Conflict("Requested time slot is not available".to_string())
        }
        AvailabilityError::ParseError(msg) | AvailabilityError::InvalidSlot(msg) => {
            AppError::BadRequest(msg)
        }
        AvailabilityError::ValidationError(msg) => AppError::ValidationError(msg),
        AvailabilityError::DatabaseError(msg) => AppError::Database(msg),
    }
}

/// Publish or replace a pediatrician's open slots for one date.
#[axum::debug_handler]
pub async fn publish_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<PublishAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "Pediatrician")?;

    let service = AvailabilityService::new(&state);
    let availability = service
        .publish(&user, request, auth.token())
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "message": "Availability saved successfully",
        "availability": availability,
    })))
}

/// Calendar view of published dates. Pediatricians see their own rows,
/// guardians see every pediatrician's published dates.
#[axum::debug_handler]
pub async fn get_marked_dates(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_pediatrician() && !user.is_guardian() && !user.is_admin() {
        return Err(AppError::Auth("Unauthorized role".to_string()));
    }

    let service = AvailabilityService::new(&state);
    let marked = service
        .get_marked_dates(&user, auth.token())
        .await
        .map_err(into_app_error)?;

    Ok(Json(marked))
}

/// Availability for one doctor and date, slots normalized to canonical form.
#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    Path(email): Path<String>,
    Query(query): Query<AvailabilityQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let day = service
        .load_for_date(&email, query.date, auth.token())
        .await
        .map_err(into_app_error)?;

    let open_slots = day.normalized_open().map_err(into_app_error)?;
    let booked_slots = day.normalized_booked().map_err(into_app_error)?;

    // Clients render the 12-hour form; the canonical labels are what they
    // must echo back when booking.
    let display_slots: Vec<String> = open_slots
        .iter()
        .map(|label| TimeSlot::from_label(label).map(|slot| slot.display_label()))
        .collect::<Result<_, _>>()
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "email": day.email,
        "name": day.name,
        "date": day.date,
        "status": day.status,
        "time_slots": open_slots,
        "display_slots": display_slots,
        "booked_slots": booked_slots,
    })))
}

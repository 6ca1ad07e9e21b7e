// libs/booking-cell/tests/handlers_test.rs
//
// Authorization behavior at the handler boundary. The transaction itself is
// covered in booking_test.rs; these only reach the store when authz passes.

use axum::extract::{Extension, Path, State};
use axum::Json;
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::handlers;
use booking_cell::models::{BookingKind, BookingRequest, BookingStatus, SetStatusRequest};
use shared_models::error::AppError;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TestUser};

fn auth_header() -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer("test-token").unwrap())
}

fn booking_request(guardian_id: &str) -> BookingRequest {
    BookingRequest {
        date: NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
        time_start: "9:00 AM".to_string(),
        time_end: "10:00 AM".to_string(),
        guardian_id: guardian_id.to_string(),
        patient_id: Uuid::new_v4().to_string(),
        description: "Routine checkup".to_string(),
        email: "reyes@clinic.example".to_string(),
    }
}

#[tokio::test]
async fn guardian_cannot_book_for_another_guardian() {
    let state = State(TestConfig::default().to_arc());
    let guardian = TestUser::guardian("parent@example.com");

    let result = handlers::create_booking(
        state,
        Path(BookingKind::Appointment),
        auth_header(),
        Extension(guardian.to_user()),
        Json(booking_request("someone-else")),
    )
    .await;

    assert!(matches!(result, Err(AppError::Auth(_))));
}

#[tokio::test]
async fn pediatrician_cannot_create_booking_for_themselves() {
    let state = State(TestConfig::default().to_arc());
    let doctor = TestUser::pediatrician("reyes@clinic.example");

    // Submitting their own id as guardian_id must not pass the role gate.
    let result = handlers::create_booking(
        state,
        Path(BookingKind::Appointment),
        auth_header(),
        Extension(doctor.to_user()),
        Json(booking_request(&doctor.id)),
    )
    .await;

    assert!(matches!(result, Err(AppError::Auth(_))));
}

#[tokio::test]
async fn guardian_cannot_set_booking_status() {
    let state = State(TestConfig::default().to_arc());
    let guardian = TestUser::guardian("parent@example.com");

    let result = handlers::set_booking_status(
        state,
        Path(BookingKind::Consultation),
        auth_header(),
        Extension(guardian.to_user()),
        Json(SetStatusRequest {
            booking_id: Uuid::new_v4(),
            status: BookingStatus::Approved,
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::Auth(_))));
}

#[tokio::test]
async fn guardian_cannot_read_another_guardians_booking() {
    let mock_server = MockServer::start().await;
    let state = State(TestConfig::with_store_url(&mock_server.uri()).to_arc());
    let guardian = TestUser::guardian("parent@example.com");
    let booking_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::booking_row(
                booking_id,
                "2026-09-14",
                "09:00:00",
                "10:00:00",
                "someone-else",
                "Pending",
            )
        ])))
        .mount(&mock_server)
        .await;

    let result = handlers::get_booking(
        state,
        Path((BookingKind::Appointment, booking_id)),
        auth_header(),
        Extension(guardian.to_user()),
    )
    .await;

    // Existence is not confirmed to non-owners.
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn owner_guardian_reads_own_booking() {
    let mock_server = MockServer::start().await;
    let state = State(TestConfig::with_store_url(&mock_server.uri()).to_arc());
    let guardian = TestUser::guardian("parent@example.com");
    let booking_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::booking_row(
                booking_id,
                "2026-09-14",
                "09:00:00",
                "10:00:00",
                &guardian.id,
                "Pending",
            )
        ])))
        .mount(&mock_server)
        .await;

    let Json(booking) = handlers::get_booking(
        state,
        Path((BookingKind::Appointment, booking_id)),
        auth_header(),
        Extension(guardian.to_user()),
    )
    .await
    .unwrap();

    assert_eq!(booking.id, booking_id);
    assert_eq!(booking.guardian_id, guardian.id);
}

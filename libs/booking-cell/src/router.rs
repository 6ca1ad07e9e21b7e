use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// One route tree serves both `/appointments` and `/consultations`; the
/// `{kind}` segment picks the table.
pub fn booking_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{kind}", post(handlers::create_booking))
        .route("/{kind}", get(handlers::list_bookings))
        .route("/{kind}/upcoming", get(handlers::upcoming_bookings))
        .route("/{kind}/status", patch(handlers::set_booking_status))
        .route("/{kind}/{id}", get(handlers::get_booking))
        .route("/{kind}/{id}", delete(handlers::delete_booking))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

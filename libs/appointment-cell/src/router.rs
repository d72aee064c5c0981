use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Core appointment routes, nested under `/appointments`. Everything here
/// requires authentication; per-route role checks happen in the handlers.
pub fn appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            post(handlers::create_appointment).get(handlers::list_all_appointments),
        )
        .route("/{id}", get(handlers::get_appointment))
        .route("/{id}/confirm", post(handlers::confirm_appointment))
        .route("/{id}/complete", post(handlers::complete_appointment))
        .route("/{id}/no-show", post(handlers::mark_appointment_no_show))
        .route("/{id}/cancel", post(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

/// The signed-in patient's own bookings, nested under `/user`.
pub fn patient_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/appointments", get(handlers::list_my_appointments))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

/// Provider dashboard listings, nested under `/provider` alongside the
/// schedule-management routes from the provider cell.
pub fn provider_portal_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/appointments", get(handlers::list_provider_appointments))
        .route(
            "/appointments/counts",
            get(handlers::get_provider_appointment_counts),
        )
        .route("/calendar", get(handlers::get_provider_calendar))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

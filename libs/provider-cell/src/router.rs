use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Router};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Public provider directory routes, nested under `/providers`.
///
/// These back the booking front end before a patient has signed in, so no
/// authentication is applied.
pub fn provider_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/{id}/available-slots", get(handlers::get_available_slots))
        .route(
            "/{id}/available-slots-range",
            get(handlers::get_available_slots_range),
        )
        .route("/{id}/schedule-info", get(handlers::get_schedule_info))
        .route("/{id}/services", get(handlers::list_services))
        .route("/{id}/packages", get(handlers::list_packages))
        .with_state(state)
}

/// Schedule management for the signed-in provider, nested under `/provider`.
pub fn schedule_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/operating-hours",
            get(handlers::get_my_operating_hours).put(handlers::update_my_operating_hours),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::{appointment_routes, patient_routes, provider_portal_routes};
use provider_cell::router::{provider_routes, schedule_routes};
use shared_database::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "CareSlot API is running!" }))
        .nest("/providers", provider_routes(state.clone()))
        .nest(
            "/provider",
            schedule_routes(state.clone()).merge(provider_portal_routes(state.clone())),
        )
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/user", patient_routes(state))
}

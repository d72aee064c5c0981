use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{Provider, ProviderError, UpdateOperatingHoursRequest};
use crate::services::schedule::{self, ScheduleService};
use crate::services::{AvailabilityService, CatalogService};

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct SlotsRangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn map_provider_error(err: ProviderError) -> AppError {
    match err {
        ProviderError::NotFound => AppError::NotFound("Provider not found".to_string()),
        ProviderError::Validation(message) => AppError::BadRequest(message),
        ProviderError::Database(message) => AppError::Database(message),
    }
}

/// GET /providers/{id}/available-slots?date=YYYY-MM-DD
#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let slots = service
        .available_slots(provider_id, query.date)
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "date": query.date,
        "total_slots": slots.len(),
        "slots": slots
    })))
}

/// GET /providers/{id}/available-slots-range?start_date=..&end_date=..
#[axum::debug_handler]
pub async fn get_available_slots_range(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<SlotsRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let days = service
        .available_slots_for_range(provider_id, query.start_date, query.end_date)
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "start_date": query.start_date,
        "end_date": query.end_date,
        "total_days": days.len(),
        "days": days
    })))
}

/// GET /providers/{id}/schedule-info
#[axum::debug_handler]
pub async fn get_schedule_info(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&state);
    let schedule = service
        .schedule_info(provider_id)
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}

/// GET /providers/{id}/services
#[axum::debug_handler]
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = CatalogService::new(&state);
    let services = service
        .services_for_provider(provider_id)
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "services": services
    })))
}

/// GET /providers/{id}/packages
#[axum::debug_handler]
pub async fn list_packages(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = CatalogService::new(&state);
    let packages = service
        .packages_for_provider(provider_id)
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "packages": packages
    })))
}

/// GET /provider/operating-hours
#[axum::debug_handler]
pub async fn get_my_operating_hours(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let provider = resolve_own_provider(&state, &user).await?;
    let service = ScheduleService::new(&state);
    let operating_hours = service
        .operating_hours(provider.id)
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "provider_id": provider.id,
        "operating_hours": operating_hours
    })))
}

/// PUT /provider/operating-hours
#[axum::debug_handler]
pub async fn update_my_operating_hours(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateOperatingHoursRequest>,
) -> Result<Json<Value>, AppError> {
    let provider = resolve_own_provider(&state, &user).await?;
    let service = ScheduleService::new(&state);
    let operating_hours = service
        .update_operating_hours(provider.id, request.hours)
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Operating hours updated",
        "operating_hours": operating_hours
    })))
}

/// The provider profile owned by the authenticated user. Role is checked
/// before touching the database so plain patients get a clean 403.
pub(crate) async fn resolve_own_provider(
    state: &AppState,
    user: &User,
) -> Result<Provider, AppError> {
    if !user.is_provider() {
        return Err(AppError::Forbidden(
            "Provider role required".to_string(),
        ));
    }
    schedule::find_provider_by_user(&state.db, user.id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Provider profile not found".to_string()))
}

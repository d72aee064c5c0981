use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use provider_cell::models::{BookableKind, Provider};
use provider_cell::services::schedule;
use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, CalendarQuery, CancelAppointmentRequest, CreateAppointmentRequest,
    ListAppointmentsQuery, ProviderAppointmentFilters, RangeAppointmentFilters,
    RangeAppointmentsQuery, StatusFilter,
};
use crate::services::{AppointmentLifecycleService, AppointmentQueryService, BookingService};

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

fn map_appointment_error(err: AppointmentError) -> AppError {
    let message = err.to_string();
    match err {
        AppointmentError::NotFound
        | AppointmentError::ProviderNotFound
        | AppointmentError::PatientNotFound => AppError::NotFound(message),
        AppointmentError::BookableNotFound { kind, .. } => AppError::Validation {
            field: bookable_field(kind).to_string(),
            message,
        },
        AppointmentError::OutsideOperatingHours | AppointmentError::SlotNotAvailable => {
            AppError::Validation {
                field: "start_time".to_string(),
                message,
            }
        }
        AppointmentError::InvalidTransition(..) => AppError::Conflict(message),
        AppointmentError::Unauthorized => AppError::Forbidden(message),
        AppointmentError::Validation(_) => AppError::BadRequest(message),
        AppointmentError::Database(_) => AppError::Database(message),
    }
}

fn bookable_field(kind: BookableKind) -> &'static str {
    match kind {
        BookableKind::Service => "services",
        BookableKind::Package => "packages",
    }
}

fn parse_provider_filters(
    query: ListAppointmentsQuery,
) -> Result<ProviderAppointmentFilters, AppError> {
    let status = query
        .status
        .as_deref()
        .map(StatusFilter::from_str)
        .transpose()
        .map_err(AppError::BadRequest)?;
    Ok(ProviderAppointmentFilters {
        status,
        date: query.date,
        search: query.search,
        page: query.page,
        per_page: query.per_page,
    })
}

fn parse_range_filters(
    query: RangeAppointmentsQuery,
) -> Result<RangeAppointmentFilters, AppError> {
    let status = query
        .status
        .as_deref()
        .map(StatusFilter::from_str)
        .transpose()
        .map_err(AppError::BadRequest)?;
    Ok(RangeAppointmentFilters {
        status,
        from_date: query.from_date,
        to_date: query.to_date,
        page: query.page,
        per_page: query.per_page,
    })
}

/// The provider profile owned by the authenticated user, for `/provider/*`
/// routes. Role is checked before touching the database.
async fn require_provider(state: &AppState, user: &User) -> Result<Provider, AppError> {
    if !user.is_provider() {
        return Err(AppError::Forbidden("Provider role required".to_string()));
    }
    schedule::find_provider_by_user(&state.db, user.id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Provider profile not found".to_string()))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

/// POST /appointments
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = BookingService::new(&state);
    let appointment = service
        .create(request.into_new_appointment(user.id))
        .await
        .map_err(map_appointment_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Appointment requested",
            "appointment": appointment
        })),
    ))
}

/// GET /appointments, the back-office listing across all providers
#[axum::debug_handler]
pub async fn list_all_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<RangeAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Administrator role required".to_string()));
    }
    let filters = parse_range_filters(query)?;
    let service = AppointmentQueryService::new(&state);
    let appointments = service
        .all_appointments(&filters)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

/// GET /appointments/{id}
#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentQueryService::new(&state);
    let details = service
        .appointment_details(appointment_id)
        .await
        .map_err(map_appointment_error)?;

    let mut allowed = user.is_admin() || details.appointment.user_id == user.id;
    if !allowed && user.is_provider() {
        allowed = schedule::find_provider_by_user(&state.db, user.id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .map(|provider| provider.id == details.appointment.provider_id)
            .unwrap_or(false);
    }
    if !allowed {
        return Err(AppError::Forbidden(
            "You do not have access to this appointment".to_string(),
        ));
    }

    Ok(Json(json!({
        "success": true,
        "appointment": details
    })))
}

// ==============================================================================
// STATUS TRANSITION HANDLERS
// ==============================================================================

/// POST /appointments/{id}/confirm
#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentLifecycleService::new(&state);
    let appointment = service
        .confirm(appointment_id, &user)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment confirmed",
        "appointment": appointment
    })))
}

/// POST /appointments/{id}/complete
#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentLifecycleService::new(&state);
    let appointment = service
        .complete(appointment_id, &user)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment completed",
        "appointment": appointment
    })))
}

/// POST /appointments/{id}/no-show
#[axum::debug_handler]
pub async fn mark_appointment_no_show(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentLifecycleService::new(&state);
    let appointment = service
        .mark_no_show(appointment_id, &user)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment marked as no-show",
        "appointment": appointment
    })))
}

/// POST /appointments/{id}/cancel. The actor's role decides which
/// cancellation rules apply.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentLifecycleService::new(&state);
    let appointment = service
        .cancel(appointment_id, &user, request.reason)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled",
        "appointment": appointment
    })))
}

// ==============================================================================
// PATIENT LISTING HANDLERS
// ==============================================================================

/// GET /user/appointments
#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<RangeAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let filters = parse_range_filters(query)?;
    let service = AppointmentQueryService::new(&state);
    let appointments = service
        .user_appointments(user.id, &filters)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

// ==============================================================================
// PROVIDER PORTAL HANDLERS
// ==============================================================================

/// GET /provider/appointments
#[axum::debug_handler]
pub async fn list_provider_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let provider = require_provider(&state, &user).await?;
    let filters = parse_provider_filters(query)?;
    let service = AppointmentQueryService::new(&state);
    let appointments = service
        .provider_appointments(provider.id, &filters)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

/// GET /provider/appointments/counts
#[axum::debug_handler]
pub async fn get_provider_appointment_counts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let provider = require_provider(&state, &user).await?;
    let service = AppointmentQueryService::new(&state);
    let counts = service
        .provider_status_counts(provider.id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "counts": counts
    })))
}

/// GET /provider/calendar?start_date=..&end_date=..
#[axum::debug_handler]
pub async fn get_provider_calendar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Value>, AppError> {
    let provider = require_provider(&state, &user).await?;
    let service = AppointmentQueryService::new(&state);
    let entries = service
        .provider_calendar(provider.id, query.start_date, query.end_date)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "start_date": query.start_date,
        "end_date": query.end_date,
        "appointments": entries
    })))
}

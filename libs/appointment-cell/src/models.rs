use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use provider_cell::models::{BookableKind, BookableRef};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub appointment_number: String,
    pub user_id: Uuid,
    pub provider_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub total_price: Decimal,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "no_show" => Ok(AppointmentStatus::NoShow),
            other => Err(format!("Unknown appointment status: {other}")),
        }
    }
}

/// One booked offering, snapshotted at booking time. Later catalog price or
/// name changes never alter existing appointments.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AppointmentItem {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub bookable_kind: BookableKind,
    pub bookable_id: Uuid,
    pub name: String,
    pub price_at_booking: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PatientSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProviderSummary {
    pub id: Uuid,
    pub healthcare_name: String,
    pub email: String,
}

/// The response shape for a single appointment: the row itself plus the
/// people involved and the booked line items.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: PatientSummary,
    pub provider: ProviderSummary,
    pub items: Vec<AppointmentItem>,
}

/// Compact row for the provider's calendar view.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CalendarEntry {
    pub id: Uuid,
    pub appointment_number: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub patient_name: String,
}

/// Dashboard header numbers: one bucket per literal status plus the derived
/// `today` and `upcoming` windows (which overlap the status buckets).
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub no_show: i64,
    pub today: i64,
    pub upcoming: i64,
    pub total: i64,
}

// ==============================================================================
// BOOKING INPUT MODELS
// ==============================================================================

/// Service-level booking input, assembled by the HTTP layer from the request
/// body plus the authenticated user.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub user_id: Uuid,
    pub provider_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub items: Vec<BookingItem>,
    /// Overrides the computed line-item sum when set.
    pub total_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct BookingItem {
    pub reference: BookableRef,
    pub price_at_booking: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub provider_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub services: Vec<ServiceLineRequest>,
    #[serde(default)]
    pub packages: Vec<PackageLineRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceLineRequest {
    pub service_id: Uuid,
    pub price_at_booking: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageLineRequest {
    pub package_id: Uuid,
    pub price_at_booking: Decimal,
}

impl CreateAppointmentRequest {
    pub fn into_new_appointment(self, user_id: Uuid) -> NewAppointment {
        let items = self
            .services
            .into_iter()
            .map(|line| BookingItem {
                reference: BookableRef::service(line.service_id),
                price_at_booking: line.price_at_booking,
            })
            .chain(self.packages.into_iter().map(|line| BookingItem {
                reference: BookableRef::package(line.package_id),
                price_at_booking: line.price_at_booking,
            }))
            .collect();

        NewAppointment {
            user_id,
            provider_id: self.provider_id,
            start_time: self.start_time,
            end_time: self.end_time,
            notes: self.notes,
            items,
            total_price: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelAppointmentRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Which side of the booking is cancelling. Decides whether a reason is
/// mandatory and which ownership check applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelActor {
    Patient,
    Provider,
}

// ==============================================================================
// LIST FILTERS AND PAGINATION
// ==============================================================================

/// Status filter accepted by the listing endpoints: either a literal status
/// or one of the derived pseudo-statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Is(AppointmentStatus),
    /// Appointments starting on the current calendar date.
    Today,
    /// Appointments starting now or later.
    Upcoming,
    /// Finished business: completed or no-show.
    History,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(StatusFilter::Today),
            "upcoming" => Ok(StatusFilter::Upcoming),
            "history" => Ok(StatusFilter::History),
            other => AppointmentStatus::from_str(other)
                .map(StatusFilter::Is)
                .map_err(|_| format!("Unknown status filter: {other}")),
        }
    }
}

pub const DEFAULT_PER_PAGE: u32 = 25;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    /// Builds a page from raw query values, clamping the size to
    /// `1..=MAX_PER_PAGE` and the page number to at least 1.
    pub fn from_query(page: Option<u32>, per_page: Option<u32>) -> Self {
        let number = page.unwrap_or(1).max(1);
        let size = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        Self { number, size }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

/// Filters for the provider-facing appointment list.
#[derive(Debug, Clone, Default)]
pub struct ProviderAppointmentFilters {
    pub status: Option<StatusFilter>,
    pub date: Option<NaiveDate>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Filters for the patient and admin lists: status plus an inclusive
/// calendar-date range on the start time.
#[derive(Debug, Clone, Default)]
pub struct RangeAppointmentFilters {
    pub status: Option<StatusFilter>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, page: Page, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            ((total + u64::from(page.size) - 1) / u64::from(page.size)) as u32
        };
        Self {
            data,
            page: page.number,
            per_page: page.size,
            total,
            total_pages,
        }
    }
}

// ==============================================================================
// HTTP QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAppointmentsQuery {
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeAppointmentsQuery {
    pub status: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Provider not found")]
    ProviderNotFound,

    #[error("Patient account not found")]
    PatientNotFound,

    #[error("The requested {kind} is not offered by this provider")]
    BookableNotFound { kind: BookableKind, id: Uuid },

    #[error("The requested time is outside the provider's operating hours")]
    OutsideOperatingHours,

    #[error("The requested time slot is no longer available")]
    SlotNotAvailable,

    #[error("Cannot change appointment status from {0} to {1}")]
    InvalidTransition(AppointmentStatus, AppointmentStatus),

    #[error("You do not have access to this appointment")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for AppointmentError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppointmentError::NotFound,
            other => AppointmentError::Database(other.to_string()),
        }
    }
}

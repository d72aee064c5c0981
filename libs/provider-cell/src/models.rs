use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Provider {
    pub id: Uuid,
    pub user_id: Uuid,
    pub healthcare_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub slot_duration_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row per (provider, weekday). Null times or `is_closed` mean the
/// provider takes no appointments that day.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OperatingHour {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub day_of_week: i16,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BreakTime {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub name: String,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_min: Decimal,
    pub price_max: Decimal,
    pub is_active: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Package {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub is_active: bool,
}

// ==============================================================================
// BOOKABLE CATALOG UNION
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BookableKind {
    Service,
    Package,
}

impl std::fmt::Display for BookableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookableKind::Service => write!(f, "service"),
            BookableKind::Package => write!(f, "package"),
        }
    }
}

/// Reference to a catalog entry as supplied by a booking request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BookableRef {
    pub kind: BookableKind,
    pub id: Uuid,
}

impl BookableRef {
    pub fn service(id: Uuid) -> Self {
        Self {
            kind: BookableKind::Service,
            id,
        }
    }

    pub fn package(id: Uuid) -> Self {
        Self {
            kind: BookableKind::Package,
            id,
        }
    }
}

/// A resolved catalog entry. Booking snapshots name and price from this so
/// later catalog edits never rewrite history.
#[derive(Debug, Clone)]
pub enum Bookable {
    Service(Service),
    Package(Package),
}

impl Bookable {
    pub fn kind(&self) -> BookableKind {
        match self {
            Bookable::Service(_) => BookableKind::Service,
            Bookable::Package(_) => BookableKind::Package,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Bookable::Service(s) => s.id,
            Bookable::Package(p) => p.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Bookable::Service(s) => &s.name,
            Bookable::Package(p) => &p.name,
        }
    }
}

// ==============================================================================
// SLOT AND SCHEDULE VIEWS
// ==============================================================================

/// One offerable slot on a concrete date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// 12-hour rendering of the start, e.g. "9:00 AM".
    pub formatted_time: String,
    pub datetime: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub day_name: String,
    pub formatted_date: String,
    pub slots: Vec<SlotInfo>,
    pub total_slots: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleInfo {
    pub provider_id: Uuid,
    pub healthcare_name: String,
    pub slot_duration_minutes: i32,
    pub operating_hours: Vec<OperatingHour>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OperatingHourInput {
    pub day_of_week: i16,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub is_closed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOperatingHoursRequest {
    pub hours: Vec<OperatingHourInput>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for ProviderError {
    fn from(err: sqlx::Error) -> Self {
        ProviderError::Database(err.to_string())
    }
}

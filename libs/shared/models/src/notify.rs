use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentEvent {
    Requested,
    Confirmed,
    Cancelled,
}

impl std::fmt::Display for AppointmentEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppointmentEvent::Requested => write!(f, "requested"),
            AppointmentEvent::Confirmed => write!(f, "confirmed"),
            AppointmentEvent::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What the dispatcher gets to work with. Content rendering happens on the
/// receiving side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub event: AppointmentEvent,
    pub appointment_id: Uuid,
    pub appointment_number: String,
    pub user_id: Uuid,
    pub provider_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Outbound notification dispatch. Callers fire and forget; a failed
/// dispatch must never roll back the appointment change that triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, payload: NotificationPayload) -> Result<(), String>;
}

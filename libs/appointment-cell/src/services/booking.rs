use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use provider_cell::services::catalog::resolve_bookable;
use provider_cell::services::schedule;
use shared_database::AppState;
use shared_models::clock::Clock;
use shared_models::notify::{AppointmentEvent, NotificationPayload, Notifier};
use shared_utils::notify::dispatch;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentItem, NewAppointment,
    PatientSummary, ProviderSummary,
};
use crate::services::conflict;

pub(crate) const APPOINTMENT_COLUMNS: &str = "id, appointment_number, user_id, provider_id, \
     start_time, end_time, status, notes, total_price, cancelled_at, cancellation_reason, \
     cancelled_by, created_at, updated_at";

/// Give up on number generation after this many collisions; with 9,000
/// candidates per day something else is wrong well before we get here.
const MAX_NUMBER_ATTEMPTS: u32 = 20;

/// Transactional appointment writer.
///
/// The whole booking runs in one transaction under a per-provider advisory
/// lock: validation, number generation, and the multi-row insert either all
/// commit or none do, and two concurrent bookings for overlapping slots on
/// the same provider serialize so only the first one passes validation.
pub struct BookingService {
    db: PgPool,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            clock: state.clock.clone(),
            notifier: state.notifier.clone(),
        }
    }

    #[instrument(skip(self, data), fields(provider_id = %data.provider_id, user_id = %data.user_id))]
    pub async fn create(&self, data: NewAppointment) -> Result<AppointmentDetails, AppointmentError> {
        if data.items.is_empty() {
            return Err(AppointmentError::Validation(
                "At least one service or package is required".to_string(),
            ));
        }
        if data.end_time <= data.start_time {
            return Err(AppointmentError::Validation(
                "end_time must be after start_time".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        // Serialize concurrent bookings per provider for the whole
        // check-then-insert sequence. Released automatically at commit
        // or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(provider_lock_key(data.provider_id))
            .execute(&mut *tx)
            .await?;

        let provider = schedule::fetch_provider(&mut *tx, data.provider_id)
            .await?
            .ok_or(AppointmentError::ProviderNotFound)?;
        let patient = sqlx::query_as::<_, PatientSummary>(
            "SELECT id, name, email FROM users WHERE id = $1",
        )
        .bind(data.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppointmentError::PatientNotFound)?;

        if !conflict::is_within_operating_hours(
            &mut *tx,
            provider.id,
            data.start_time,
            data.end_time,
        )
        .await?
        {
            return Err(AppointmentError::OutsideOperatingHours);
        }
        if !conflict::is_time_slot_available(
            &mut *tx,
            provider.id,
            data.start_time,
            data.end_time,
            None,
        )
        .await?
        {
            warn!(provider_id = %provider.id, "booking lost the slot to a concurrent appointment");
            return Err(AppointmentError::SlotNotAvailable);
        }

        // Resolve every line item against the live catalog before writing
        let mut lines = Vec::with_capacity(data.items.len());
        for item in &data.items {
            let bookable = resolve_bookable(&mut *tx, provider.id, item.reference)
                .await?
                .ok_or(AppointmentError::BookableNotFound {
                    kind: item.reference.kind,
                    id: item.reference.id,
                })?;
            lines.push((bookable, item.price_at_booking));
        }

        let total_price = data
            .total_price
            .unwrap_or_else(|| lines.iter().map(|(_, price)| *price).sum::<Decimal>());

        let appointment_number = self.generate_appointment_number(&mut tx).await?;

        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "INSERT INTO appointments \
             (appointment_number, user_id, provider_id, start_time, end_time, status, notes, total_price) \
             VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7) \
             RETURNING {APPOINTMENT_COLUMNS}"
        ))
        .bind(&appointment_number)
        .bind(data.user_id)
        .bind(provider.id)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(&data.notes)
        .bind(total_price)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for (bookable, price) in &lines {
            let item = sqlx::query_as::<_, AppointmentItem>(
                "INSERT INTO appointment_items \
                 (appointment_id, bookable_kind, bookable_id, name, price_at_booking) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING id, appointment_id, bookable_kind, bookable_id, name, price_at_booking",
            )
            .bind(appointment.id)
            .bind(bookable.kind())
            .bind(bookable.id())
            .bind(bookable.name())
            .bind(price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;

        info!(
            appointment_number = %appointment.appointment_number,
            items = items.len(),
            %total_price,
            "appointment booked"
        );
        dispatch(
            self.notifier.clone(),
            NotificationPayload {
                event: AppointmentEvent::Requested,
                appointment_id: appointment.id,
                appointment_number: appointment.appointment_number.clone(),
                user_id: appointment.user_id,
                provider_id: appointment.provider_id,
                start_time: appointment.start_time,
                end_time: appointment.end_time,
            },
        );

        Ok(AppointmentDetails {
            appointment,
            patient,
            provider: ProviderSummary {
                id: provider.id,
                healthcare_name: provider.healthcare_name,
                email: provider.email,
            },
            items,
        })
    }

    /// Draws random candidates until one is unused. Runs on the booking
    /// transaction so the winning number is reserved by the insert that
    /// follows.
    async fn generate_appointment_number(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<String, AppointmentError> {
        let now = self.clock.now();
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let sequence = 1_000 + rand::random::<u32>() % 9_000;
            let candidate = appointment_number_for(now, sequence);

            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM appointments WHERE appointment_number = $1)",
            )
            .bind(&candidate)
            .fetch_one(&mut **tx)
            .await?;
            if !taken {
                return Ok(candidate);
            }
        }
        Err(AppointmentError::Database(
            "Could not allocate a unique appointment number".to_string(),
        ))
    }
}

/// Booking identifier shown to patients and staff: `APT-YYYYMMDD-NNNN`.
pub fn appointment_number_for(now: DateTime<Utc>, sequence: u32) -> String {
    format!("APT-{}-{:04}", now.format("%Y%m%d"), sequence)
}

/// Collapses a provider uuid into the advisory-lock keyspace. Stable across
/// processes so every instance serializes on the same key.
pub fn provider_lock_key(provider_id: Uuid) -> i64 {
    let bits = provider_id.as_u128();
    ((bits >> 64) as i64) ^ (bits as i64)
}

use std::sync::Arc;

use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use provider_cell::services::schedule;
use shared_database::AppState;
use shared_models::auth::User;
use shared_models::clock::Clock;
use shared_models::notify::{AppointmentEvent, NotificationPayload, Notifier};
use shared_utils::notify::dispatch;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentStatus, CancelActor,
};
use crate::services::booking::APPOINTMENT_COLUMNS;
use crate::services::query::AppointmentQueryService;

/// Statuses an appointment may move to from `from`. Completed, cancelled and
/// no-show are terminal.
pub fn valid_transitions(from: AppointmentStatus) -> &'static [AppointmentStatus] {
    match from {
        AppointmentStatus::Pending => &[
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
        ],
        AppointmentStatus::Confirmed => &[
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ],
        AppointmentStatus::Completed
        | AppointmentStatus::Cancelled
        | AppointmentStatus::NoShow => &[],
    }
}

pub fn validate_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), AppointmentError> {
    if valid_transitions(from).contains(&to) {
        Ok(())
    } else {
        warn!(%from, %to, "invalid appointment status transition attempted");
        Err(AppointmentError::InvalidTransition(from, to))
    }
}

/// Drives the appointment state machine. Every mutation locks the row,
/// checks who is asking, validates the transition, and only then writes.
pub struct AppointmentLifecycleService {
    db: PgPool,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    query: AppointmentQueryService,
}

impl AppointmentLifecycleService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            clock: state.clock.clone(),
            notifier: state.notifier.clone(),
            query: AppointmentQueryService::new(state),
        }
    }

    /// Provider accepts a pending booking. Notifies the patient.
    pub async fn confirm(
        &self,
        appointment_id: Uuid,
        actor: &User,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let details = self
            .transition_as_provider(appointment_id, actor, AppointmentStatus::Confirmed)
            .await?;
        self.dispatch_event(AppointmentEvent::Confirmed, &details);
        Ok(details)
    }

    /// Provider closes out a confirmed appointment after the visit.
    pub async fn complete(
        &self,
        appointment_id: Uuid,
        actor: &User,
    ) -> Result<AppointmentDetails, AppointmentError> {
        self.transition_as_provider(appointment_id, actor, AppointmentStatus::Completed)
            .await
    }

    /// Provider records that the patient never showed up.
    pub async fn mark_no_show(
        &self,
        appointment_id: Uuid,
        actor: &User,
    ) -> Result<AppointmentDetails, AppointmentError> {
        self.transition_as_provider(appointment_id, actor, AppointmentStatus::NoShow)
            .await
    }

    /// Cancels on behalf of whichever side the actor is on. Providers must
    /// give a reason; patients may. Both sides are limited to their own
    /// appointments. Notifies the counterpart on success.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        actor: &User,
        reason: Option<String>,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let mut tx = self.db.begin().await?;
        let appointment = lock_appointment(&mut tx, appointment_id).await?;
        let acting = self.resolve_cancel_actor(&mut tx, actor, &appointment).await?;

        validate_transition(appointment.status, AppointmentStatus::Cancelled)?;
        if acting == CancelActor::Provider && reason.is_none() {
            return Err(AppointmentError::Validation(
                "cancellation_reason is required when the provider cancels".to_string(),
            ));
        }

        sqlx::query(
            "UPDATE appointments SET status = 'cancelled', cancelled_at = $1, \
             cancellation_reason = $2, cancelled_by = $3, updated_at = now() WHERE id = $4",
        )
        .bind(self.clock.now())
        .bind(&reason)
        .bind(actor.id)
        .bind(appointment_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            appointment_number = %appointment.appointment_number,
            by = ?acting,
            "appointment cancelled"
        );
        let details = self.query.appointment_details(appointment_id).await?;
        self.dispatch_event(AppointmentEvent::Cancelled, &details);
        Ok(details)
    }

    async fn transition_as_provider(
        &self,
        appointment_id: Uuid,
        actor: &User,
        to: AppointmentStatus,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let mut tx = self.db.begin().await?;
        let appointment = lock_appointment(&mut tx, appointment_id).await?;
        self.ensure_provider_access(&mut tx, actor, &appointment).await?;

        validate_transition(appointment.status, to)?;
        sqlx::query("UPDATE appointments SET status = $1, updated_at = now() WHERE id = $2")
            .bind(to)
            .bind(appointment_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            appointment_number = %appointment.appointment_number,
            from = %appointment.status,
            to = %to,
            "appointment status changed"
        );
        self.query.appointment_details(appointment_id).await
    }

    /// Providers act only on their own appointments; admins may act on any.
    async fn ensure_provider_access(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        actor: &User,
        appointment: &Appointment,
    ) -> Result<(), AppointmentError> {
        if actor.is_admin() {
            return Ok(());
        }
        if !actor.is_provider() {
            return Err(AppointmentError::Unauthorized);
        }
        let provider = schedule::find_provider_by_user(&mut **tx, actor.id)
            .await?
            .ok_or(AppointmentError::Unauthorized)?;
        if provider.id != appointment.provider_id {
            return Err(AppointmentError::Unauthorized);
        }
        Ok(())
    }

    async fn resolve_cancel_actor(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        actor: &User,
        appointment: &Appointment,
    ) -> Result<CancelActor, AppointmentError> {
        if actor.is_admin() {
            // Admin cancellations follow provider rules, reason included
            return Ok(CancelActor::Provider);
        }
        if actor.is_provider() {
            let provider = schedule::find_provider_by_user(&mut **tx, actor.id)
                .await?
                .ok_or(AppointmentError::Unauthorized)?;
            if provider.id != appointment.provider_id {
                return Err(AppointmentError::Unauthorized);
            }
            return Ok(CancelActor::Provider);
        }
        if appointment.user_id != actor.id {
            return Err(AppointmentError::Unauthorized);
        }
        Ok(CancelActor::Patient)
    }

    fn dispatch_event(&self, event: AppointmentEvent, details: &AppointmentDetails) {
        dispatch(
            self.notifier.clone(),
            NotificationPayload {
                event,
                appointment_id: details.appointment.id,
                appointment_number: details.appointment.appointment_number.clone(),
                user_id: details.appointment.user_id,
                provider_id: details.appointment.provider_id,
                start_time: details.appointment.start_time,
                end_time: details.appointment.end_time,
            },
        );
    }
}

async fn lock_appointment(
    tx: &mut Transaction<'_, Postgres>,
    appointment_id: Uuid,
) -> Result<Appointment, AppointmentError> {
    sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1 FOR UPDATE"
    ))
    .bind(appointment_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(AppointmentError::NotFound)
}

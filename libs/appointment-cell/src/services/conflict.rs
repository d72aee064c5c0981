use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use tracing::debug;
use uuid::Uuid;

use provider_cell::models::OperatingHour;
use provider_cell::services::slots::weekday_index;

/// Whether `[start, end)` sits inside the provider's operating hours for the
/// weekday of `start`.
///
/// Returns false when the provider has no row for that weekday, the day is
/// closed, or either time is unset. The check runs on whatever executor it is
/// handed, so the booking transaction can re-validate under its lock.
pub async fn is_within_operating_hours<'e, E>(
    executor: E,
    provider_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let day = weekday_index(start.date_naive());
    let hours = sqlx::query_as::<_, OperatingHour>(
        "SELECT id, provider_id, day_of_week, start_time, end_time, is_closed \
         FROM operating_hours WHERE provider_id = $1 AND day_of_week = $2",
    )
    .bind(provider_id)
    .bind(day)
    .fetch_optional(executor)
    .await?;

    Ok(hours
        .map(|h| interval_within_hours(start, end, &h))
        .unwrap_or(false))
}

/// Whether `[start, end)` is free of conflicts with the provider's
/// non-cancelled appointments.
///
/// Two intervals conflict when each starts before the other ends, so slots
/// that merely touch at a boundary do not collide. `exclude_appointment_id`
/// lets a re-check skip the appointment being modified.
pub async fn is_time_slot_available<'e, E>(
    executor: E,
    provider_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_appointment_id: Option<Uuid>,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let conflict_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (\
            SELECT 1 FROM appointments \
            WHERE provider_id = $1 \
            AND status != 'cancelled' \
            AND start_time < $3 \
            AND end_time > $2 \
            AND ($4::uuid IS NULL OR id != $4)\
         )",
    )
    .bind(provider_id)
    .bind(start)
    .bind(end)
    .bind(exclude_appointment_id)
    .fetch_one(executor)
    .await?;

    if conflict_exists {
        debug!(%provider_id, %start, %end, "slot conflicts with an existing appointment");
    }
    Ok(!conflict_exists)
}

/// Pure interval check against one operating-hours row. The operating bounds
/// are anchored to the calendar date of `start`, so a request that runs past
/// the day's closing time (including past midnight) fails.
pub fn interval_within_hours(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    hours: &OperatingHour,
) -> bool {
    if hours.is_closed {
        return false;
    }
    let (Some(open), Some(close)) = (hours.start_time, hours.end_time) else {
        return false;
    };

    let date = start.date_naive();
    let opens_at = date.and_time(open).and_utc();
    let closes_at = date.and_time(close).and_utc();

    start >= opens_at && end <= closes_at
}

use sqlx::{PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use shared_database::AppState;

use crate::models::{OperatingHour, OperatingHourInput, Provider, ProviderError, ScheduleInfo};

/// Manages a provider's weekly operating hours and the public schedule view.
pub struct ScheduleService {
    db: PgPool,
}

impl ScheduleService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
        }
    }

    /// The provider's weekly hours, ordered Sunday through Saturday. Days the
    /// provider never configured simply have no row.
    pub async fn operating_hours(&self, provider_id: Uuid) -> Result<Vec<OperatingHour>, ProviderError> {
        let hours = sqlx::query_as::<_, OperatingHour>(
            "SELECT id, provider_id, day_of_week, start_time, end_time, is_closed \
             FROM operating_hours WHERE provider_id = $1 ORDER BY day_of_week",
        )
        .bind(provider_id)
        .fetch_all(&self.db)
        .await?;
        Ok(hours)
    }

    /// Upserts the submitted days in one transaction, keyed on
    /// `(provider_id, day_of_week)`. Days not mentioned keep their stored
    /// configuration.
    pub async fn update_operating_hours(
        &self,
        provider_id: Uuid,
        hours: Vec<OperatingHourInput>,
    ) -> Result<Vec<OperatingHour>, ProviderError> {
        validate_hours(&hours)?;

        let mut tx = self.db.begin().await?;
        for input in &hours {
            sqlx::query(
                "INSERT INTO operating_hours (provider_id, day_of_week, start_time, end_time, is_closed) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (provider_id, day_of_week) DO UPDATE SET \
                 start_time = EXCLUDED.start_time, \
                 end_time = EXCLUDED.end_time, \
                 is_closed = EXCLUDED.is_closed, \
                 updated_at = now()",
            )
            .bind(provider_id)
            .bind(input.day_of_week)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.is_closed)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(%provider_id, days = hours.len(), "operating hours updated");
        self.operating_hours(provider_id).await
    }

    /// Everything a booking front end needs before it starts asking for
    /// slots: the provider's profile basics plus the full weekly schedule.
    pub async fn schedule_info(&self, provider_id: Uuid) -> Result<ScheduleInfo, ProviderError> {
        let provider = fetch_provider(&self.db, provider_id)
            .await?
            .ok_or(ProviderError::NotFound)?;
        let operating_hours = self.operating_hours(provider_id).await?;

        Ok(ScheduleInfo {
            provider_id: provider.id,
            healthcare_name: provider.healthcare_name,
            slot_duration_minutes: provider.slot_duration_minutes,
            operating_hours,
        })
    }
}

/// Rejects a submitted week before any of it is written.
///
/// Open days need both times and must end after they start on the same
/// calendar day; schedules that span midnight are not supported.
pub fn validate_hours(hours: &[OperatingHourInput]) -> Result<(), ProviderError> {
    if hours.is_empty() {
        return Err(ProviderError::Validation(
            "At least one day of operating hours must be provided".to_string(),
        ));
    }

    let mut seen = [false; 7];
    for input in hours {
        let day = input.day_of_week;
        if !(0..=6).contains(&day) {
            return Err(ProviderError::Validation(format!(
                "day_of_week must be between 0 (Sunday) and 6 (Saturday), got {day}"
            )));
        }
        if seen[day as usize] {
            return Err(ProviderError::Validation(format!(
                "Duplicate entry for day_of_week {day}"
            )));
        }
        seen[day as usize] = true;

        if input.is_closed {
            continue;
        }
        match (input.start_time, input.end_time) {
            (Some(start), Some(end)) => {
                if end <= start {
                    return Err(ProviderError::Validation(
                        "Operating hours must end after they start and may not span midnight"
                            .to_string(),
                    ));
                }
            }
            _ => {
                return Err(ProviderError::Validation(
                    "Both start_time and end_time are required unless the day is closed"
                        .to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Looks up a provider by id. Generic over the executor so the appointment
/// cell can run it inside its booking transaction.
pub async fn fetch_provider<'e, E>(
    executor: E,
    provider_id: Uuid,
) -> Result<Option<Provider>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Provider>(
        "SELECT id, user_id, healthcare_name, email, phone_number, slot_duration_minutes, \
         created_at, updated_at \
         FROM providers WHERE id = $1",
    )
    .bind(provider_id)
    .fetch_optional(executor)
    .await
}

/// Resolves the provider profile owned by an authenticated user, for the
/// `/provider/*` portal routes.
pub async fn find_provider_by_user<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Option<Provider>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Provider>(
        "SELECT id, user_id, healthcare_name, email, phone_number, slot_duration_minutes, \
         created_at, updated_at \
         FROM providers WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn open_day(day: i16, start: (u32, u32), end: (u32, u32)) -> OperatingHourInput {
        OperatingHourInput {
            day_of_week: day,
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0),
            is_closed: false,
        }
    }

    fn closed_day(day: i16) -> OperatingHourInput {
        OperatingHourInput {
            day_of_week: day,
            start_time: None,
            end_time: None,
            is_closed: true,
        }
    }

    #[test]
    fn accepts_a_normal_week() {
        let week: Vec<OperatingHourInput> = (1..=5)
            .map(|day| open_day(day, (9, 0), (17, 0)))
            .chain([closed_day(0), closed_day(6)])
            .collect();

        assert!(validate_hours(&week).is_ok());
    }

    #[test]
    fn rejects_empty_submission() {
        assert!(validate_hours(&[]).is_err());
    }

    #[test]
    fn rejects_out_of_range_day() {
        let err = validate_hours(&[open_day(7, (9, 0), (17, 0))]).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(msg) if msg.contains("day_of_week")));
    }

    #[test]
    fn rejects_duplicate_days() {
        let input = [open_day(2, (9, 0), (12, 0)), open_day(2, (13, 0), (17, 0))];
        let err = validate_hours(&input).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(msg) if msg.contains("Duplicate")));
    }

    #[test]
    fn rejects_open_day_missing_times() {
        let input = [OperatingHourInput {
            day_of_week: 3,
            start_time: NaiveTime::from_hms_opt(9, 0, 0),
            end_time: None,
            is_closed: false,
        }];
        assert!(validate_hours(&input).is_err());
    }

    #[test]
    fn rejects_hours_that_span_midnight() {
        // 22:00-02:00 would cross into the next day
        let err = validate_hours(&[open_day(5, (22, 0), (2, 0))]).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(msg) if msg.contains("midnight")));
    }

    #[test]
    fn closed_day_needs_no_times() {
        assert!(validate_hours(&[closed_day(0)]).is_ok());
    }
}

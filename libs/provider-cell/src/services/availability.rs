use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use futures::future::try_join_all;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use shared_database::AppState;
use shared_models::clock::Clock;

use crate::models::{DaySlots, OperatingHour, Provider, ProviderError, SlotInfo};
use crate::services::schedule;
use crate::services::slots::{generate_slots, weekday_index};

/// Longest slot-range query we will expand, in days. Two whole months is
/// plenty for any booking calendar widget.
pub const MAX_RANGE_DAYS: i64 = 62;

/// Read side of the booking engine: computes which slots a provider can still
/// be booked for on a given day or across a date range.
pub struct AvailabilityService {
    db: PgPool,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            clock: state.clock.clone(),
        }
    }

    /// All bookable slots for one provider on one calendar day.
    ///
    /// Closed days, days without an operating-hours row, and days that are
    /// fully booked all come back as an empty list rather than an error.
    pub async fn available_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<SlotInfo>, ProviderError> {
        let provider = self.fetch_provider(provider_id).await?;
        self.slots_for_day(&provider, date).await
    }

    /// Slot listings for every day in `[start_date, end_date]`, keyed by date.
    ///
    /// Days with no bookable slots are omitted from the map entirely, so a
    /// calendar can render exactly the keys it receives.
    pub async fn available_slots_for_range(
        &self,
        provider_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, DaySlots>, ProviderError> {
        if end_date < start_date {
            return Err(ProviderError::Validation(
                "end_date must be on or after start_date".to_string(),
            ));
        }
        let span_days = (end_date - start_date).num_days() + 1;
        if span_days > MAX_RANGE_DAYS {
            return Err(ProviderError::Validation(format!(
                "Date range cannot exceed {MAX_RANGE_DAYS} days"
            )));
        }

        let provider = self.fetch_provider(provider_id).await?;
        let dates: Vec<NaiveDate> = start_date.iter_days().take(span_days as usize).collect();
        let per_day =
            try_join_all(dates.iter().map(|date| self.slots_for_day(&provider, *date))).await?;

        let mut days = BTreeMap::new();
        for (date, slots) in dates.into_iter().zip(per_day) {
            if slots.is_empty() {
                continue;
            }
            days.insert(
                date,
                DaySlots {
                    date,
                    day_name: date.format("%A").to_string(),
                    formatted_date: date.format("%B %-d, %Y").to_string(),
                    total_slots: slots.len(),
                    slots,
                },
            );
        }
        Ok(days)
    }

    async fn slots_for_day(
        &self,
        provider: &Provider,
        date: NaiveDate,
    ) -> Result<Vec<SlotInfo>, ProviderError> {
        let day = weekday_index(date);
        let hours = self.fetch_operating_hours(provider.id, day).await?;
        let booked = self.fetch_booked_intervals(provider.id, date).await?;
        let breaks = self.fetch_breaks(provider.id, day).await?;

        Ok(assemble_day_slots(
            hours.as_ref(),
            provider.slot_duration_minutes,
            date,
            &booked,
            &breaks,
            self.clock.now(),
        ))
    }

    async fn fetch_provider(&self, provider_id: Uuid) -> Result<Provider, ProviderError> {
        schedule::fetch_provider(&self.db, provider_id)
            .await?
            .ok_or(ProviderError::NotFound)
    }

    async fn fetch_operating_hours(
        &self,
        provider_id: Uuid,
        day_of_week: i16,
    ) -> Result<Option<OperatingHour>, ProviderError> {
        let hours = sqlx::query_as::<_, OperatingHour>(
            "SELECT id, provider_id, day_of_week, start_time, end_time, is_closed \
             FROM operating_hours WHERE provider_id = $1 AND day_of_week = $2",
        )
        .bind(provider_id)
        .bind(day_of_week)
        .fetch_optional(&self.db)
        .await?;
        Ok(hours)
    }

    async fn fetch_booked_intervals(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, ProviderError> {
        let day_start = date.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);

        let rows: Vec<(DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT start_time, end_time FROM appointments \
             WHERE provider_id = $1 AND status != 'cancelled' \
             AND start_time >= $2 AND start_time < $3 \
             ORDER BY start_time",
        )
        .bind(provider_id)
        .bind(day_start)
        .bind(day_end)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn fetch_breaks(
        &self,
        provider_id: Uuid,
        day_of_week: i16,
    ) -> Result<Vec<(NaiveTime, NaiveTime)>, ProviderError> {
        let rows: Vec<(NaiveTime, NaiveTime)> = sqlx::query_as(
            "SELECT start_time, end_time FROM break_times \
             WHERE provider_id = $1 AND day_of_week = $2 \
             ORDER BY start_time",
        )
        .bind(provider_id)
        .bind(day_of_week)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

/// Turns one day's schedule data into the final bookable slot list.
///
/// A slot survives when it sits inside open operating hours, overlaps no
/// booked appointment and no break, and starts strictly after `now`. Hours
/// that would span midnight are treated as closed.
pub fn assemble_day_slots(
    hours: Option<&OperatingHour>,
    slot_duration_minutes: i32,
    date: NaiveDate,
    booked: &[(DateTime<Utc>, DateTime<Utc>)],
    breaks: &[(NaiveTime, NaiveTime)],
    now: DateTime<Utc>,
) -> Vec<SlotInfo> {
    let Some(hours) = hours else {
        return Vec::new();
    };
    if hours.is_closed {
        return Vec::new();
    }
    let (Some(open), Some(close)) = (hours.start_time, hours.end_time) else {
        return Vec::new();
    };
    if close <= open {
        warn!(
            provider_id = %hours.provider_id,
            day_of_week = hours.day_of_week,
            "operating hours end at or before they start, treating day as closed"
        );
        return Vec::new();
    }

    generate_slots(open, close, i64::from(slot_duration_minutes))
        .into_iter()
        .filter_map(|window| {
            let start_at = date.and_time(window.start).and_utc();
            let end_at = date.and_time(window.end).and_utc();

            let conflicts = booked
                .iter()
                .any(|(booked_start, booked_end)| start_at < *booked_end && end_at > *booked_start);
            let in_break = breaks
                .iter()
                .any(|(break_start, break_end)| window.start < *break_end && window.end > *break_start);
            let in_future = start_at > now;

            (!conflicts && !in_break && in_future).then(|| SlotInfo {
                start_time: window.start,
                end_time: window.end,
                formatted_time: format_slot_time(window.start),
                datetime: start_at,
            })
        })
        .collect()
}

/// 12-hour clock label shown to patients, e.g. "9:00 AM" or "2:30 PM".
pub fn format_slot_time(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use provider_cell::services::availability::MAX_RANGE_DAYS;
use shared_database::AppState;
use shared_models::clock::Clock;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentItem, AppointmentStatus,
    CalendarEntry, Page, Paginated, PatientSummary, ProviderAppointmentFilters, ProviderSummary,
    RangeAppointmentFilters, StatusCounts, StatusFilter,
};

const DETAIL_COLUMNS: &str = "a.id, a.appointment_number, a.user_id, a.provider_id, \
     a.start_time, a.end_time, a.status, a.notes, a.total_price, a.cancelled_at, \
     a.cancellation_reason, a.cancelled_by, a.created_at, a.updated_at, \
     u.name AS patient_name, u.email AS patient_email, \
     p.healthcare_name AS provider_name, p.email AS provider_email";

const DETAIL_JOINS: &str = "FROM appointments a \
     JOIN users u ON u.id = a.user_id \
     JOIN providers p ON p.id = a.provider_id";

/// Read side: filtered, paginated appointment listings plus the single-row
/// detail loads the transition endpoints respond with.
pub struct AppointmentQueryService {
    db: PgPool,
    clock: Arc<dyn Clock>,
}

/// Flat join row; split into the nested response shape after loading.
#[derive(Debug, sqlx::FromRow)]
struct AppointmentWithParties {
    id: Uuid,
    appointment_number: String,
    user_id: Uuid,
    provider_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: AppointmentStatus,
    notes: Option<String>,
    total_price: Decimal,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    cancelled_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    patient_name: String,
    patient_email: String,
    provider_name: String,
    provider_email: String,
}

impl AppointmentWithParties {
    fn into_details(self, items: Vec<AppointmentItem>) -> AppointmentDetails {
        AppointmentDetails {
            appointment: Appointment {
                id: self.id,
                appointment_number: self.appointment_number,
                user_id: self.user_id,
                provider_id: self.provider_id,
                start_time: self.start_time,
                end_time: self.end_time,
                status: self.status,
                notes: self.notes,
                total_price: self.total_price,
                cancelled_at: self.cancelled_at,
                cancellation_reason: self.cancellation_reason,
                cancelled_by: self.cancelled_by,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            patient: PatientSummary {
                id: self.user_id,
                name: self.patient_name,
                email: self.patient_email,
            },
            provider: ProviderSummary {
                id: self.provider_id,
                healthcare_name: self.provider_name,
                email: self.provider_email,
            },
            items,
        }
    }
}

impl AppointmentQueryService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            clock: state.clock.clone(),
        }
    }

    /// The provider dashboard list: status/date/search filters, newest
    /// start time first.
    pub async fn provider_appointments(
        &self,
        provider_id: Uuid,
        filters: &ProviderAppointmentFilters,
    ) -> Result<Paginated<AppointmentDetails>, AppointmentError> {
        let page = Page::from_query(filters.page, filters.per_page);
        let now = self.clock.now();

        let mut count_builder = QueryBuilder::new(
            "SELECT COUNT(*) FROM appointments a JOIN users u ON u.id = a.user_id WHERE ",
        );
        push_provider_filters(&mut count_builder, provider_id, filters, now);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db)
            .await?;

        let mut builder =
            QueryBuilder::new(format!("SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} WHERE "));
        push_provider_filters(&mut builder, provider_id, filters, now);
        builder
            .push(" ORDER BY a.start_time DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows: Vec<AppointmentWithParties> =
            builder.build_query_as().fetch_all(&self.db).await?;

        let details = self.attach_items(rows).await?;
        Ok(Paginated::new(details, page, total as u64))
    }

    /// Global listing for back-office use.
    pub async fn all_appointments(
        &self,
        filters: &RangeAppointmentFilters,
    ) -> Result<Paginated<AppointmentDetails>, AppointmentError> {
        self.range_list(None, filters).await
    }

    /// One patient's bookings.
    pub async fn user_appointments(
        &self,
        user_id: Uuid,
        filters: &RangeAppointmentFilters,
    ) -> Result<Paginated<AppointmentDetails>, AppointmentError> {
        self.range_list(Some(user_id), filters).await
    }

    async fn range_list(
        &self,
        user_scope: Option<Uuid>,
        filters: &RangeAppointmentFilters,
    ) -> Result<Paginated<AppointmentDetails>, AppointmentError> {
        let page = Page::from_query(filters.page, filters.per_page);
        let now = self.clock.now();

        let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM appointments a WHERE TRUE");
        push_range_filters(&mut count_builder, user_scope, filters, now);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db)
            .await?;

        let mut builder =
            QueryBuilder::new(format!("SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} WHERE TRUE"));
        push_range_filters(&mut builder, user_scope, filters, now);
        builder
            .push(" ORDER BY a.start_time DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows: Vec<AppointmentWithParties> =
            builder.build_query_as().fetch_all(&self.db).await?;

        let details = self.attach_items(rows).await?;
        Ok(Paginated::new(details, page, total as u64))
    }

    /// Fully-loaded single appointment, or `NotFound`.
    pub async fn appointment_details(
        &self,
        appointment_id: Uuid,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let row: Option<AppointmentWithParties> =
            sqlx::query_as(&format!("SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} WHERE a.id = $1"))
                .bind(appointment_id)
                .fetch_optional(&self.db)
                .await?;
        let row = row.ok_or(AppointmentError::NotFound)?;

        self.attach_items(vec![row])
            .await?
            .pop()
            .ok_or(AppointmentError::NotFound)
    }

    /// Per-status totals for the provider dashboard header, plus the
    /// derived today/upcoming windows matching the pseudo-status filters.
    pub async fn provider_status_counts(
        &self,
        provider_id: Uuid,
    ) -> Result<StatusCounts, AppointmentError> {
        let rows: Vec<(AppointmentStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM appointments WHERE provider_id = $1 GROUP BY status",
        )
        .bind(provider_id)
        .fetch_all(&self.db)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match status {
                AppointmentStatus::Pending => counts.pending = count,
                AppointmentStatus::Confirmed => counts.confirmed = count,
                AppointmentStatus::Completed => counts.completed = count,
                AppointmentStatus::Cancelled => counts.cancelled = count,
                AppointmentStatus::NoShow => counts.no_show = count,
            }
            counts.total += count;
        }

        let now = self.clock.now();
        let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);
        let (today, upcoming): (i64, i64) = sqlx::query_as(
            "SELECT \
             COUNT(*) FILTER (WHERE start_time >= $2 AND start_time < $3), \
             COUNT(*) FILTER (WHERE start_time >= $4) \
             FROM appointments WHERE provider_id = $1",
        )
        .bind(provider_id)
        .bind(day_start)
        .bind(day_end)
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        counts.today = today;
        counts.upcoming = upcoming;

        Ok(counts)
    }

    /// Chronological appointment list for the provider's calendar, bounded
    /// to the same maximum span as the slot-range endpoint.
    pub async fn provider_calendar(
        &self,
        provider_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<CalendarEntry>, AppointmentError> {
        if end_date < start_date {
            return Err(AppointmentError::Validation(
                "end_date must be on or after start_date".to_string(),
            ));
        }
        if (end_date - start_date).num_days() + 1 > MAX_RANGE_DAYS {
            return Err(AppointmentError::Validation(format!(
                "Date range cannot exceed {MAX_RANGE_DAYS} days"
            )));
        }

        let range_start = start_date.and_time(NaiveTime::MIN).and_utc();
        let range_end = (end_date + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();

        let entries = sqlx::query_as::<_, CalendarEntry>(
            "SELECT a.id, a.appointment_number, a.start_time, a.end_time, a.status, \
             u.name AS patient_name \
             FROM appointments a JOIN users u ON u.id = a.user_id \
             WHERE a.provider_id = $1 AND a.status != 'cancelled' \
             AND a.start_time >= $2 AND a.start_time < $3 \
             ORDER BY a.start_time",
        )
        .bind(provider_id)
        .bind(range_start)
        .bind(range_end)
        .fetch_all(&self.db)
        .await?;
        Ok(entries)
    }

    /// Batch-loads line items for a page of rows with one query.
    async fn attach_items(
        &self,
        rows: Vec<AppointmentWithParties>,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut by_appointment: HashMap<Uuid, Vec<AppointmentItem>> = HashMap::new();

        if !ids.is_empty() {
            let items: Vec<AppointmentItem> = sqlx::query_as(
                "SELECT id, appointment_id, bookable_kind, bookable_id, name, price_at_booking \
                 FROM appointment_items WHERE appointment_id = ANY($1) ORDER BY name",
            )
            .bind(&ids)
            .fetch_all(&self.db)
            .await?;
            for item in items {
                by_appointment.entry(item.appointment_id).or_default().push(item);
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_appointment.remove(&row.id).unwrap_or_default();
                row.into_details(items)
            })
            .collect())
    }
}

fn push_provider_filters(
    builder: &mut QueryBuilder<Postgres>,
    provider_id: Uuid,
    filters: &ProviderAppointmentFilters,
    now: DateTime<Utc>,
) {
    builder.push("a.provider_id = ");
    builder.push_bind(provider_id);

    if let Some(status) = filters.status {
        push_status_filter(builder, status, now);
    }
    if let Some(date) = filters.date {
        let day_start = date.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);
        builder
            .push(" AND a.start_time >= ")
            .push_bind(day_start)
            .push(" AND a.start_time < ")
            .push_bind(day_end);
    }
    if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (a.appointment_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (\
                SELECT 1 FROM appointment_items i \
                WHERE i.appointment_id = a.id AND i.name ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

fn push_range_filters(
    builder: &mut QueryBuilder<Postgres>,
    user_scope: Option<Uuid>,
    filters: &RangeAppointmentFilters,
    now: DateTime<Utc>,
) {
    if let Some(user_id) = user_scope {
        builder.push(" AND a.user_id = ").push_bind(user_id);
    }
    if let Some(status) = filters.status {
        push_status_filter(builder, status, now);
    }
    if let Some(from) = filters.from_date {
        builder
            .push(" AND a.start_time >= ")
            .push_bind(from.and_time(NaiveTime::MIN).and_utc());
    }
    if let Some(to) = filters.to_date {
        // Inclusive upper bound: everything before the next midnight
        builder
            .push(" AND a.start_time < ")
            .push_bind((to + Duration::days(1)).and_time(NaiveTime::MIN).and_utc());
    }
}

fn push_status_filter(
    builder: &mut QueryBuilder<Postgres>,
    status: StatusFilter,
    now: DateTime<Utc>,
) {
    match status {
        StatusFilter::Is(status) => {
            builder.push(" AND a.status = ").push_bind(status);
        }
        StatusFilter::Today => {
            let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
            let day_end = day_start + Duration::days(1);
            builder
                .push(" AND a.start_time >= ")
                .push_bind(day_start)
                .push(" AND a.start_time < ")
                .push_bind(day_end);
        }
        StatusFilter::Upcoming => {
            builder.push(" AND a.start_time >= ").push_bind(now);
        }
        StatusFilter::History => {
            builder.push(" AND a.status IN ('completed', 'no_show')");
        }
    }
}

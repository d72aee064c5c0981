// libs/provider-cell/tests/live_schedule_test.rs
//
// Schedule management and availability against a real Postgres instance.
// Gated behind LIVE_DB_TESTS=true; each test seeds its own provider.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use provider_cell::models::OperatingHourInput;
use provider_cell::services::{AvailabilityService, ScheduleService};
use shared_database::{connect_pool, run_migrations, AppState};
use shared_models::clock::FixedClock;
use shared_utils::notify::NoopNotifier;
use shared_utils::test_utils::TestConfig;

fn live_tests_enabled() -> bool {
    std::env::var("LIVE_DB_TESTS").unwrap_or_default() == "true"
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn open_day(day_of_week: i16, start: NaiveTime, end: NaiveTime) -> OperatingHourInput {
    OperatingHourInput {
        day_of_week,
        start_time: Some(start),
        end_time: Some(end),
        is_closed: false,
    }
}

struct Harness {
    state: Arc<AppState>,
    provider_id: Uuid,
}

impl Harness {
    /// Connects, migrates, and seeds a bare provider. The clock is pinned
    /// to 2030-06-01 so slots on the test dates always count as future.
    async fn setup() -> Self {
        let config = TestConfig::default().to_app_config();
        let pool = connect_pool(&config)
            .await
            .expect("live tests need a reachable Postgres (see TestConfig::default)");
        run_migrations(&pool).await.expect("migrations failed");

        let pinned = Utc.with_ymd_and_hms(2030, 6, 1, 8, 0, 0).unwrap();
        let state = Arc::new(
            AppState::new(config, pool.clone(), Arc::new(NoopNotifier))
                .with_clock(Arc::new(FixedClock(pinned))),
        );

        let tag = Uuid::new_v4().simple().to_string();
        let owner_id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, 'Owner', $2)")
            .bind(owner_id)
            .bind(format!("owner-{tag}@example.com"))
            .execute(&pool)
            .await
            .expect("seed user");

        let provider_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO providers (id, user_id, healthcare_name, email, slot_duration_minutes) \
             VALUES ($1, $2, $3, $4, 30)",
        )
        .bind(provider_id)
        .bind(owner_id)
        .bind(format!("Clinic {tag}"))
        .bind(format!("clinic-{tag}@example.com"))
        .execute(&pool)
        .await
        .expect("seed provider");

        Self { state, provider_id }
    }

    fn schedule(&self) -> ScheduleService {
        ScheduleService::new(&self.state)
    }

    fn availability(&self) -> AvailabilityService {
        AvailabilityService::new(&self.state)
    }
}

#[tokio::test]
async fn upserting_hours_keeps_one_row_per_weekday() {
    if !live_tests_enabled() {
        return;
    }
    let h = Harness::setup().await;
    let service = h.schedule();

    service
        .update_operating_hours(h.provider_id, vec![open_day(1, time(9, 0), time(17, 0))])
        .await
        .expect("initial hours should save");

    // Same weekday again with different times: replaces, never duplicates
    let hours = service
        .update_operating_hours(h.provider_id, vec![open_day(1, time(10, 0), time(16, 0))])
        .await
        .expect("updated hours should save");

    let mondays: Vec<_> = hours.iter().filter(|row| row.day_of_week == 1).collect();
    assert_eq!(mondays.len(), 1);
    assert_eq!(mondays[0].start_time, Some(time(10, 0)));
    assert_eq!(mondays[0].end_time, Some(time(16, 0)));
}

#[tokio::test]
async fn closing_a_day_persists_without_times() {
    if !live_tests_enabled() {
        return;
    }
    let h = Harness::setup().await;
    let service = h.schedule();

    let hours = service
        .update_operating_hours(
            h.provider_id,
            vec![
                open_day(1, time(9, 0), time(17, 0)),
                OperatingHourInput {
                    day_of_week: 0,
                    start_time: None,
                    end_time: None,
                    is_closed: true,
                },
            ],
        )
        .await
        .expect("hours with a closed day should save");

    let sunday = hours.iter().find(|row| row.day_of_week == 0).unwrap();
    assert!(sunday.is_closed);
    assert_eq!(sunday.start_time, None);
}

#[tokio::test]
async fn schedule_info_reflects_saved_hours() {
    if !live_tests_enabled() {
        return;
    }
    let h = Harness::setup().await;

    h.schedule()
        .update_operating_hours(h.provider_id, vec![open_day(2, time(8, 0), time(12, 0))])
        .await
        .expect("hours should save");

    let info = h
        .schedule()
        .schedule_info(h.provider_id)
        .await
        .expect("schedule info should load");
    assert_eq!(info.provider_id, h.provider_id);
    assert_eq!(info.slot_duration_minutes, 30);
    assert_eq!(info.operating_hours.len(), 1);
    assert_eq!(info.operating_hours[0].day_of_week, 2);
}

#[tokio::test]
async fn availability_excludes_bookings_and_breaks() {
    if !live_tests_enabled() {
        return;
    }
    let h = Harness::setup().await;
    let monday = NaiveDate::from_ymd_opt(2030, 6, 3).unwrap();

    h.schedule()
        .update_operating_hours(h.provider_id, vec![open_day(1, time(9, 0), time(17, 0))])
        .await
        .expect("hours should save");

    sqlx::query(
        "INSERT INTO break_times (provider_id, name, day_of_week, start_time, end_time) \
         VALUES ($1, 'Lunch Break', 1, '12:00', '13:00')",
    )
    .bind(h.provider_id)
    .execute(&h.state.db)
    .await
    .expect("seed break");

    let patient_id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, 'Patient', $2)")
        .bind(patient_id)
        .bind(format!("patient-{}@example.com", Uuid::new_v4().simple()))
        .execute(&h.state.db)
        .await
        .expect("seed patient");
    sqlx::query(
        "INSERT INTO appointments \
         (appointment_number, user_id, provider_id, start_time, end_time, status) \
         VALUES ($1, $2, $3, $4, $5, 'confirmed')",
    )
    .bind(format!("SEED-{}", Uuid::new_v4().simple()))
    .bind(patient_id)
    .bind(h.provider_id)
    .bind(monday.and_time(time(10, 0)).and_utc())
    .bind(monday.and_time(time(10, 30)).and_utc())
    .execute(&h.state.db)
    .await
    .expect("seed appointment");

    let slots = h
        .availability()
        .available_slots(h.provider_id, monday)
        .await
        .expect("slots should load");

    // 16 base slots minus the booking and the two lunch slots
    assert_eq!(slots.len(), 13);
    let starts: Vec<NaiveTime> = slots.iter().map(|s| s.start_time).collect();
    assert!(!starts.contains(&time(10, 0)));
    assert!(starts.contains(&time(10, 30)));
    assert!(!starts.contains(&time(12, 0)));
    assert!(!starts.contains(&time(12, 30)));
    assert!(starts.contains(&time(13, 0)));
}

#[tokio::test]
async fn range_listing_omits_closed_days() {
    if !live_tests_enabled() {
        return;
    }
    let h = Harness::setup().await;

    // Monday only; the rest of the week has no rows
    h.schedule()
        .update_operating_hours(h.provider_id, vec![open_day(1, time(9, 0), time(11, 0))])
        .await
        .expect("hours should save");

    let start = NaiveDate::from_ymd_opt(2030, 6, 2).unwrap();
    let end = NaiveDate::from_ymd_opt(2030, 6, 8).unwrap();
    let days = h
        .availability()
        .available_slots_for_range(h.provider_id, start, end)
        .await
        .expect("range should load");

    let monday = NaiveDate::from_ymd_opt(2030, 6, 3).unwrap();
    assert_eq!(days.len(), 1, "only the open Monday should appear");
    let day = days.get(&monday).expect("Monday entry");
    assert_eq!(day.total_slots, 4);
    assert_eq!(day.day_name, "Monday");
}

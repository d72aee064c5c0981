use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use provider_cell::models::OperatingHour;
use provider_cell::services::availability::{assemble_day_slots, format_slot_time};

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

// 2025-07-15 is a Tuesday
fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    day().and_time(time(h, m)).and_utc()
}

fn business_hours() -> OperatingHour {
    OperatingHour {
        id: Uuid::new_v4(),
        provider_id: Uuid::new_v4(),
        day_of_week: 2,
        start_time: Some(time(9, 0)),
        end_time: Some(time(17, 0)),
        is_closed: false,
    }
}

// Anchor "now" to midnight so every slot on the day counts as future
fn start_of_day() -> DateTime<Utc> {
    at(0, 0)
}

#[test]
fn open_day_with_no_bookings_yields_every_slot() {
    let hours = business_hours();
    let slots = assemble_day_slots(Some(&hours), 30, day(), &[], &[], start_of_day());

    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0].start_time, time(9, 0));
    assert_eq!(slots[0].formatted_time, "9:00 AM");
    assert_eq!(slots[0].datetime, at(9, 0));
    assert_eq!(slots[15].start_time, time(16, 30));
}

#[test]
fn closed_day_yields_nothing() {
    let hours = OperatingHour {
        is_closed: true,
        ..business_hours()
    };
    let slots = assemble_day_slots(Some(&hours), 30, day(), &[], &[], start_of_day());

    assert!(slots.is_empty());
}

#[test]
fn day_without_schedule_row_yields_nothing() {
    let slots = assemble_day_slots(None, 30, day(), &[], &[], start_of_day());

    assert!(slots.is_empty());
}

#[test]
fn open_day_with_unset_times_yields_nothing() {
    let hours = OperatingHour {
        start_time: None,
        ..business_hours()
    };
    let slots = assemble_day_slots(Some(&hours), 30, day(), &[], &[], start_of_day());

    assert!(slots.is_empty());
}

#[test]
fn hours_spanning_midnight_are_treated_as_closed() {
    let hours = OperatingHour {
        start_time: Some(time(22, 0)),
        end_time: Some(time(2, 0)),
        ..business_hours()
    };
    let slots = assemble_day_slots(Some(&hours), 30, day(), &[], &[], start_of_day());

    assert!(slots.is_empty());
}

#[test]
fn booked_appointment_removes_overlapping_slots() {
    let hours = business_hours();
    let booked = [(at(10, 0), at(11, 0))];
    let slots = assemble_day_slots(Some(&hours), 30, day(), &booked, &[], start_of_day());

    assert_eq!(slots.len(), 14);
    let starts: Vec<NaiveTime> = slots.iter().map(|s| s.start_time).collect();
    assert!(!starts.contains(&time(10, 0)));
    assert!(!starts.contains(&time(10, 30)));
    assert!(starts.contains(&time(9, 30)));
    assert!(starts.contains(&time(11, 0)));
}

#[test]
fn boundary_touching_appointment_does_not_conflict() {
    let hours = business_hours();
    let booked = [(at(12, 0), at(13, 0))];
    let slots = assemble_day_slots(Some(&hours), 30, day(), &booked, &[], start_of_day());

    let starts: Vec<NaiveTime> = slots.iter().map(|s| s.start_time).collect();
    // The 11:30 slot ends exactly where the booking starts and the 13:00
    // slot starts exactly where it ends
    assert!(starts.contains(&time(11, 30)));
    assert!(starts.contains(&time(13, 0)));
    assert!(!starts.contains(&time(12, 0)));
    assert!(!starts.contains(&time(12, 30)));
}

#[test]
fn booking_on_another_day_does_not_conflict() {
    let hours = business_hours();
    let next_day = NaiveDate::from_ymd_opt(2025, 7, 16).unwrap();
    let booked = [(
        next_day.and_time(time(10, 0)).and_utc(),
        next_day.and_time(time(11, 0)).and_utc(),
    )];
    let slots = assemble_day_slots(Some(&hours), 30, day(), &booked, &[], start_of_day());

    assert_eq!(slots.len(), 16);
}

#[test]
fn break_removes_overlapping_slots() {
    let hours = business_hours();
    let breaks = [(time(12, 0), time(13, 0))];
    let slots = assemble_day_slots(Some(&hours), 30, day(), &[], &breaks, start_of_day());

    assert_eq!(slots.len(), 14);
    let starts: Vec<NaiveTime> = slots.iter().map(|s| s.start_time).collect();
    assert!(!starts.contains(&time(12, 0)));
    assert!(!starts.contains(&time(12, 30)));
    assert!(starts.contains(&time(11, 30)));
    assert!(starts.contains(&time(13, 0)));
}

#[test]
fn slots_must_start_strictly_after_now() {
    let hours = business_hours();
    let slots = assemble_day_slots(Some(&hours), 30, day(), &[], &[], at(12, 0));

    // The 12:00 slot starts exactly at "now" and is excluded
    assert_eq!(slots[0].start_time, time(12, 30));
    assert_eq!(slots.len(), 9);
}

#[test]
fn mid_slot_now_excludes_the_running_slot() {
    let hours = business_hours();
    let slots = assemble_day_slots(Some(&hours), 30, day(), &[], &[], at(12, 15));

    assert_eq!(slots[0].start_time, time(12, 30));
}

#[test]
fn slot_times_render_in_twelve_hour_clock() {
    assert_eq!(format_slot_time(time(9, 0)), "9:00 AM");
    assert_eq!(format_slot_time(time(14, 30)), "2:30 PM");
    assert_eq!(format_slot_time(time(0, 0)), "12:00 AM");
    assert_eq!(format_slot_time(time(12, 0)), "12:00 PM");
}

#[test]
fn repeated_queries_with_unchanged_inputs_agree() {
    let hours = business_hours();
    let booked = [(at(10, 0), at(10, 30))];
    let breaks = [(time(12, 0), time(13, 0))];

    let first = assemble_day_slots(Some(&hours), 30, day(), &booked, &breaks, start_of_day());
    let second = assemble_day_slots(Some(&hours), 30, day(), &booked, &breaks, start_of_day());

    assert_eq!(first, second);
}

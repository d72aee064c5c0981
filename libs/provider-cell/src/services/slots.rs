use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

/// A single candidate window inside a provider's operating hours.
///
/// Windows are wall-clock only. The availability service anchors them to a
/// concrete date before checking them against booked appointments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Day-of-week index used throughout the schedule tables: 0 = Sunday through
/// 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> i16 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

/// Cuts the window `[start_time, end_time)` into consecutive slots of
/// `slot_duration_minutes` each.
///
/// Slots are emitted only while they fit entirely inside the window, so a
/// trailing remainder shorter than one duration is dropped rather than
/// shortened. An inverted or empty window yields no slots at all.
pub fn generate_slots(
    start_time: NaiveTime,
    end_time: NaiveTime,
    slot_duration_minutes: i64,
) -> Vec<SlotWindow> {
    let mut slots = Vec::new();
    if slot_duration_minutes <= 0 || end_time <= start_time {
        return slots;
    }

    let step = Duration::minutes(slot_duration_minutes);
    let mut current = start_time;
    loop {
        let (candidate_end, wrapped) = current.overflowing_add_signed(step);
        // wrapped != 0 means the addition rolled past midnight
        if wrapped != 0 || candidate_end > end_time {
            break;
        }
        slots.push(SlotWindow {
            start: current,
            end: candidate_end,
        });
        current = candidate_end;
    }
    slots
}

// libs/appointment-cell/tests/filters_test.rs
//
// Query-side plumbing: status filter parsing, pagination clamps, and the
// appointment number format.

use std::str::FromStr;

use appointment_cell::models::{
    AppointmentStatus, Page, Paginated, StatusFilter, DEFAULT_PER_PAGE, MAX_PER_PAGE,
};
use appointment_cell::services::booking::appointment_number_for;
use chrono::{TimeZone, Utc};
use regex::Regex;

// ==============================================================================
// STATUS FILTER PARSING
// ==============================================================================

#[test]
fn parses_every_literal_status() {
    let cases = [
        ("pending", AppointmentStatus::Pending),
        ("confirmed", AppointmentStatus::Confirmed),
        ("completed", AppointmentStatus::Completed),
        ("cancelled", AppointmentStatus::Cancelled),
        ("no_show", AppointmentStatus::NoShow),
    ];
    for (input, expected) in cases {
        assert_eq!(
            StatusFilter::from_str(input),
            Ok(StatusFilter::Is(expected)),
            "failed to parse {input}"
        );
    }
}

#[test]
fn parses_derived_filters() {
    assert_eq!(StatusFilter::from_str("today"), Ok(StatusFilter::Today));
    assert_eq!(StatusFilter::from_str("upcoming"), Ok(StatusFilter::Upcoming));
    assert_eq!(StatusFilter::from_str("history"), Ok(StatusFilter::History));
}

#[test]
fn rejects_unknown_filters_with_the_offending_value() {
    let err = StatusFilter::from_str("archived").unwrap_err();
    assert_eq!(err, "Unknown status filter: archived");
}

#[test]
fn filter_parsing_is_case_sensitive() {
    assert!(StatusFilter::from_str("Today").is_err());
    assert!(StatusFilter::from_str("PENDING").is_err());
}

// ==============================================================================
// PAGINATION
// ==============================================================================

#[test]
fn page_defaults_when_nothing_is_supplied() {
    let page = Page::from_query(None, None);
    assert_eq!(page.number, 1);
    assert_eq!(page.size, DEFAULT_PER_PAGE);
    assert_eq!(page.offset(), 0);
    assert_eq!(page.limit(), i64::from(DEFAULT_PER_PAGE));
}

#[test]
fn page_zero_is_clamped_to_one() {
    let page = Page::from_query(Some(0), Some(0));
    assert_eq!(page.number, 1);
    assert_eq!(page.size, 1);
}

#[test]
fn per_page_is_capped() {
    let page = Page::from_query(Some(1), Some(5_000));
    assert_eq!(page.size, MAX_PER_PAGE);
}

#[test]
fn offset_skips_earlier_pages() {
    let page = Page::from_query(Some(3), Some(25));
    assert_eq!(page.offset(), 50);
    assert_eq!(page.limit(), 25);
}

#[test]
fn paginated_rounds_total_pages_up() {
    let page = Page::from_query(Some(1), Some(10));
    let result = Paginated::new(vec![1, 2, 3], page, 31);
    assert_eq!(result.total, 31);
    assert_eq!(result.total_pages, 4);
    assert_eq!(result.per_page, 10);
    assert_eq!(result.data.len(), 3);
}

#[test]
fn paginated_exact_multiple_does_not_add_a_page() {
    let page = Page::from_query(Some(2), Some(10));
    let result = Paginated::new(Vec::<i32>::new(), page, 30);
    assert_eq!(result.total_pages, 3);
    assert_eq!(result.page, 2);
}

#[test]
fn empty_result_set_has_zero_pages() {
    let page = Page::from_query(None, None);
    let result = Paginated::new(Vec::<i32>::new(), page, 0);
    assert_eq!(result.total, 0);
    assert_eq!(result.total_pages, 0);
}

// ==============================================================================
// APPOINTMENT NUMBER FORMAT
// ==============================================================================

#[test]
fn appointment_numbers_match_the_published_shape() {
    let pattern = Regex::new(r"^APT-\d{8}-\d{4}$").unwrap();
    let now = Utc.with_ymd_and_hms(2025, 11, 3, 8, 30, 0).unwrap();
    for sequence in [0, 7, 482, 9_999] {
        let number = appointment_number_for(now, sequence);
        assert!(pattern.is_match(&number), "{number} has the wrong shape");
    }
}

#[test]
fn appointment_number_embeds_the_booking_date() {
    let now = Utc.with_ymd_and_hms(2025, 1, 9, 23, 59, 0).unwrap();
    assert_eq!(appointment_number_for(now, 42), "APT-20250109-0042");
}

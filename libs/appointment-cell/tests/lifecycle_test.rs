// libs/appointment-cell/tests/lifecycle_test.rs
//
// Status machine coverage: every allowed transition, every forbidden one,
// and the terminal-state rules.

use appointment_cell::models::{AppointmentError, AppointmentStatus};
use appointment_cell::services::lifecycle::{valid_transitions, validate_transition};
use assert_matches::assert_matches;

use AppointmentStatus::*;

const ALL_STATUSES: [AppointmentStatus; 5] = [Pending, Confirmed, Completed, Cancelled, NoShow];

#[test]
fn pending_can_be_confirmed_or_cancelled() {
    assert_eq!(valid_transitions(Pending), &[Confirmed, Cancelled]);
}

#[test]
fn confirmed_can_complete_cancel_or_no_show() {
    assert_eq!(valid_transitions(Confirmed), &[Completed, Cancelled, NoShow]);
}

#[test]
fn terminal_statuses_have_no_exits() {
    for status in [Completed, Cancelled, NoShow] {
        assert!(
            valid_transitions(status).is_empty(),
            "{status} should not allow any further transition"
        );
    }
}

#[test]
fn is_terminal_matches_the_transition_table() {
    for status in ALL_STATUSES {
        assert_eq!(
            status.is_terminal(),
            valid_transitions(status).is_empty(),
            "is_terminal disagrees with the transition table for {status}"
        );
    }
}

#[test]
fn validate_transition_accepts_every_tabled_pair() {
    for from in ALL_STATUSES {
        for &to in valid_transitions(from) {
            assert!(
                validate_transition(from, to).is_ok(),
                "{from} -> {to} should be allowed"
            );
        }
    }
}

#[test]
fn validate_transition_rejects_every_untabled_pair() {
    for from in ALL_STATUSES {
        for to in ALL_STATUSES {
            if valid_transitions(from).contains(&to) {
                continue;
            }
            let err = validate_transition(from, to)
                .expect_err(&format!("{from} -> {to} should be rejected"));
            assert_matches!(
                err,
                AppointmentError::InvalidTransition(f, t) if f == from && t == to
            );
        }
    }
}

#[test]
fn self_transitions_are_never_allowed() {
    for status in ALL_STATUSES {
        assert!(validate_transition(status, status).is_err());
    }
}

#[test]
fn cancelling_a_completed_appointment_is_rejected() {
    let err = validate_transition(Completed, Cancelled).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot change appointment status from completed to cancelled"
    );
}

#[test]
fn no_show_requires_a_confirmed_appointment() {
    assert!(validate_transition(Confirmed, NoShow).is_ok());
    assert!(validate_transition(Pending, NoShow).is_err());
}

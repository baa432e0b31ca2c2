use super::*;
use crate::fixtures::at;

fn settings(duration: u32, visible: bool) -> TimerSettings {
    TimerSettings {
        duration,
        enabled: duration > 0,
        start_time: at("2024-03-01T10:00:00Z"),
        visible,
    }
}

#[test]
fn elapsed_duration_reveals() {
    let phase = evaluate(&settings(10, false), at("2024-03-01T10:11:00Z"));
    assert_eq!(phase, TimerPhase::Revealed);
}

#[test]
fn running_duration_counts_down_from_start_time() {
    let phase = evaluate(&settings(10, false), at("2024-03-01T10:09:00Z"));
    assert_eq!(phase, TimerPhase::Counting { remaining_secs: 60 });
}

#[test]
fn remaining_seconds_round_up() {
    let phase = evaluate(&settings(1, false), at("2024-03-01T10:00:59.500Z"));
    assert_eq!(phase, TimerPhase::Counting { remaining_secs: 1 });
    let phase = evaluate(&settings(1, false), at("2024-03-01T10:01:00Z"));
    assert_eq!(phase, TimerPhase::Revealed);
}

#[test]
fn zero_duration_is_revealed_without_a_write() {
    let mut gate = TimerGate::new();
    let step = gate.observe(&settings(0, true), at("2024-03-01T10:00:00Z"));
    assert_eq!(step.phase, TimerPhase::Revealed);
    assert!(!step.persist_reveal);
}

#[test]
fn persisted_visible_flag_reveals_before_deadline() {
    let mut gate = TimerGate::new();
    let step = gate.observe(&settings(10, true), at("2024-03-01T10:01:00Z"));
    assert_eq!(step.phase, TimerPhase::Revealed);
    assert!(!step.persist_reveal, "another client already wrote the flag");
}

#[test]
fn expiry_requests_a_single_reveal_write() {
    let mut gate = TimerGate::new();
    let counting = gate.observe(&settings(10, false), at("2024-03-01T10:05:00Z"));
    assert_eq!(counting.phase, TimerPhase::Counting { remaining_secs: 300 });
    assert!(!counting.persist_reveal);

    let expired = gate.observe(&settings(10, false), at("2024-03-01T10:10:00Z"));
    assert!(expired.phase.is_revealed());
    assert!(expired.persist_reveal);

    let again = gate.observe(&settings(10, false), at("2024-03-01T10:10:01Z"));
    assert!(again.phase.is_revealed());
    assert!(!again.persist_reveal);
}

#[test]
fn revealed_gate_never_returns_to_counting() {
    let mut gate = TimerGate::new();
    gate.observe(&settings(10, true), at("2024-03-01T10:01:00Z"));
    // An older document still says hidden.
    let step = gate.observe(&settings(10, false), at("2024-03-01T10:02:00Z"));
    assert_eq!(step.phase, TimerPhase::Revealed);
    assert!(gate.is_revealed());
}

#[test]
fn skewed_clients_converge_on_the_shared_deadline() {
    let shared = settings(5, false);
    let slow = evaluate(&shared, at("2024-03-01T10:04:58Z"));
    let fast = evaluate(&shared, at("2024-03-01T10:05:02Z"));
    assert_eq!(slow, TimerPhase::Counting { remaining_secs: 2 });
    assert_eq!(fast, TimerPhase::Revealed);
    assert_eq!(
        evaluate(&shared, at("2024-03-01T10:05:03Z")),
        evaluate(&shared, at("2024-03-01T10:06:00Z"))
    );
}

#[test]
fn countdown_text_is_minutes_and_padded_seconds() {
    assert_eq!(format_countdown(600), "10:00");
    assert_eq!(format_countdown(61), "1:01");
    assert_eq!(format_countdown(9), "0:09");
    assert_eq!(format_countdown(-3), "0:00");
}

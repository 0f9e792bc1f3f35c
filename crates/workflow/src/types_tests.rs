use super::*;

#[test]
fn status_round_trips_through_its_string_form() {
    for status in [Status::Queued, Status::Running, Status::Waiting, Status::Paused, Status::Complete, Status::Errored, Status::Terminated] {
        assert_eq!(Status::parse(status.as_str()).unwrap(), status);
    }
}

#[test]
fn unknown_status_string_is_rejected() {
    assert!(Status::parse("bogus").is_err());
}

#[test]
fn is_live_matches_the_pausable_running_states() {
    assert!(Status::Running.is_live());
    assert!(Status::Paused.is_live());
    assert!(!Status::Complete.is_live());
    assert!(!Status::Errored.is_live());
    assert!(!Status::Terminated.is_live());
}

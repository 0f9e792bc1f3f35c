use super::*;

#[test]
fn fake_clock_advances_by_exact_duration() {
    let clock = FakeClock::new();
    let before = clock.epoch_ms();
    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.epoch_ms(), before + 5000);
}

#[test]
fn system_clock_is_monotonic_non_decreasing() {
    let clock = SystemClock;
    let a = clock.epoch_ms();
    let b = clock.epoch_ms();
    assert!(b >= a);
}

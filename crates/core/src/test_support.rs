//! Test builders and helpers shared by other crates' test suites.

use crate::clock::FakeClock;

/// Build a [`FakeClock`] pinned to a fixed epoch, for deterministic tests.
pub fn fixed_clock(epoch_ms: i64) -> FakeClock {
    let clock = FakeClock::new();
    clock.set_epoch_ms(epoch_ms);
    clock
}

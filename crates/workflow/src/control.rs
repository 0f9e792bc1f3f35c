//! Per-instance pause/terminate signaling (spec §4.6 "Pause/resume").
//!
//! The step loop checks this before every step: `pause()` sets a flag the
//! loop awaits on before starting the next step; `resume()` releases it.
//! `terminate()` sets an abort flag checked the same way, ahead of pause.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Default)]
pub struct InstanceControl {
    paused: AtomicBool,
    aborted: AtomicBool,
    resume_notify: Notify,
}

impl InstanceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.resume_notify.notify_waiters();
    }

    pub fn terminate(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.resume_notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Blocks while paused; returns immediately once resumed or terminated.
    pub async fn wait_if_paused(&self) {
        loop {
            if self.aborted.load(Ordering::SeqCst) || !self.paused.load(Ordering::SeqCst) {
                return;
            }
            // Register interest before re-checking so a resume()/terminate()
            // that lands between the check above and this line isn't missed.
            let notified = self.resume_notify.notified();
            if self.aborted.load(Ordering::SeqCst) || !self.paused.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;

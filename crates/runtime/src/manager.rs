//! `GenerationManager` (spec §4.8): owns one active generation plus a set
//! of draining generations, and hands each request to the active one.

use std::sync::Arc;

use parking_lot::Mutex;

use forge_core::Clock;

use crate::error::RuntimeError;
use crate::generation::{drain_until_stopped, Generation, RequestGuard};

pub const DEFAULT_GRACE_PERIOD_MS: u64 = 30_000;

pub struct GenerationManager<C: Clock> {
    clock: C,
    grace_period_ms: u64,
    active: Mutex<Option<Arc<Generation>>>,
}

impl<C: Clock> GenerationManager<C> {
    pub fn new(clock: C, grace_period_ms: u64) -> Arc<Self> {
        Arc::new(Self { clock, grace_period_ms, active: Mutex::new(None) })
    }

    /// `reload()` (spec §4.8) — installs a freshly built `Generation` as
    /// `active`, marking the previous active generation `draining` and
    /// spawning its drain task. Building the `Generation` itself (loading
    /// the user module at the configured entry, assembling a fresh `env`
    /// and `BindingRegistry`) is the caller's job — `forge-runtime` has no
    /// concrete dependency on the binding crates that populate it.
    pub fn reload(self: &Arc<Self>, new_generation: Arc<Generation>) {
        let previous = {
            let mut active = self.active.lock();
            active.replace(new_generation)
        };
        if let Some(previous) = previous {
            let clock = self.clock.clone();
            let grace_period_ms = self.grace_period_ms;
            tokio::spawn(async move {
                drain_until_stopped(previous, grace_period_ms, clock).await;
            });
        }
    }

    pub fn active(&self) -> Option<Arc<Generation>> {
        self.active.lock().clone()
    }

    /// Begins a request against the active generation, returning a guard
    /// whose drop decrements `activeRequests` (spec §4.8 "Fetch dispatch").
    pub fn begin_request(&self) -> Result<(Arc<Generation>, RequestGuard), RuntimeError> {
        let generation = self.active().ok_or(RuntimeError::NoActiveGeneration)?;
        let guard = generation.begin_request();
        Ok((generation, guard))
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;

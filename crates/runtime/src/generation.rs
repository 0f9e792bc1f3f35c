//! A `Generation` (spec §3, §4.8): a loaded version of the user module and
//! its bindings. Only the `active` generation accepts new traffic; previous
//! generations `drain` until idle, then `stop`.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use forge_core::Clock;

use crate::handler::UserModule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Active,
    Draining,
    Stopped,
}

/// A background resource owned by a generation (queue consumer, cron
/// scheduler, durable-actor namespace, workflow engine). `forge-runtime`
/// has no concrete dependency on `forge-actor`/`forge-workflow`; whatever
/// wires the full runtime together hands in the concrete list.
#[async_trait]
pub trait OwnedBinding: Send + Sync {
    /// Tears the binding down (spec: "destroy its namespaces, abort its
    /// workflows, release bindings"). Must be idempotent.
    async fn stop(&self);

    /// Sockets this binding currently holds accepted (spec: a generation is
    /// idle only if no owned actor instance holds an accepted WebSocket).
    /// Bindings with no notion of sockets (queue consumers, cron) use the
    /// default.
    fn accepted_socket_count(&self) -> usize {
        0
    }
}

pub struct Generation {
    id: u64,
    module: Arc<dyn UserModule>,
    state: Mutex<GenerationState>,
    active_requests: AtomicU32,
    owned: Vec<Arc<dyn OwnedBinding>>,
    created_at_ms: i64,
    stopped_at_ms: Mutex<Option<i64>>,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl Generation {
    /// Allocates the next sequential generation id (spec: `Generation(id:int, ...)`).
    pub fn next_id() -> u64 {
        NEXT_ID.fetch_add(1, Ordering::SeqCst)
    }

    pub fn new(id: u64, module: Arc<dyn UserModule>, owned: Vec<Arc<dyn OwnedBinding>>, created_at_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            id,
            module,
            state: Mutex::new(GenerationState::Active),
            active_requests: AtomicU32::new(0),
            owned,
            created_at_ms,
            stopped_at_ms: Mutex::new(None),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn module(&self) -> &Arc<dyn UserModule> {
        &self.module
    }

    pub fn state(&self) -> GenerationState {
        *self.state.lock()
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    pub fn mark_draining(&self) {
        let mut state = self.state.lock();
        if *state == GenerationState::Active {
            *state = GenerationState::Draining;
        }
    }

    /// A request-scoped RAII guard; dropping it decrements `activeRequests`.
    pub fn begin_request(self: &Arc<Self>) -> RequestGuard {
        self.active_requests.fetch_add(1, Ordering::SeqCst);
        RequestGuard { generation: self.clone() }
    }

    fn end_request(&self) {
        self.active_requests.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn active_request_count(&self) -> u32 {
        self.active_requests.load(Ordering::SeqCst)
    }

    fn accepted_socket_count(&self) -> usize {
        self.owned.iter().map(|b| b.accepted_socket_count()).sum()
    }

    /// A generation is idle iff no active requests and no owned binding
    /// holds an accepted WebSocket (spec §3).
    pub fn is_idle(&self) -> bool {
        self.active_request_count() == 0 && self.accepted_socket_count() == 0
    }

    /// Transitions to `stopped`: tears down every owned binding. Idempotent.
    pub async fn stop(&self, now_ms: i64) {
        {
            let mut stopped_at = self.stopped_at_ms.lock();
            if *self.state.lock() == GenerationState::Stopped {
                return;
            }
            *self.state.lock() = GenerationState::Stopped;
            *stopped_at = Some(now_ms);
        }
        for binding in &self.owned {
            binding.stop().await;
        }
    }
}

/// Held for the lifetime of one request; decrements the generation's
/// `activeRequests` counter on drop so a panicking handler can't leak it.
pub struct RequestGuard {
    generation: Arc<Generation>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.generation.end_request();
    }
}

/// Polls a draining generation until it is idle (or the grace period
/// elapses), then stops it (spec §4.8 "Drain").
pub async fn drain_until_stopped<C: Clock>(generation: Arc<Generation>, grace_period_ms: u64, clock: C) {
    generation.mark_draining();
    let deadline = clock.epoch_ms() + grace_period_ms as i64;
    let mut poll = tokio::time::interval(Duration::from_millis(50));
    loop {
        poll.tick().await;
        let now = clock.epoch_ms();
        if generation.is_idle() || now >= deadline {
            generation.stop(now).await;
            return;
        }
    }
}

#[cfg(test)]
#[path = "generation_tests.rs"]
mod tests;

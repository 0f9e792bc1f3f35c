//! The "E-order" serialization lock and init barrier (spec §4.5.2).
//!
//! Every `executeRpc`/`executeFetch`/`executeAlarm`/`executeRpcGet` call
//! acquires this lock, runs, then releases — guaranteeing concurrent
//! external calls are delivered to the user class in FIFO order and never
//! interleave. `blockConcurrencyWhile` reuses the same primitive: holding
//! the lock while its future runs is exactly "arriving operations queue
//! behind the barrier".

use std::sync::Arc;

use tokio::sync::Mutex;

#[derive(Default)]
pub struct SerializationLock {
    mutex: Mutex<()>,
}

impl SerializationLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// `state.blockConcurrencyWhile(f)` — added to the init barrier; while
    /// pending, every other `execute*` call queues because it shares this
    /// same lock.
    pub async fn block_concurrency_while<F, Fut, T>(self: &Arc<Self>, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let _guard = self.mutex.lock().await;
        f().await
    }

    /// Acquires the serialization lock and runs `f` — the shape every
    /// `execute*` entry point shares.
    pub async fn run<F, Fut, T>(self: &Arc<Self>, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let _guard = self.mutex.lock().await;
        f().await
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;

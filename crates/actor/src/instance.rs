//! A single `(namespace, id)` instance: storage, lock-guarded executor,
//! alarms, and hibernatable sockets, wired together (spec §4.5).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use forge_core::Clock;

use crate::alarms::AlarmScheduler;
use crate::error::ActorError;
use crate::executor::{Executor, RpcRequest, RpcResponse};
use crate::hibernation::WebSocketRegistry;
use crate::id::ActorId;
use crate::storage::{ActorKv, ActorSql};

/// Ties [`ActorKv`]/[`ActorSql`], the executor, the alarm scheduler, and the
/// hibernatable-socket registry together for one durable-object instance.
pub struct Instance<C: Clock, S: Clone + Eq + std::hash::Hash> {
    id: ActorId,
    kv: ActorKv,
    sql: Mutex<Option<ActorSql>>,
    executor: Arc<dyn Executor>,
    alarms: Arc<AlarmScheduler>,
    websockets: Mutex<WebSocketRegistry<S>>,
    clock: C,
    last_active_ms: AtomicI64,
}

impl<C: Clock, S: Clone + Eq + std::hash::Hash> Instance<C, S> {
    pub fn new(id: ActorId, kv: ActorKv, executor: Arc<dyn Executor>, alarms: Arc<AlarmScheduler>, clock: C) -> Self {
        let now = clock.epoch_ms();
        Self {
            id,
            kv,
            sql: Mutex::new(None),
            executor,
            alarms,
            websockets: Mutex::new(WebSocketRegistry::new()),
            clock,
            last_active_ms: AtomicI64::new(now),
        }
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    pub fn kv(&self) -> &ActorKv {
        &self.kv
    }

    /// Opens the per-instance SQL file on first use; isolation invariant
    /// (spec §4.5.3) holds because each instance's path is keyed by both
    /// namespace and id.
    pub fn sql(&self, do_sql_dir: &std::path::Path, namespace: &str) -> Result<(), ActorError> {
        let mut guard = self.sql.lock();
        if guard.is_none() {
            *guard = Some(ActorSql::open(do_sql_dir, namespace, self.id.as_str())?);
        }
        Ok(())
    }

    pub fn with_sql<T>(&self, f: impl FnOnce(&ActorSql) -> Result<T, ActorError>) -> Result<T, ActorError> {
        let guard = self.sql.lock();
        match guard.as_ref() {
            Some(sql) => f(sql),
            None => Err(ActorError::Disposed),
        }
    }

    fn touch(&self) {
        self.last_active_ms.store(self.clock.epoch_ms(), Ordering::SeqCst);
    }

    pub async fn execute_fetch(&self, request: RpcRequest) -> Result<RpcResponse, ActorError> {
        self.touch();
        let result = self.executor.execute_fetch(request).await;
        self.touch();
        result
    }

    pub async fn execute_rpc(&self, method: &str, args: Value) -> Result<Value, ActorError> {
        self.touch();
        let result = self.executor.execute_rpc(method, args).await;
        self.touch();
        result
    }

    pub async fn execute_rpc_get(&self, prop: &str) -> Result<Value, ActorError> {
        self.touch();
        let result = self.executor.execute_rpc_get(prop).await;
        self.touch();
        result
    }

    pub async fn execute_alarm(&self, retry_count: u32, is_retry: bool) -> Result<(), ActorError> {
        self.touch();
        let result = self.executor.execute_alarm(retry_count, is_retry).await;
        self.touch();
        result
    }

    pub fn accept_websocket(&self, socket: S, tags: Vec<String>) -> Result<(), ActorError> {
        self.websockets.lock().accept(socket, tags)
    }

    pub fn remove_websocket(&self, socket: &S) {
        self.websockets.lock().remove(socket);
    }

    pub fn websockets(&self) -> &Mutex<WebSocketRegistry<S>> {
        &self.websockets
    }

    pub fn set_alarm(&self, time_ms: i64) -> Result<(), ActorError> {
        self.alarms.store().set(self.id.as_str(), time_ms)
    }

    pub fn get_alarm(&self) -> Result<Option<i64>, ActorError> {
        self.alarms.store().get(self.id.as_str())
    }

    pub fn delete_alarm(&self) -> Result<(), ActorError> {
        self.alarms.cancel(self.id.as_str());
        self.alarms.store().delete(self.id.as_str())
    }

    /// Eviction (spec §4.5.6): no accepted sockets, no in-flight operation,
    /// and idle for at least `eviction_timeout_ms`.
    pub fn is_evictable(&self, eviction_timeout_ms: i64) -> bool {
        if self.executor.is_active() || self.executor.is_blocked() {
            return false;
        }
        if !self.websockets.lock().get_websockets(None).is_empty() {
            return false;
        }
        let idle_for = self.clock.epoch_ms() - self.last_active_ms.load(Ordering::SeqCst);
        idle_for >= eviction_timeout_ms
    }

    pub async fn dispose(&self) {
        self.executor.dispose().await;
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;

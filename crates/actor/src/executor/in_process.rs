use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ActorError;
use crate::lock::SerializationLock;

use super::{DurableObject, Executor, RpcRequest, RpcResponse};

/// Runs the user class in the same process as the caller, sharing the
/// generation's loaded module. Lowest latency; no isolation between
/// instances beyond the serialization lock and per-instance storage.
pub struct InProcessExecutor {
    object: Arc<dyn DurableObject>,
    lock: Arc<SerializationLock>,
    active_ops: AtomicUsize,
    websocket_count: AtomicUsize,
    blocked: AtomicBool,
    aborted: AtomicBool,
}

impl InProcessExecutor {
    pub fn new(object: Arc<dyn DurableObject>) -> Self {
        Self {
            object,
            lock: Arc::new(SerializationLock::new()),
            active_ops: AtomicUsize::new(0),
            websocket_count: AtomicUsize::new(0),
            blocked: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
        }
    }

    /// Runs `f` as the constructor's init barrier (`state.blockConcurrencyWhile`):
    /// every `execute*` call queues behind it because they share the same lock.
    pub async fn block_concurrency_while<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        self.blocked.store(true, Ordering::SeqCst);
        let result = self.lock.block_concurrency_while(f).await;
        self.blocked.store(false, Ordering::SeqCst);
        result
    }

    pub fn set_websocket_count(&self, count: usize) {
        self.websocket_count.store(count, Ordering::SeqCst);
    }

    async fn guarded<F, Fut, T>(&self, f: F) -> Result<T, ActorError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ActorError>>,
    {
        if self.aborted.load(Ordering::SeqCst) {
            return Err(ActorError::Disposed);
        }
        self.lock
            .run(|| async move {
                self.active_ops.fetch_add(1, Ordering::SeqCst);
                let result = f().await;
                self.active_ops.fetch_sub(1, Ordering::SeqCst);
                result
            })
            .await
    }
}

#[async_trait]
impl Executor for InProcessExecutor {
    async fn execute_fetch(&self, request: RpcRequest) -> Result<RpcResponse, ActorError> {
        self.guarded(|| self.object.fetch(request)).await
    }

    async fn execute_rpc(&self, method: &str, args: Value) -> Result<Value, ActorError> {
        self.guarded(|| self.object.call(method, args)).await
    }

    async fn execute_rpc_get(&self, prop: &str) -> Result<Value, ActorError> {
        self.guarded(|| self.object.get_property(prop)).await
    }

    async fn execute_alarm(&self, retry_count: u32, is_retry: bool) -> Result<(), ActorError> {
        self.guarded(|| self.object.alarm(retry_count, is_retry)).await
    }

    fn is_active(&self) -> bool {
        self.active_ops.load(Ordering::SeqCst) > 0 || self.websocket_count.load(Ordering::SeqCst) > 0
    }

    fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    fn active_websocket_count(&self) -> usize {
        self.websocket_count.load(Ordering::SeqCst)
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    async fn dispose(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }
}

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::ActorError;

use super::{DurableObject, Executor, RpcRequest, RpcResponse};

enum Command {
    Fetch(RpcRequest, oneshot::Sender<Result<RpcResponse, ActorError>>),
    Rpc(String, Value, oneshot::Sender<Result<Value, ActorError>>),
    RpcGet(String, oneshot::Sender<Result<Value, ActorError>>),
    Alarm(u32, bool, oneshot::Sender<Result<(), ActorError>>),
}

fn reject(cmd: Command) {
    match cmd {
        Command::Fetch(_, reply) => {
            let _ = reply.send(Err(ActorError::Disposed));
        }
        Command::Rpc(_, _, reply) => {
            let _ = reply.send(Err(ActorError::Disposed));
        }
        Command::RpcGet(_, reply) => {
            let _ = reply.send(Err(ActorError::Disposed));
        }
        Command::Alarm(_, _, reply) => {
            let _ = reply.send(Err(ActorError::Disposed));
        }
    }
}

/// Runs the user class on a dedicated worker thread with its own
/// single-threaded Tokio runtime. Commands cross the thread boundary over
/// a plain channel; `dispose()` closes the channel and joins the thread,
/// which drops that runtime and everything still running on it —
/// including fire-and-forget `tokio::spawn` work the user class started.
pub struct IsolatedExecutor {
    tx: Mutex<Option<std_mpsc::Sender<Command>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    active_ops: Arc<AtomicUsize>,
    websocket_count: Arc<AtomicUsize>,
    aborted: Arc<AtomicBool>,
}

impl IsolatedExecutor {
    pub fn new(object: Arc<dyn DurableObject>) -> Self {
        let (tx, rx) = std_mpsc::channel::<Command>();
        let aborted = Arc::new(AtomicBool::new(false));
        let worker_aborted = aborted.clone();

        let handle = thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(err) => {
                    tracing::error!(error = %err, "isolated executor failed to start runtime");
                    return;
                }
            };
            for cmd in rx {
                if worker_aborted.load(Ordering::SeqCst) {
                    reject(cmd);
                    continue;
                }
                match cmd {
                    Command::Fetch(req, reply) => {
                        let result = rt.block_on(object.fetch(req));
                        let _ = reply.send(result);
                    }
                    Command::Rpc(method, args, reply) => {
                        let result = rt.block_on(object.call(&method, args));
                        let _ = reply.send(result);
                    }
                    Command::RpcGet(prop, reply) => {
                        let result = rt.block_on(object.get_property(&prop));
                        let _ = reply.send(result);
                    }
                    Command::Alarm(retry_count, is_retry, reply) => {
                        let result = rt.block_on(object.alarm(retry_count, is_retry));
                        let _ = reply.send(result);
                    }
                }
            }
        });

        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
            active_ops: Arc::new(AtomicUsize::new(0)),
            websocket_count: Arc::new(AtomicUsize::new(0)),
            aborted,
        }
    }

    pub fn set_websocket_count(&self, count: usize) {
        self.websocket_count.store(count, Ordering::SeqCst);
    }

    async fn send<T>(&self, build: impl FnOnce(oneshot::Sender<Result<T, ActorError>>) -> Command) -> Result<T, ActorError> {
        if self.aborted.load(Ordering::SeqCst) {
            return Err(ActorError::Disposed);
        }
        let tx = {
            let guard = self.tx.lock();
            match guard.as_ref() {
                Some(tx) => tx.clone(),
                None => return Err(ActorError::Disposed),
            }
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        self.active_ops.fetch_add(1, Ordering::SeqCst);
        if tx.send(build(reply_tx)).is_err() {
            self.active_ops.fetch_sub(1, Ordering::SeqCst);
            return Err(ActorError::Disposed);
        }
        let result = reply_rx.await.unwrap_or(Err(ActorError::Disposed));
        self.active_ops.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl Executor for IsolatedExecutor {
    async fn execute_fetch(&self, request: RpcRequest) -> Result<RpcResponse, ActorError> {
        self.send(|reply| Command::Fetch(request, reply)).await
    }

    async fn execute_rpc(&self, method: &str, args: Value) -> Result<Value, ActorError> {
        let method = method.to_string();
        self.send(|reply| Command::Rpc(method, args, reply)).await
    }

    async fn execute_rpc_get(&self, prop: &str) -> Result<Value, ActorError> {
        let prop = prop.to_string();
        self.send(|reply| Command::RpcGet(prop, reply)).await
    }

    async fn execute_alarm(&self, retry_count: u32, is_retry: bool) -> Result<(), ActorError> {
        self.send(|reply| Command::Alarm(retry_count, is_retry, reply)).await
    }

    fn is_active(&self) -> bool {
        self.active_ops.load(Ordering::SeqCst) > 0 || self.websocket_count.load(Ordering::SeqCst) > 0
    }

    fn is_blocked(&self) -> bool {
        false
    }

    fn active_websocket_count(&self) -> usize {
        self.websocket_count.load(Ordering::SeqCst)
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    async fn dispose(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.tx.lock().take();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }
    }
}

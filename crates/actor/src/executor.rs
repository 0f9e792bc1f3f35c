//! The executor abstraction (spec §4.5.7): the `DurableObject` user-class
//! seam, plus its two interchangeable backends — in-process and isolated.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::error::ActorError;

#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct RpcResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// The user class a durable-object binding instantiates, one per instance.
/// `forge-runtime` supplies the concrete implementation that wraps the
/// loaded user module; this crate only depends on the seam.
#[async_trait]
pub trait DurableObject: Send + Sync {
    async fn fetch(&self, request: RpcRequest) -> Result<RpcResponse, ActorError>;
    async fn call(&self, method: &str, args: Value) -> Result<Value, ActorError>;
    async fn get_property(&self, prop: &str) -> Result<Value, ActorError>;
    async fn alarm(&self, retry_count: u32, is_retry: bool) -> Result<(), ActorError>;
}

/// Both executor backends implement this; `namespace.rs` only ever talks
/// to instances through it.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute_fetch(&self, request: RpcRequest) -> Result<RpcResponse, ActorError>;
    async fn execute_rpc(&self, method: &str, args: Value) -> Result<Value, ActorError>;
    async fn execute_rpc_get(&self, prop: &str) -> Result<Value, ActorError>;
    async fn execute_alarm(&self, retry_count: u32, is_retry: bool) -> Result<(), ActorError>;

    fn is_active(&self) -> bool;
    fn is_blocked(&self) -> bool;
    fn active_websocket_count(&self) -> usize;
    fn is_aborted(&self) -> bool;

    /// Terminates the executor. Idempotent.
    async fn dispose(&self);
}

mod in_process;
mod isolated;

pub use in_process::InProcessExecutor;
pub use isolated::IsolatedExecutor;

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

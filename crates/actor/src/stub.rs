//! The stub proxy (spec §4.5.1): the handle callers outside an instance
//! hold. JS's transparent property-access proxy doesn't translate
//! directly into Rust, so the thenable/reserved-name/`_`-hidden rules
//! become explicit checks on [`Stub::call`]/[`Stub::get_property`].

use std::sync::Arc;

use serde_json::Value;

use forge_core::Clock;

use crate::error::ActorError;
use crate::executor::{RpcRequest, RpcResponse};
use crate::id::ActorId;
use crate::instance::Instance;

/// Names the thenable protocol reserves on the proxy itself; reads of
/// these never reach the user class and resolve to `undefined` (`None`)
/// so the proxy itself is never mistaken for a `Promise`.
const RESERVED_PROPERTY_NAMES: &[&str] = &["then", "catch", "finally"];

fn is_hidden(name: &str) -> bool {
    name.starts_with('_')
}

#[derive(Clone)]
pub struct Stub<C: Clock, S: Clone + Eq + std::hash::Hash> {
    instance: Arc<Instance<C, S>>,
}

impl<C: Clock, S: Clone + Eq + std::hash::Hash> Stub<C, S> {
    pub fn new(instance: Arc<Instance<C, S>>) -> Self {
        Self { instance }
    }

    pub fn id(&self) -> &ActorId {
        self.instance.id()
    }

    pub fn name(&self) -> Option<&str> {
        self.instance.id().name()
    }

    /// `stub.m(args)` → `executeRpc`.
    pub async fn call(&self, method: &str, args: Value) -> Result<Value, ActorError> {
        if is_hidden(method) {
            return Err(ActorError::MethodNotFound(method.to_string()));
        }
        self.instance.execute_rpc(method, args).await
    }

    /// `await stub.p` via the thenable pattern. Reserved names resolve to
    /// `None` without reaching the user class; hidden names are rejected.
    pub async fn get_property(&self, prop: &str) -> Result<Option<Value>, ActorError> {
        if RESERVED_PROPERTY_NAMES.contains(&prop) {
            return Ok(None);
        }
        if is_hidden(prop) {
            return Err(ActorError::MethodNotFound(prop.to_string()));
        }
        self.instance.execute_rpc_get(prop).await.map(Some)
    }

    /// `stub.fetch(request|url, init?)`.
    pub async fn fetch(&self, request: RpcRequest) -> Result<RpcResponse, ActorError> {
        self.instance.execute_fetch(request).await
    }
}

#[cfg(test)]
#[path = "stub_tests.rs"]
mod tests;

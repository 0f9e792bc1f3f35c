//! The `ServiceTarget` seam (spec §4.7): the other worker's module and env,
//! resolved by name from a registry and invoked in-process. `forge-runtime`
//! supplies the concrete implementation that wraps a loaded user module;
//! this crate only depends on the seam, mirroring `forge-actor::DurableObject`.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::error::ServiceError;

#[derive(Debug, Clone)]
pub struct ServiceRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[async_trait]
pub trait ServiceTarget: Send + Sync {
    /// `fetch(request|url, init?)` — calls the target's default or named
    /// `fetch` handler in-process.
    async fn fetch(&self, request: ServiceRequest) -> Result<ServiceResponse, ServiceError>;

    /// Any other property access that is a method call: RPC.
    async fn call(&self, method: &str, args: Value) -> Result<Value, ServiceError>;

    /// A property read via the thenable pattern: returns the current value,
    /// or a bound-function stub for method-valued properties.
    async fn get_property(&self, prop: &str) -> Result<Value, ServiceError>;
}

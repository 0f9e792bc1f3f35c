//! `ServiceBinding` (spec §4.7): the proxy a caller holds for a
//! worker-to-worker binding. Same reserved-name/thenable rules as
//! `forge-actor::Stub`, plus per-invocation subrequest accounting and an
//! always-`NotSupported` `connect()`.

use std::sync::Arc;

use serde_json::Value;

use crate::error::ServiceError;
use crate::limiter::SubrequestCounter;
use crate::target::{ServiceRequest, ServiceResponse, ServiceTarget};

const RESERVED_PROPERTY_NAMES: &[&str] = &["then", "catch", "finally"];

#[derive(Clone)]
pub struct ServiceBinding {
    name: String,
    target: Arc<dyn ServiceTarget>,
    subrequests: Arc<SubrequestCounter>,
}

impl ServiceBinding {
    pub fn new(name: impl Into<String>, target: Arc<dyn ServiceTarget>, subrequests: Arc<SubrequestCounter>) -> Self {
        Self { name: name.into(), target, subrequests }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `binding.fetch(request|url, init?)`.
    pub async fn fetch(&self, request: ServiceRequest) -> Result<ServiceResponse, ServiceError> {
        self.subrequests.record_service_binding_call()?;
        tracing::info!(binding = %self.name, method = %request.method, url = %request.url, "service fetch");
        self.target.fetch(request).await
    }

    /// Any other property access that is a method call: RPC.
    pub async fn call(&self, method: &str, args: Value) -> Result<Value, ServiceError> {
        self.subrequests.record_service_binding_call()?;
        tracing::info!(binding = %self.name, method, "service rpc call");
        self.target.call(method, args).await
    }

    /// Property read via the thenable pattern.
    pub async fn get_property(&self, prop: &str) -> Result<Option<Value>, ServiceError> {
        if RESERVED_PROPERTY_NAMES.contains(&prop) {
            return Ok(None);
        }
        self.subrequests.record_service_binding_call()?;
        self.target.get_property(prop).await.map(Some)
    }

    /// `connect(...)` — declared but always fails.
    pub async fn connect(&self) -> Result<(), ServiceError> {
        Err(ServiceError::NotSupported)
    }
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;

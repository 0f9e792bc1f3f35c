//! `ServiceRegistry` — resolves a configured binding name to its proxy
//! (spec §4.7 "resolves the target module and its env via a registry").

use std::collections::HashMap;

use crate::error::ServiceError;
use crate::proxy::ServiceBinding;

#[derive(Default)]
pub struct ServiceRegistry {
    bindings: HashMap<String, ServiceBinding>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, binding: ServiceBinding) {
        self.bindings.insert(binding.name().to_string(), binding);
    }

    pub fn get(&self, name: &str) -> Result<&ServiceBinding, ServiceError> {
        self.bindings.get(name).ok_or_else(|| ServiceError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

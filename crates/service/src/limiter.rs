//! `subrequestCount` accounting for one request's execution context (spec
//! §4.7, §4.9): every subrequest — a fetch through a service binding, or any
//! other binding call counted against the same budget — increments one
//! shared counter bounded by `maxSubrequests` (default 1000). Calls that are
//! specifically a service-binding invocation are additionally bounded by a
//! tighter, separately-tracked budget (default 32).

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::ServiceError;

pub const DEFAULT_MAX_SUBREQUESTS: u32 = 1000;
pub const DEFAULT_MAX_SERVICE_BINDING_SUBREQUESTS: u32 = 32;

pub struct SubrequestCounter {
    total: AtomicU32,
    service_binding: AtomicU32,
    max_total: u32,
    max_service_binding: u32,
}

impl SubrequestCounter {
    pub fn new(max_total: u32, max_service_binding: u32) -> Self {
        Self { total: AtomicU32::new(0), service_binding: AtomicU32::new(0), max_total, max_service_binding }
    }

    /// Any subrequest against the shared per-invocation budget.
    pub fn record_subrequest(&self) -> Result<(), ServiceError> {
        let count = self.total.fetch_add(1, Ordering::SeqCst) + 1;
        if count > self.max_total {
            return Err(ServiceError::LimitExceeded { count, limit: self.max_total });
        }
        Ok(())
    }

    /// A subrequest that is specifically a service-binding call — counts
    /// against both budgets.
    pub fn record_service_binding_call(&self) -> Result<(), ServiceError> {
        let service_count = self.service_binding.fetch_add(1, Ordering::SeqCst) + 1;
        if service_count > self.max_service_binding {
            return Err(ServiceError::LimitExceeded { count: service_count, limit: self.max_service_binding });
        }
        self.record_subrequest()
    }

    pub fn total(&self) -> u32 {
        self.total.load(Ordering::SeqCst)
    }

    pub fn service_binding_calls(&self) -> u32 {
        self.service_binding.load(Ordering::SeqCst)
    }
}

impl Default for SubrequestCounter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SUBREQUESTS, DEFAULT_MAX_SERVICE_BINDING_SUBREQUESTS)
    }
}

#[cfg(test)]
#[path = "limiter_tests.rs"]
mod tests;

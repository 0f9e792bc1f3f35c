//! forge-service: worker-to-worker service bindings (spec §4.7) — a
//! fetch/RPC proxy over another generation's module, subrequest accounting,
//! and an always-`NotSupported` `connect()`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod error;
pub mod limiter;
pub mod proxy;
pub mod registry;
pub mod target;

pub use error::ServiceError;
pub use limiter::{SubrequestCounter, DEFAULT_MAX_SERVICE_BINDING_SUBREQUESTS, DEFAULT_MAX_SUBREQUESTS};
pub use proxy::ServiceBinding;
pub use registry::ServiceRegistry;
pub use target::{ServiceRequest, ServiceResponse, ServiceTarget};

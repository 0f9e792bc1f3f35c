//! forge-actor: the durable-object subsystem (spec §4.5) — identity,
//! storage, the E-order serialization lock, alarms, WebSocket hibernation,
//! the executor abstraction, and the namespace/stub proxy surface tying
//! them into one addressable instance per `(namespace, id)`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod alarms;
pub mod error;
pub mod executor;
pub mod hibernation;
pub mod id;
pub mod instance;
pub mod lock;
pub mod namespace;
pub mod stub;
pub mod storage;

pub use error::ActorError;
pub use executor::{DurableObject, Executor, InProcessExecutor, IsolatedExecutor, RpcRequest, RpcResponse};
pub use hibernation::WebSocketRegistry;
pub use id::ActorId;
pub use instance::Instance;
pub use lock::SerializationLock;
pub use namespace::{ExecutorKind, Namespace};
pub use stub::Stub;

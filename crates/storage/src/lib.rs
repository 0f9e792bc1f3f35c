//! forge-storage: the shared SQLite persistence layer (spec §4.1) plus the
//! storage bindings built on top of it — KV, R2, D1, Cache, Analytics Engine,
//! Email (spec §4.3).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod analytics;
pub mod cache;
pub mod d1;
pub mod db;
pub mod email;
pub mod error;
pub mod kv;
pub mod r2;

pub use analytics::{AnalyticsEngine, DataPoint};
pub use cache::{Cache, CachedResponse};
pub use d1::D1Database;
pub use db::Db;
pub use email::{EmailBinding, EmailStatus, ForwardableMessage};
pub use error::StorageError;
pub use kv::KvNamespace;
pub use r2::R2Bucket;

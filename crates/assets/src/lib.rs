//! forge-assets: the static-asset server (spec §4.2) — path-traversal guard,
//! `_redirects`/`_headers` parsing and matching, trailing-slash policy,
//! resolution order, not-found handling, ETag/If-None-Match.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod headers;
pub mod pattern;
pub mod redirects;
pub mod server;

pub use error::AssetsError;
pub use headers::HeaderRules;
pub use pattern::CompiledPattern;
pub use redirects::{RedirectMatch, RedirectRules};
pub use server::{AssetBody, AssetResponse, AssetServer};

//! forge-daemon: thin binary wiring (spec §6) around `forge-runtime` — loads
//! config, opens the shared database, builds the first `Generation`, and
//! serves it over HTTP.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod demo_module;
pub mod error;
pub mod wiring;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use forge_core::{Clock, Config};
use forge_runtime::{DispatcherState, GenerationManager, DEFAULT_GRACE_PERIOD_MS};
use forge_storage::Db;

pub use demo_module::DemoModule;
pub use error::DaemonError;

/// Loads `config_path`, opens the database at `data_dir`, builds the first
/// generation, and serves it at `addr` until the process is killed (spec §6
/// "Reload" runs again only when re-invoked — this binary loads once and
/// runs, matching a `dev` server's lifecycle).
pub async fn serve<C: Clock>(config_path: &Path, data_dir: &Path, addr: SocketAddr, clock: C) -> Result<(), DaemonError> {
    let config = forge_core::load_config(config_path)?;
    let db = Db::open(data_dir)?;

    let manager = GenerationManager::new(clock.clone(), DEFAULT_GRACE_PERIOD_MS);
    let built = wiring::build_generation(&config, db, clock.clone(), Arc::new(DemoModule))?;
    manager.reload(built.generation);

    let state = Arc::new(DispatcherState {
        manager,
        clock,
        assets: built.assets,
        run_worker_first: built.run_worker_first,
        queues: built.queues,
    });
    let app = forge_runtime::router(state);

    tracing::info!(%addr, main = %config.main.display(), "forge-daemon listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

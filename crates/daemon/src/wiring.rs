//! Builds a `Generation` from a parsed `Config` (spec §4.8 "Reload"): static
//! assets, `run_worker_first` globs, queue pull-consumers, and the cron
//! scheduler owned by the generation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use forge_assets::AssetServer;
use forge_core::{Clock, Config, ForgeError};
use forge_queue::PullConsumer;
use forge_runtime::{compile_glob, CronSchedule, CronScheduler, Generation, OwnedBinding, ScheduledHandler, UserModule};
use forge_storage::Db;

use crate::error::DaemonError;

/// Adapts a `UserModule`'s `scheduled` entry point to the `ScheduledHandler`
/// seam `CronScheduler` ticks against.
struct ModuleScheduledHandler {
    module: Arc<dyn UserModule>,
}

#[async_trait]
impl ScheduledHandler for ModuleScheduledHandler {
    async fn scheduled(&self, cron: &str, scheduled_time_ms: i64) -> Result<(), ForgeError> {
        let ctx = forge_runtime::ExecutionContext::new(Arc::new(forge_service::SubrequestCounter::default()));
        self.module.scheduled(cron, scheduled_time_ms, &ctx).await?;
        ctx.await_all().await;
        Ok(())
    }
}

#[async_trait]
impl<C: Clock> OwnedBinding for CronScheduler<C, ModuleScheduledHandler> {
    async fn stop(&self) {
        self.stop();
    }
}

pub struct BuiltGeneration<C: Clock> {
    pub generation: Arc<Generation>,
    pub assets: Option<Arc<AssetServer>>,
    pub run_worker_first: Vec<regex::Regex>,
    pub queues: HashMap<String, Arc<PullConsumer<C>>>,
}

pub fn build_generation<C: Clock>(config: &Config, db: Db, clock: C, module: Arc<dyn UserModule>) -> Result<BuiltGeneration<C>, DaemonError> {
    let assets = match &config.assets {
        Some(cfg) => Some(Arc::new(AssetServer::open(&cfg.directory, cfg.html_handling, cfg.not_found_handling.clone())?)),
        None => None,
    };

    let run_worker_first = config
        .assets
        .as_ref()
        .map(|cfg| cfg.run_worker_first.iter().map(|glob| compile_glob(glob)).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();

    let mut queues = HashMap::new();
    for consumer_cfg in &config.queues.consumers {
        queues.insert(
            consumer_cfg.queue.clone(),
            Arc::new(PullConsumer::new(db.clone(), consumer_cfg.queue.clone(), clock.clone())),
        );
    }

    let schedules = config
        .triggers
        .crons
        .iter()
        .map(|expr| CronSchedule::parse(expr))
        .collect::<Result<Vec<_>, _>>()?;

    let mut owned: Vec<Arc<dyn OwnedBinding>> = Vec::new();
    if !schedules.is_empty() {
        let scheduler = Arc::new(CronScheduler::new(
            schedules,
            clock.clone(),
            Arc::new(ModuleScheduledHandler { module: module.clone() }),
        ));
        scheduler.clone().spawn();
        let scheduler: Arc<dyn OwnedBinding> = scheduler;
        owned.push(scheduler);
    }

    let generation = Generation::new(Generation::next_id(), module, owned, clock.epoch_ms());

    Ok(BuiltGeneration { generation, assets, run_worker_first, queues })
}

#[cfg(test)]
#[path = "wiring_tests.rs"]
mod tests;

//! A durable-object namespace (spec §4.5.1): id resolution, the stub
//! cache, and the eviction sweep.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use forge_core::Clock;
use forge_storage::Db;

use crate::alarms::{AlarmScheduler, AlarmStore};
use crate::error::ActorError;
use crate::executor::{DurableObject, Executor, InProcessExecutor, IsolatedExecutor};
use crate::id::ActorId;
use crate::instance::Instance;
use crate::storage::ActorKv;

/// Selects which [`Executor`] backend new instances in this namespace use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    InProcess,
    Isolated,
}

type ObjectFactory = Arc<dyn Fn(&ActorId) -> Arc<dyn DurableObject> + Send + Sync>;

pub struct Namespace<C: Clock, S: Clone + Eq + std::hash::Hash + Send + Sync + 'static> {
    name: String,
    db: Db,
    do_sql_dir: PathBuf,
    clock: C,
    factory: ObjectFactory,
    executor_kind: ExecutorKind,
    eviction_timeout_ms: i64,
    alarms: Arc<AlarmScheduler>,
    instances: Mutex<HashMap<String, Arc<Instance<C, S>>>>,
}

impl<C: Clock, S: Clone + Eq + std::hash::Hash + Send + Sync + 'static> Namespace<C, S> {
    pub fn new(
        name: impl Into<String>,
        db: Db,
        do_sql_dir: PathBuf,
        clock: C,
        factory: ObjectFactory,
        executor_kind: ExecutorKind,
        eviction_timeout_ms: i64,
    ) -> Self {
        let name = name.into();
        let alarms = Arc::new(AlarmScheduler::new(AlarmStore::new(db.clone(), name.clone())));
        Self { name, db, do_sql_dir, clock, factory, executor_kind, eviction_timeout_ms, alarms, instances: Mutex::new(HashMap::new()) }
    }

    pub fn new_unique_id(&self) -> ActorId {
        ActorId::new_unique()
    }

    pub fn id_from_name(&self, name: &str) -> ActorId {
        ActorId::from_name(name)
    }

    pub fn id_from_string(&self, raw: impl Into<String>) -> ActorId {
        ActorId::from_string(raw)
    }

    fn build_instance(&self, id: ActorId) -> Arc<Instance<C, S>> {
        let object = (self.factory)(&id);
        let executor: Arc<dyn Executor> = match self.executor_kind {
            ExecutorKind::InProcess => Arc::new(InProcessExecutor::new(object)),
            ExecutorKind::Isolated => Arc::new(IsolatedExecutor::new(object)),
        };
        let kv = ActorKv::new(self.db.clone(), self.name.clone(), id.as_str());
        Arc::new(Instance::new(id, kv, executor, self.alarms.clone(), self.clock.clone()))
    }

    /// `get(id)` — returns the cached stub within this generation, lazily
    /// re-creating it if it was evicted (spec §4.5.6); persisted storage
    /// and pending alarms survive because they live in the shared db, not
    /// on the evicted [`Instance`].
    pub fn get(&self, id: ActorId) -> Arc<Instance<C, S>> {
        let mut instances = self.instances.lock();
        instances.entry(id.as_str().to_string()).or_insert_with(|| self.build_instance(id)).clone()
    }

    pub fn get_by_name(&self, name: &str) -> Arc<Instance<C, S>> {
        self.get(self.id_from_name(name))
    }

    pub fn alarms(&self) -> &Arc<AlarmScheduler> {
        &self.alarms
    }

    /// Re-arms every persisted alarm at startup; firing re-instantiates the
    /// instance through `get` if it had been evicted.
    pub fn rearm_persisted_alarms(self: &Arc<Self>) -> Result<(), ActorError> {
        let now = self.clock.epoch_ms();
        for (raw_id, fire_at) in self.alarms.store().list_all()? {
            let namespace = self.clone();
            let fire_id = raw_id.clone();
            let on_fire: crate::alarms::FireFn = Arc::new(move |retry_count, is_retry| {
                let namespace = namespace.clone();
                let id = namespace.id_from_string(fire_id.clone());
                Box::pin(async move {
                    let instance = namespace.get(id);
                    instance.execute_alarm(retry_count, is_retry).await
                })
            });
            self.alarms.arm(raw_id, fire_at, now, on_fire);
        }
        Ok(())
    }

    /// Drops every instance idle past `evictionTimeoutMs` with no accepted
    /// sockets and no in-flight operation.
    pub async fn sweep_evictable(&self) {
        let evictable: Vec<String> = {
            let instances = self.instances.lock();
            instances
                .iter()
                .filter(|(_, instance)| instance.is_evictable(self.eviction_timeout_ms))
                .map(|(id, _)| id.clone())
                .collect()
        };
        for id in &evictable {
            let instance = self.instances.lock().remove(id);
            if let Some(instance) = instance {
                instance.dispose().await;
            }
        }
    }

    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }

    /// Tears down every instance in this namespace (generation drain, spec §4.8).
    pub async fn destroy_all(&self) {
        let instances: Vec<Arc<Instance<C, S>>> = self.instances.lock().drain().map(|(_, instance)| instance).collect();
        for instance in instances {
            instance.dispose().await;
        }
    }
}

#[cfg(test)]
#[path = "namespace_tests.rs"]
mod tests;

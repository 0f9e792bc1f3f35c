//! `WorkflowEngine` (spec §4.6 "Instance lifecycle") — the supervisor that
//! owns one background task per running instance, registers workflow
//! classes, and re-invokes every `running` instance on startup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use forge_core::Clock;

use crate::control::InstanceControl;
use crate::error::WorkflowError;
use crate::step::Step;
use crate::store::WorkflowStore;
use crate::types::{Status, WorkflowEvent, WorkflowInstanceRow};

/// The base class a workflow extends: `run(event, step)`.
#[async_trait]
pub trait Workflow<C: Clock>: Send + Sync {
    async fn run(&self, event: WorkflowEvent, step: &Step<C>) -> Result<Value, WorkflowError>;
}

type WorkflowFactory<C> = Arc<dyn Fn() -> Arc<dyn Workflow<C>> + Send + Sync>;

struct RunningInstance {
    control: Arc<InstanceControl>,
    handle: tokio::task::AbortHandle,
}

pub struct WorkflowEngine<C: Clock> {
    store: WorkflowStore,
    clock: C,
    classes: Mutex<HashMap<String, WorkflowFactory<C>>>,
    running: Mutex<HashMap<String, RunningInstance>>,
}

impl<C: Clock> WorkflowEngine<C> {
    pub fn new(store: WorkflowStore, clock: C) -> Arc<Self> {
        Arc::new(Self { store, clock, classes: Mutex::new(HashMap::new()), running: Mutex::new(HashMap::new()) })
    }

    /// Registers a workflow class under the name used in `binding.create()`.
    pub fn register_class(&self, class_name: impl Into<String>, factory: WorkflowFactory<C>) {
        self.classes.lock().insert(class_name.into(), factory);
    }

    fn build(&self, class_name: &str) -> Result<Arc<dyn Workflow<C>>, WorkflowError> {
        let factory = self
            .classes
            .lock()
            .get(class_name)
            .cloned()
            .ok_or_else(|| WorkflowError::ClassNotRegistered(class_name.to_string()))?;
        Ok(factory())
    }

    /// `create({id?, params?})` — inserts `status=running`, spawns execution.
    pub fn create(self: &Arc<Self>, id: Option<String>, workflow_name: &str, class_name: &str, params: Value) -> Result<String, WorkflowError> {
        let id = id.unwrap_or_else(|| forge_core::id::new_uuid_v7().to_string());
        if self.store.get_instance(&id)?.is_some() {
            return Err(WorkflowError::InvalidInput(format!("duplicate workflow id: {id}")));
        }
        self.store.create_instance(&id, workflow_name, class_name, &params, self.clock.epoch_ms())?;
        self.spawn(id.clone());
        Ok(id)
    }

    /// Spawns (or re-spawns, for crash recovery) the background task driving
    /// `id`. A no-op if it is already running.
    fn spawn(self: &Arc<Self>, id: String) {
        let mut running = self.running.lock();
        if running.contains_key(&id) {
            return;
        }
        let control = Arc::new(InstanceControl::new());
        let engine = self.clone();
        let task_id = id.clone();
        let task_control = control.clone();
        let join = tokio::spawn(async move {
            engine.drive(task_id, task_control).await;
        });
        running.insert(id, RunningInstance { control, handle: join.abort_handle() });
    }

    async fn drive(self: Arc<Self>, id: String, control: Arc<InstanceControl>) {
        let outcome = self.run_once(&id, &control).await;
        if let Err(err) = outcome {
            if !matches!(err, WorkflowError::Aborted) {
                tracing::warn!(instance = %id, error = %err, "workflow instance errored");
                let _ = self.store.set_errored(&id, &err.to_string(), self.clock.epoch_ms());
            }
        }
        self.running.lock().remove(&id);
    }

    async fn run_once(&self, id: &str, control: &Arc<InstanceControl>) -> Result<(), WorkflowError> {
        let row = self.store.get_instance(id)?.ok_or_else(|| WorkflowError::NotFound(id.to_string()))?;
        let workflow = self.build(&row.class_name)?;
        let step = Step::new(self.store.clone(), control.clone(), id, self.clock.clone());
        let event = WorkflowEvent { instance_id: id.to_string(), params: row.params };

        match workflow.run(event, &step).await {
            Ok(output) => {
                self.store.set_complete(id, &output, self.clock.epoch_ms())?;
                Ok(())
            }
            Err(WorkflowError::Aborted) => {
                self.store.set_status(id, Status::Terminated, self.clock.epoch_ms())?;
                Err(WorkflowError::Aborted)
            }
            Err(err) => Err(err),
        }
    }

    pub fn get_instance(&self, id: &str) -> Result<WorkflowInstanceRow, WorkflowError> {
        self.store.get_instance(id)?.ok_or_else(|| WorkflowError::NotFound(id.to_string()))
    }

    pub fn status(&self, id: &str) -> Result<Status, WorkflowError> {
        Ok(self.get_instance(id)?.status)
    }

    pub fn pause(&self, id: &str) -> Result<(), WorkflowError> {
        self.get_instance(id)?;
        if let Some(running) = self.running.lock().get(id) {
            running.control.pause();
        }
        self.store.set_status(id, Status::Paused, self.clock.epoch_ms())
    }

    pub fn resume(&self, id: &str) -> Result<(), WorkflowError> {
        self.get_instance(id)?;
        if let Some(running) = self.running.lock().get(id) {
            running.control.resume();
        }
        self.store.set_status(id, Status::Running, self.clock.epoch_ms())
    }

    /// `terminate()` — aborts the instance; the step loop rejects the next
    /// check with [`WorkflowError::Aborted`].
    pub fn terminate(self: &Arc<Self>, id: &str) -> Result<(), WorkflowError> {
        self.get_instance(id)?;
        let running = self.running.lock().remove(id);
        if let Some(running) = running {
            running.control.terminate();
            running.handle.abort();
        }
        self.store.set_status(id, Status::Terminated, self.clock.epoch_ms())
    }

    /// `restart()` / `restart({fromStep})` — deletes step rows from
    /// `fromStep` onward (or all), resets status to `running`, re-invokes.
    pub fn restart(self: &Arc<Self>, id: &str, from_step: Option<&str>) -> Result<(), WorkflowError> {
        self.get_instance(id)?;
        if let Some(running) = self.running.lock().remove(id) {
            running.control.terminate();
            running.handle.abort();
        }
        self.store.delete_steps_from(id, from_step)?;
        self.store.set_status(id, Status::Running, self.clock.epoch_ms())?;
        self.spawn(id.to_string());
        Ok(())
    }

    /// `duplicate()` — new id, same params, spawns independently.
    pub fn duplicate(self: &Arc<Self>, id: &str) -> Result<String, WorkflowError> {
        let row = self.get_instance(id)?;
        self.create(None, &row.workflow_name, &row.class_name, row.params)
    }

    pub fn send_event(&self, id: &str, event_type: &str, payload: &Value) -> Result<(), WorkflowError> {
        self.get_instance(id)?;
        self.store.send_event(id, event_type, payload, self.clock.epoch_ms())
    }

    /// Re-invokes every `running` instance — call once at binding init after
    /// a process restart. Memoized steps replay instantly; sleeps resume
    /// against wall-clock; waiting events remain waiting.
    pub fn recover_running(self: &Arc<Self>) -> Result<(), WorkflowError> {
        for row in self.store.list_running()? {
            self.spawn(row.id);
        }
        Ok(())
    }

    /// Aborts every running instance (generation drain, spec §4.8).
    pub fn terminate_all(&self) {
        let running: Vec<RunningInstance> = self.running.lock().drain().map(|(_, r)| r).collect();
        for running in running {
            running.control.terminate();
            running.handle.abort();
        }
    }

    pub fn running_count(&self) -> usize {
        self.running.lock().len()
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

//! The `step` object passed to `run(event, step)` (spec §4.6 "Step
//! primitives"): memoized `do`, `sleep`/`sleepUntil`, and `waitForEvent`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use forge_core::Clock;

use crate::control::InstanceControl;
use crate::error::WorkflowError;
use crate::store::WorkflowStore;
use crate::types::Status;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: i64 = 1000;
const POLL_INTERVAL_MS: u64 = 20;

pub struct Step<C: Clock> {
    store: WorkflowStore,
    control: Arc<InstanceControl>,
    instance_id: String,
    clock: C,
}

impl<C: Clock> Step<C> {
    pub fn new(store: WorkflowStore, control: Arc<InstanceControl>, instance_id: impl Into<String>, clock: C) -> Self {
        Self { store, control, instance_id: instance_id.into(), clock }
    }

    async fn check_alive(&self) -> Result<(), WorkflowError> {
        if self.control.is_aborted() {
            return Err(WorkflowError::Aborted);
        }
        self.control.wait_if_paused().await;
        if self.control.is_aborted() {
            return Err(WorkflowError::Aborted);
        }
        Ok(())
    }

    /// `step.do(name, fn)` — memoized; retries on failure with exponential
    /// backoff up to [`DEFAULT_MAX_ATTEMPTS`]. A handler returning
    /// [`WorkflowError::NonRetryable`] terminates immediately.
    pub async fn do_step<F, Fut>(&self, name: &str, f: F) -> Result<Value, WorkflowError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Value, WorkflowError>>,
    {
        self.check_alive().await?;
        if let Some(output) = self.store.get_step_output(&self.instance_id, name)? {
            return Ok(output);
        }

        loop {
            self.check_alive().await?;
            match f().await {
                Ok(output) => {
                    self.store.put_step_output(&self.instance_id, name, &output, self.clock.epoch_ms())?;
                    return Ok(output);
                }
                Err(WorkflowError::NonRetryable(msg)) => return Err(WorkflowError::NonRetryable(msg)),
                Err(err) => {
                    let error_id = forge_core::id::new_uuid_v7().to_string();
                    let attempts = self.store.record_step_failure(&self.instance_id, name, &err.to_string(), &error_id, self.clock.epoch_ms())?;
                    if attempts >= DEFAULT_MAX_ATTEMPTS {
                        return Err(err);
                    }
                    let factor = 1i64.checked_shl(attempts.saturating_sub(1)).unwrap_or(i64::MAX);
                    let delay_ms = DEFAULT_BASE_DELAY_MS.saturating_mul(factor);
                    tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
                }
            }
        }
    }

    /// `step.sleep(name, duration)`.
    pub async fn sleep(&self, name: &str, duration: Duration) -> Result<(), WorkflowError> {
        let at_ms = self.clock.epoch_ms() + duration.as_millis() as i64;
        self.sleep_until_ms(&format!("sleep:{name}"), at_ms).await
    }

    /// `step.sleepUntil(name, date)`.
    pub async fn sleep_until(&self, name: &str, at_ms: i64) -> Result<(), WorkflowError> {
        self.sleep_until_ms(&format!("sleepUntil:{name}"), at_ms).await
    }

    async fn sleep_until_ms(&self, stored_name: &str, at_ms: i64) -> Result<(), WorkflowError> {
        self.check_alive().await?;
        let target = match self.store.get_step_output(&self.instance_id, stored_name)? {
            Some(existing) => existing.as_i64().unwrap_or(at_ms),
            None => {
                self.store.put_step_output(&self.instance_id, stored_name, &Value::from(at_ms), self.clock.epoch_ms())?;
                at_ms
            }
        };
        loop {
            self.check_alive().await?;
            let now = self.clock.epoch_ms();
            if now >= target {
                return Ok(());
            }
            let remaining = (target - now).clamp(0, POLL_INTERVAL_MS as i64).max(1);
            tokio::time::sleep(Duration::from_millis(remaining as u64)).await;
        }
    }

    /// `step.waitForEvent(name, {type, timeout?})` — sets `status=waiting`
    /// for the duration; resolves on a matching `sendEvent` or times out.
    pub async fn wait_for_event(&self, name: &str, event_type: &str, timeout: Option<Duration>) -> Result<Value, WorkflowError> {
        self.check_alive().await?;
        let stored_name = format!("waitForEvent:{name}");
        if let Some(payload) = self.store.get_step_output(&self.instance_id, &stored_name)? {
            return Ok(payload);
        }

        let now = self.clock.epoch_ms();
        self.store.set_status(&self.instance_id, Status::Waiting, now)?;
        let deadline = timeout.map(|t| now + t.as_millis() as i64);

        let result = loop {
            self.check_alive().await?;
            if let Some(payload) = self.store.take_matching_event(&self.instance_id, event_type)? {
                self.store.put_step_output(&self.instance_id, &stored_name, &payload, self.clock.epoch_ms())?;
                break Ok(payload);
            }
            if let Some(deadline) = deadline {
                if self.clock.epoch_ms() >= deadline {
                    break Err(WorkflowError::Timeout);
                }
            }
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        };

        self.store.set_status(&self.instance_id, Status::Running, self.clock.epoch_ms())?;
        result
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;

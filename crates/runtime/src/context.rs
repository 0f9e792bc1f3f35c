//! `ExecutionContext` (spec §4.9): the `waitUntil`/`_awaitAll` background-task
//! bag, plus the per-request subrequest budget bindings charge against.

use std::sync::Arc;

use tokio::task::JoinSet;

use forge_service::SubrequestCounter;

/// One per request (and per binding-spawned subwork: queue consumer, workflow
/// step, alarm). `waitUntil` keeps a background future alive past the point
/// the handler returns its response; `await_all` is the generation's join
/// point before it can become idle.
pub struct ExecutionContext {
    tasks: tokio::sync::Mutex<JoinSet<()>>,
    subrequests: Arc<SubrequestCounter>,
}

impl ExecutionContext {
    pub fn new(subrequests: Arc<SubrequestCounter>) -> Self {
        Self { tasks: tokio::sync::Mutex::new(JoinSet::new()), subrequests }
    }

    pub fn subrequests(&self) -> &Arc<SubrequestCounter> {
        &self.subrequests
    }

    /// `waitUntil(promise)` — appends to the internal bag.
    pub async fn wait_until<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.tasks.lock().await.spawn(future);
    }

    /// `_awaitAll()` — awaits every outstanding task, swallowing rejections
    /// (a panicking task is logged, never propagated).
    pub async fn await_all(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                tracing::warn!(error = %err, "waitUntil task panicked");
            }
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.tasks.lock().await.len()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;

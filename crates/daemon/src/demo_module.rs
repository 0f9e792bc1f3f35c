//! A runnable stand-in for the user handler module. `forge-daemon` has no
//! embedded script engine to load the `main` entry point into — the real
//! platform's `fetch`/`scheduled`/`queue`/`email` handlers are JS/Wasm the
//! runtime crates underneath (`forge-actor`, `forge-workflow`, `forge-queue`,
//! `forge-storage`, `forge-service`) are built to serve, not to execute.
//! `DemoModule` exercises that dispatch seam end-to-end so the binary is
//! runnable on its own; an embedder wires in a real `UserModule` instead.

use async_trait::async_trait;
use bytes::Bytes;

use forge_core::ForgeError;
use forge_queue::MessageBatch;
use forge_runtime::{DispatchOutcome, DispatchRequest, DispatchResponse, ExecutionContext, UserModule};

pub struct DemoModule;

#[async_trait]
impl UserModule for DemoModule {
    async fn fetch(&self, request: DispatchRequest, _ctx: &ExecutionContext) -> Result<DispatchOutcome, ForgeError> {
        let body = format!("{} {}\n", request.method, request.url);
        Ok(DispatchOutcome::Response(DispatchResponse::new(200, Bytes::from(body))))
    }

    async fn scheduled(&self, cron: &str, scheduled_time_ms: i64, _ctx: &ExecutionContext) -> Result<(), ForgeError> {
        tracing::info!(cron, scheduled_time_ms, "demo module: scheduled trigger fired");
        Ok(())
    }

    async fn queue(&self, batch: &MessageBatch, _ctx: &ExecutionContext) -> Result<(), ForgeError> {
        tracing::info!(count = batch.messages.len(), "demo module: queue batch delivered");
        batch.ack_all();
        Ok(())
    }

    async fn email(&self, from: &str, to: &str, raw_message: Bytes, _ctx: &ExecutionContext) -> Result<(), ForgeError> {
        tracing::info!(from, to, bytes = raw_message.len(), "demo module: email delivered");
        Ok(())
    }
}

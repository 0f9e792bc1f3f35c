//! The seam between the dispatcher and the loaded user module (spec §4.8
//! "Fetch dispatch"): a transport-agnostic request/response pair so the core
//! dispatch logic never depends on `axum`, plus the WebSocket-upgrade
//! outcome the dispatcher bridges onto a real connection.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use forge_core::ForgeError;
use forge_queue::MessageBatch;

use crate::context::ExecutionContext;

#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl DispatchResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }
}

/// The dispatcher-facing half of a paired WebSocket (spec §4.8 "WebSocket
/// upgrade"). The handler side keeps the other ends of both channels:
/// whatever it sends arrives here on `outbound` for the dispatcher to write
/// to the real client connection; whatever the dispatcher reads from the
/// real client connection it pushes onto `inbound` for the handler to
/// receive.
pub struct WebSocketPair {
    pub outbound: mpsc::UnboundedReceiver<WsMessage>,
    pub inbound: mpsc::UnboundedSender<WsMessage>,
}

/// A handler's response: either a plain HTTP response, or (status 101 plus a
/// paired socket) an upgrade the dispatcher bridges onto the real connection
/// (spec §4.8 "WebSocket upgrade").
pub enum DispatchOutcome {
    Response(DispatchResponse),
    Upgrade { response: DispatchResponse, socket: WebSocketPair },
}

/// The loaded user handler module (spec §4.8 "Fetch dispatch", §4.4.2,
/// §6). `forge-runtime` depends only on this seam; the concrete module
/// loader lives with whatever wires the binary together.
#[async_trait]
pub trait UserModule: Send + Sync {
    async fn fetch(
        &self,
        request: DispatchRequest,
        ctx: &ExecutionContext,
    ) -> Result<DispatchOutcome, ForgeError>;

    async fn scheduled(&self, cron: &str, scheduled_time_ms: i64, ctx: &ExecutionContext) -> Result<(), ForgeError>;

    async fn queue(&self, batch: &MessageBatch, ctx: &ExecutionContext) -> Result<(), ForgeError>;

    async fn email(&self, from: &str, to: &str, raw_message: Bytes, ctx: &ExecutionContext) -> Result<(), ForgeError>;
}

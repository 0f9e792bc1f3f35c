//! The HTTP surface (spec §6): `/cdn-cgi/handler/*` trigger routes plus the
//! catch-all that probes static assets (per `run_worker_first`) and hands
//! everything else to the active generation's `fetch`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes as AxumBytes;
use axum::extract::ws::{Message as AxumWsMessage, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use forge_assets::AssetServer;
use forge_core::Clock;
use forge_queue::{AckRequest, PullConsumer};

use crate::context::ExecutionContext;
use crate::error::RuntimeError;
use crate::handler::{DispatchOutcome, DispatchRequest, DispatchResponse};
use crate::manager::GenerationManager;

pub struct DispatcherState<C: Clock> {
    pub manager: Arc<GenerationManager<C>>,
    pub clock: C,
    pub assets: Option<Arc<AssetServer>>,
    /// Compiled `run_worker_first` globs (spec §4.8: "boolean or glob
    /// list"; `Config` normalizes the bool form to `["*"]` or `[]`).
    pub run_worker_first: Vec<Regex>,
    pub queues: HashMap<String, Arc<PullConsumer<C>>>,
}

impl<C: Clock> DispatcherState<C> {
    fn worker_runs_first(&self, path: &str) -> bool {
        self.run_worker_first.iter().any(|re| re.is_match(path))
    }
}

/// Translates a `run_worker_first` glob (`*` = any run of characters) into
/// an anchored regex.
pub fn compile_glob(glob: &str) -> Result<Regex, RuntimeError> {
    let mut pattern = String::from("^");
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| RuntimeError::InvalidCron(format!("invalid run_worker_first glob '{glob}': {e}")))
}

pub fn router<C: Clock>(state: Arc<DispatcherState<C>>) -> Router {
    Router::new()
        .route("/cdn-cgi/handler/queues/:queue/messages/pull", post(pull_handler::<C>))
        .route("/cdn-cgi/handler/queues/:queue/messages/ack", post(ack_handler::<C>))
        .route("/cdn-cgi/handler/scheduled", get(scheduled_handler::<C>))
        .route("/cdn-cgi/handler/email", post(email_handler::<C>))
        .fallback(catch_all::<C>)
        .with_state(state)
}

#[derive(Deserialize)]
struct PullQuery {
    batch_size: Option<u32>,
    visibility_timeout_ms: Option<u64>,
}

#[derive(Serialize)]
struct PullMessageWire {
    lease_id: String,
    id: String,
    timestamp: String,
    body: serde_json::Value,
    attempts: i64,
}

#[derive(Serialize)]
struct PullResponseWire {
    messages: Vec<PullMessageWire>,
}

fn decoded_body_to_json(body: forge_queue::DecodedBody) -> serde_json::Value {
    use base64::Engine;
    match body {
        forge_queue::DecodedBody::Json(v) => v,
        forge_queue::DecodedBody::Text(s) => serde_json::Value::String(s),
        forge_queue::DecodedBody::Bytes(b) => {
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
    }
}

async fn pull_handler<C: Clock>(
    State(state): State<Arc<DispatcherState<C>>>,
    Path(queue): Path<String>,
    Query(query): Query<PullQuery>,
) -> Response {
    let Some(consumer) = state.queues.get(&queue) else {
        return runtime_error_response(RuntimeError::UnknownQueue(queue));
    };
    match consumer.pull(query.batch_size, query.visibility_timeout_ms) {
        Ok(messages) => {
            let wire = PullResponseWire {
                messages: messages
                    .into_iter()
                    .map(|m| PullMessageWire {
                        lease_id: m.lease_id,
                        id: m.id,
                        timestamp: chrono::DateTime::<chrono::Utc>::from_timestamp_millis(m.timestamp)
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_default(),
                        body: decoded_body_to_json(m.body),
                        attempts: m.attempts,
                    })
                    .collect(),
            };
            axum::Json(wire).into_response()
        }
        Err(err) => runtime_error_response(RuntimeError::Queue(err)),
    }
}

#[derive(Deserialize)]
struct AckItemWire {
    lease_id: String,
}

#[derive(Deserialize)]
struct RetryItemWire {
    lease_id: String,
    delay_seconds: Option<u32>,
}

#[derive(Deserialize, Default)]
struct AckBodyWire {
    #[serde(default)]
    acks: Vec<AckItemWire>,
    #[serde(default)]
    retries: Vec<RetryItemWire>,
}

#[derive(Serialize)]
struct AckResponseWire {
    acked: usize,
    retried: usize,
}

async fn ack_handler<C: Clock>(
    State(state): State<Arc<DispatcherState<C>>>,
    Path(queue): Path<String>,
    body: AxumBytes,
) -> Response {
    let Some(consumer) = state.queues.get(&queue) else {
        return runtime_error_response(RuntimeError::UnknownQueue(queue));
    };
    let wire: AckBodyWire = if body.is_empty() {
        AckBodyWire::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(w) => w,
            Err(_) => return StatusCode::BAD_REQUEST.into_response(),
        }
    };
    let request = AckRequest {
        acks: wire.acks.into_iter().map(|a| a.lease_id).collect(),
        retries: wire.retries.into_iter().map(|r| (r.lease_id, r.delay_seconds)).collect(),
    };
    match consumer.ack(request) {
        Ok(result) => axum::Json(AckResponseWire { acked: result.acked, retried: result.retried }).into_response(),
        Err(err) => runtime_error_response(RuntimeError::Queue(err)),
    }
}

async fn scheduled_handler<C: Clock>(
    State(state): State<Arc<DispatcherState<C>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(cron) = params.get("cron") else {
        return (StatusCode::BAD_REQUEST, "missing cron query parameter").into_response();
    };
    let Some(generation) = state.manager.active() else {
        return runtime_error_response(RuntimeError::NoActiveGeneration);
    };
    let ctx = ExecutionContext::new(Arc::new(forge_service::SubrequestCounter::default()));
    let now_ms = state.clock.epoch_ms();
    match generation.module().scheduled(cron, now_ms, &ctx).await {
        Ok(()) => {
            ctx.await_all().await;
            StatusCode::OK.into_response()
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn email_handler<C: Clock>(
    State(state): State<Arc<DispatcherState<C>>>,
    Query(params): Query<HashMap<String, String>>,
    body: AxumBytes,
) -> Response {
    let from = params.get("from").cloned().unwrap_or_default();
    let to = params.get("to").cloned().unwrap_or_default();
    let Some(generation) = state.manager.active() else {
        return runtime_error_response(RuntimeError::NoActiveGeneration);
    };
    let ctx = ExecutionContext::new(Arc::new(forge_service::SubrequestCounter::default()));
    match generation.module().email(&from, &to, bytes::Bytes::from(body.to_vec()), &ctx).await {
        Ok(()) => {
            ctx.await_all().await;
            StatusCode::OK.into_response()
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn catch_all<C: Clock>(
    State(state): State<Arc<DispatcherState<C>>>,
    ws: Option<WebSocketUpgrade>,
    method: axum::http::Method,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: AxumBytes,
) -> Response {
    let path = uri.path().to_string();

    if let Some(assets) = &state.assets {
        if !state.worker_runs_first(&path) {
            let query = uri.query().unwrap_or("");
            let if_none_match = headers.get("if-none-match").and_then(|v| v.to_str().ok());
            if let Ok(asset_response) = assets.resolve(&path, query, if_none_match) {
                if asset_response.status != 404 {
                    return asset_response_to_axum(asset_response);
                }
            }
        }
    }

    let (generation, guard) = match state.manager.begin_request() {
        Ok(pair) => pair,
        Err(err) => return runtime_error_response(err),
    };

    let request = DispatchRequest {
        method: method.to_string(),
        url: uri.to_string(),
        headers: headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect(),
        body: bytes::Bytes::from(body.to_vec()),
    };

    let ctx = Arc::new(ExecutionContext::new(Arc::new(forge_service::SubrequestCounter::default())));
    let outcome = generation.module().fetch(request, &ctx).await;

    let ctx_for_wait = ctx.clone();
    tokio::spawn(async move {
        ctx_for_wait.await_all().await;
        drop(guard);
    });

    match outcome {
        Ok(DispatchOutcome::Response(response)) => dispatch_response_to_axum(response),
        Ok(DispatchOutcome::Upgrade { response, socket }) => match ws {
            Some(ws) => ws.on_upgrade(move |real_socket| bridge_websocket(real_socket, socket)).into_response(),
            None => dispatch_response_to_axum(response),
        },
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

fn asset_response_to_axum(response: forge_assets::AssetResponse) -> Response {
    let mut builder = axum::http::Response::builder().status(response.status);
    for (k, v) in &response.headers {
        builder = builder.header(k, v);
    }
    let body = match response.body {
        forge_assets::AssetBody::File(path) => match std::fs::read(&path) {
            Ok(bytes) => axum::body::Body::from(bytes),
            Err(_) => axum::body::Body::empty(),
        },
        forge_assets::AssetBody::Empty => axum::body::Body::empty(),
    };
    builder.body(body).unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn dispatch_response_to_axum(response: DispatchResponse) -> Response {
    let mut builder = axum::http::Response::builder().status(response.status);
    for (k, v) in &response.headers {
        builder = builder.header(k, v);
    }
    builder
        .body(axum::body::Body::from(response.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn runtime_error_response(err: RuntimeError) -> Response {
    use forge_core::ErrorKind;
    let status = match err.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::LimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::NotSupported => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Aborted => StatusCode::GONE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::HandlerError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string()).into_response()
}

/// Bridges the real axum WebSocket onto the handler's `WebSocketPair` (spec
/// §4.8 "upgrade the server connection and bridge server↔client events").
async fn bridge_websocket(real_socket: axum::extract::ws::WebSocket, mut pair: crate::handler::WebSocketPair) {
    let (mut sender, mut receiver) = real_socket.split();
    loop {
        tokio::select! {
            outgoing = pair.outbound.recv() => {
                match outgoing {
                    Some(msg) => {
                        if sender.send(tungstenite_to_axum(msg)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(msg)) => {
                        if pair.inbound.send(axum_to_tungstenite(msg)).is_err() {
                            break;
                        }
                    }
                    _ => break,
                }
            }
        }
    }
}

fn tungstenite_to_axum(msg: WsMessage) -> AxumWsMessage {
    match msg {
        WsMessage::Text(t) => AxumWsMessage::Text(t.to_string()),
        WsMessage::Binary(b) => AxumWsMessage::Binary(b.to_vec()),
        WsMessage::Ping(b) => AxumWsMessage::Ping(b.to_vec()),
        WsMessage::Pong(b) => AxumWsMessage::Pong(b.to_vec()),
        WsMessage::Close(_) | WsMessage::Frame(_) => AxumWsMessage::Close(None),
    }
}

fn axum_to_tungstenite(msg: AxumWsMessage) -> WsMessage {
    match msg {
        AxumWsMessage::Text(t) => WsMessage::Text(t.into()),
        AxumWsMessage::Binary(b) => WsMessage::Binary(b.into()),
        AxumWsMessage::Ping(b) => WsMessage::Ping(b.into()),
        AxumWsMessage::Pong(b) => WsMessage::Pong(b.into()),
        AxumWsMessage::Close(_) => WsMessage::Close(None),
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

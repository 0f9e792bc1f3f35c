use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use tower::ServiceExt;

use forge_core::{FakeClock, ForgeError};
use forge_queue::{MessageBatch, MessageBody, Producer, PullConsumer, SendOptions};
use forge_storage::Db;

use super::*;
use crate::context::ExecutionContext;
use crate::generation::Generation;
use crate::handler::{DispatchOutcome, DispatchRequest, DispatchResponse, UserModule};
use crate::manager::{GenerationManager, DEFAULT_GRACE_PERIOD_MS};

struct EchoModule;

#[async_trait]
impl UserModule for EchoModule {
    async fn fetch(&self, request: DispatchRequest, _ctx: &ExecutionContext) -> Result<DispatchOutcome, ForgeError> {
        Ok(DispatchOutcome::Response(DispatchResponse::new(200, Bytes::from(request.url))))
    }
    async fn scheduled(&self, _cron: &str, _scheduled_time_ms: i64, _ctx: &ExecutionContext) -> Result<(), ForgeError> {
        Ok(())
    }
    async fn queue(&self, _batch: &MessageBatch, _ctx: &ExecutionContext) -> Result<(), ForgeError> {
        Ok(())
    }
    async fn email(&self, _from: &str, _to: &str, _raw_message: Bytes, _ctx: &ExecutionContext) -> Result<(), ForgeError> {
        Ok(())
    }
}

fn manager_with_echo() -> Arc<GenerationManager<FakeClock>> {
    let manager = GenerationManager::new(FakeClock::new(), DEFAULT_GRACE_PERIOD_MS);
    manager.reload(Generation::new(Generation::next_id(), Arc::new(EchoModule), vec![], 0));
    manager
}

fn state_without_assets() -> Arc<DispatcherState<FakeClock>> {
    Arc::new(DispatcherState {
        manager: manager_with_echo(),
        clock: FakeClock::new(),
        assets: None,
        run_worker_first: vec![],
        queues: HashMap::new(),
    })
}

#[test]
fn compile_glob_translates_star_to_any_run_of_characters() {
    let re = compile_glob("/api/*").unwrap();
    assert!(re.is_match("/api/widgets"));
    assert!(!re.is_match("/other/widgets"));
}

#[tokio::test]
async fn catch_all_dispatches_to_the_active_generation() {
    let app = router(state_without_assets());
    let response = app.oneshot(Request::builder().uri("/anything").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn catch_all_returns_503_equivalent_with_no_active_generation() {
    let state = Arc::new(DispatcherState {
        manager: GenerationManager::new(FakeClock::new(), DEFAULT_GRACE_PERIOD_MS),
        clock: FakeClock::new(),
        assets: None,
        run_worker_first: vec![],
        queues: HashMap::new(),
    });
    let app = router(state);
    let response = app.oneshot(Request::builder().uri("/anything").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn catch_all_serves_a_static_asset_before_the_handler_by_default() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hello.txt"), b"asset body").unwrap();
    let assets = Arc::new(
        forge_assets::AssetServer::open(dir.path(), forge_core::config::HtmlHandling::None, forge_core::config::NotFoundHandling::None)
            .unwrap(),
    );
    let state = Arc::new(DispatcherState {
        manager: manager_with_echo(),
        clock: FakeClock::new(),
        assets: Some(assets),
        run_worker_first: vec![],
        queues: HashMap::new(),
    });
    let app = router(state);
    let response = app.oneshot(Request::builder().uri("/hello.txt").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"asset body");
}

#[tokio::test]
async fn run_worker_first_routes_a_matching_path_straight_to_the_handler() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("api.txt"), b"should not be served").unwrap();
    let assets = Arc::new(
        forge_assets::AssetServer::open(dir.path(), forge_core::config::HtmlHandling::None, forge_core::config::NotFoundHandling::None)
            .unwrap(),
    );
    let state = Arc::new(DispatcherState {
        manager: manager_with_echo(),
        clock: FakeClock::new(),
        assets: Some(assets),
        run_worker_first: vec![compile_glob("/api.txt").unwrap()],
        queues: HashMap::new(),
    });
    let app = router(state);
    let response = app.oneshot(Request::builder().uri("/api.txt").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_ne!(&body[..], b"should not be served");
}

#[tokio::test]
async fn scheduled_handler_requires_a_cron_query_parameter() {
    let app = router(state_without_assets());
    let response = app.oneshot(Request::builder().uri("/cdn-cgi/handler/scheduled").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scheduled_handler_invokes_the_active_generations_module() {
    let app = router(state_without_assets());
    let response = app
        .oneshot(Request::builder().uri("/cdn-cgi/handler/scheduled?cron=*+*+*+*+*").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn email_handler_feeds_the_raw_body_to_the_active_generation() {
    let app = router(state_without_assets());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cdn-cgi/handler/email?from=a@example.com&to=b@example.com")
                .body(Body::from("From: a@example.com\r\n\r\nhi"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

fn queue_state(queue_name: &str) -> (tempfile::TempDir, Arc<DispatcherState<FakeClock>>) {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(dir.path()).unwrap();
    let clock = FakeClock::new();
    let mut queues = HashMap::new();
    queues.insert(queue_name.to_string(), Arc::new(PullConsumer::new(db.clone(), queue_name, clock.clone())));
    let producer = Producer::new(db, queue_name, clock.clone());
    producer.send(MessageBody::Text("hello".to_string()), SendOptions::default()).unwrap();
    let state = Arc::new(DispatcherState {
        manager: manager_with_echo(),
        clock,
        assets: None,
        run_worker_first: vec![],
        queues,
    });
    (dir, state)
}

#[tokio::test]
async fn pull_handler_returns_pending_messages_as_json() {
    let (_dir, state) = queue_state("emails");
    let app = router(state);
    let response = app
        .oneshot(Request::builder().method("POST").uri("/cdn-cgi/handler/queues/emails/messages/pull").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["messages"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["messages"][0]["body"], serde_json::json!("hello"));
}

#[tokio::test]
async fn pull_handler_404s_for_an_unknown_queue() {
    let (_dir, state) = queue_state("emails");
    let app = router(state);
    let response = app
        .oneshot(Request::builder().method("POST").uri("/cdn-cgi/handler/queues/missing/messages/pull").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ack_handler_acks_a_leased_message() {
    let (_dir, state) = queue_state("emails");
    let app = state.clone();
    let router_app = router(state);
    let pull_response = router_app
        .clone()
        .oneshot(Request::builder().method("POST").uri("/cdn-cgi/handler/queues/emails/messages/pull").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = axum::body::to_bytes(pull_response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let lease_id = parsed["messages"][0]["lease_id"].as_str().unwrap().to_string();
    let _ = app;

    let ack_body = serde_json::json!({ "acks": [{ "lease_id": lease_id }] });
    let ack_response = router_app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cdn-cgi/handler/queues/emails/messages/ack")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&ack_body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(ack_response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(ack_response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["acked"], 1);
}

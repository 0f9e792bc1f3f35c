use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use forge_core::{FakeClock, ForgeError};
use forge_queue::MessageBatch;

use super::*;
use crate::context::ExecutionContext;
use crate::handler::{DispatchOutcome, DispatchRequest, DispatchResponse};

struct NullModule;

#[async_trait]
impl UserModule for NullModule {
    async fn fetch(&self, _request: DispatchRequest, _ctx: &ExecutionContext) -> Result<DispatchOutcome, ForgeError> {
        Ok(DispatchOutcome::Response(DispatchResponse::new(200, Bytes::new())))
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

struct RecordingBinding {
    stopped: Arc<std::sync::atomic::AtomicBool>,
    sockets: usize,
}

#[async_trait]
impl OwnedBinding for RecordingBinding {
    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
    fn accepted_socket_count(&self) -> usize {
        self.sockets
    }
}

fn generation(owned: Vec<Arc<dyn OwnedBinding>>) -> Arc<Generation> {
    Generation::new(Generation::next_id(), Arc::new(NullModule), owned, 0)
}

#[test]
fn next_id_is_strictly_increasing() {
    let a = Generation::next_id();
    let b = Generation::next_id();
    assert!(b > a);
}

#[test]
fn a_fresh_generation_is_active_and_idle() {
    let gen = generation(vec![]);
    assert_eq!(gen.state(), GenerationState::Active);
    assert!(gen.is_idle());
}

#[test]
fn an_in_flight_request_makes_the_generation_not_idle() {
    let gen = generation(vec![]);
    let guard = gen.begin_request();
    assert_eq!(gen.active_request_count(), 1);
    assert!(!gen.is_idle());
    drop(guard);
    assert_eq!(gen.active_request_count(), 0);
    assert!(gen.is_idle());
}

#[test]
fn an_accepted_socket_on_an_owned_binding_makes_the_generation_not_idle() {
    let stopped = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let binding: Arc<dyn OwnedBinding> = Arc::new(RecordingBinding { stopped, sockets: 1 });
    let gen = generation(vec![binding]);
    assert!(!gen.is_idle());
}

#[tokio::test]
async fn stop_tears_down_every_owned_binding_and_is_idempotent() {
    let stopped = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let binding: Arc<dyn OwnedBinding> = Arc::new(RecordingBinding { stopped: stopped.clone(), sockets: 0 });
    let gen = generation(vec![binding]);
    gen.stop(100).await;
    assert!(stopped.load(Ordering::SeqCst));
    assert_eq!(gen.state(), GenerationState::Stopped);
    gen.stop(200).await;
}

#[tokio::test]
async fn drain_until_stopped_stops_as_soon_as_the_generation_goes_idle() {
    let stopped = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let binding: Arc<dyn OwnedBinding> = Arc::new(RecordingBinding { stopped: stopped.clone(), sockets: 0 });
    let gen = generation(vec![binding]);
    let guard = gen.begin_request();
    let clock = FakeClock::new();

    let handle = tokio::spawn(drain_until_stopped(gen.clone(), 60_000, clock.clone()));
    tokio::time::sleep(Duration::from_millis(70)).await;
    assert_eq!(gen.state(), GenerationState::Draining);
    assert!(!stopped.load(Ordering::SeqCst));

    drop(guard);
    tokio::time::timeout(Duration::from_millis(500), handle).await.unwrap().unwrap();
    assert!(stopped.load(Ordering::SeqCst));
    assert_eq!(gen.state(), GenerationState::Stopped);
}

#[tokio::test]
async fn drain_until_stopped_force_stops_once_the_grace_period_elapses() {
    let stopped = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let binding: Arc<dyn OwnedBinding> = Arc::new(RecordingBinding { stopped: stopped.clone(), sockets: 0 });
    let gen = generation(vec![binding]);
    let _guard = gen.begin_request(); // never dropped — generation stays busy

    let clock = FakeClock::new();
    let handle = tokio::spawn(drain_until_stopped(gen.clone(), 1_000, clock.clone()));
    tokio::time::sleep(Duration::from_millis(70)).await;
    assert!(!stopped.load(Ordering::SeqCst));

    clock.advance(Duration::from_millis(2_000));
    tokio::time::timeout(Duration::from_millis(500), handle).await.unwrap().unwrap();
    assert!(stopped.load(Ordering::SeqCst));
}

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use forge_core::FakeClock;
use serde_json::Value;

use crate::executor::{RpcRequest, RpcResponse};

struct CountingObject {
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl DurableObject for CountingObject {
    async fn fetch(&self, request: RpcRequest) -> Result<RpcResponse, ActorError> {
        Ok(RpcResponse { status: 200, headers: vec![], body: request.body })
    }
    async fn call(&self, _method: &str, args: Value) -> Result<Value, ActorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(args)
    }
    async fn get_property(&self, prop: &str) -> Result<Value, ActorError> {
        Ok(Value::String(prop.to_string()))
    }
    async fn alarm(&self, _retry_count: u32, _is_retry: bool) -> Result<(), ActorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn namespace(eviction_timeout_ms: i64) -> (tempfile::TempDir, Arc<AtomicUsize>, Arc<Namespace<FakeClock, u32>>) {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(dir.path()).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let factory_calls = calls.clone();
    let factory: ObjectFactory = Arc::new(move |_id| Arc::new(CountingObject { calls: factory_calls.clone() }) as Arc<dyn DurableObject>);
    let ns = Arc::new(Namespace::new(
        "rooms",
        db,
        dir.path().join("do-sql"),
        FakeClock::new(),
        factory,
        ExecutorKind::InProcess,
        eviction_timeout_ms,
    ));
    (dir, calls, ns)
}

#[test]
fn same_id_returns_the_same_cached_instance() {
    let (_dir, _calls, ns) = namespace(60_000);
    let id = ns.id_from_name("alice");
    let a = ns.get(id.clone());
    let b = ns.get(id);
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn id_from_name_is_deterministic() {
    let (_dir, _calls, ns) = namespace(60_000);
    assert_eq!(ns.id_from_name("alice"), ns.id_from_name("alice"));
    assert_ne!(ns.id_from_name("alice"), ns.id_from_name("bob"));
}

#[tokio::test]
async fn evicted_instance_is_lazily_recreated_with_storage_intact() {
    let (_dir, _calls, ns) = namespace(0);
    let id = ns.id_from_name("alice");
    let first = ns.get(id.clone());
    first.kv().put("k", &Value::from(42)).unwrap();

    ns.sweep_evictable().await;
    assert_eq!(ns.instance_count(), 0);

    let second = ns.get(id);
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.kv().get("k").unwrap(), Some(Value::from(42)));
}

#[tokio::test]
async fn instance_with_accepted_socket_is_not_swept() {
    let (_dir, _calls, ns) = namespace(0);
    let id = ns.id_from_name("alice");
    let instance = ns.get(id);
    instance.accept_websocket(1u32, vec![]).unwrap();
    ns.sweep_evictable().await;
    assert_eq!(ns.instance_count(), 1);
}

#[tokio::test]
async fn rearm_persisted_alarms_refires_through_the_namespace() {
    let (_dir, calls, ns) = namespace(60_000);
    let id = ns.id_from_name("alice");
    ns.get(id.clone()).set_alarm(0).unwrap();

    ns.rearm_persisted_alarms().unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(ns.get(id).get_alarm().unwrap(), None);
}

#[tokio::test]
async fn destroy_all_clears_every_instance() {
    let (_dir, _calls, ns) = namespace(60_000);
    ns.get(ns.id_from_name("alice"));
    ns.get(ns.id_from_name("bob"));
    assert_eq!(ns.instance_count(), 2);
    ns.destroy_all().await;
    assert_eq!(ns.instance_count(), 0);
}

use super::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct MockObject {
    calls: Arc<parking_lot::Mutex<Vec<String>>>,
    background_flag: Arc<AtomicBool>,
    fail_alarm: AtomicBool,
}

#[async_trait]
impl DurableObject for MockObject {
    async fn fetch(&self, request: RpcRequest) -> Result<RpcResponse, ActorError> {
        self.calls.lock().push(format!("fetch:{}", request.url));
        Ok(RpcResponse { status: 200, headers: vec![], body: request.body })
    }

    async fn call(&self, method: &str, args: Value) -> Result<Value, ActorError> {
        self.calls.lock().push(format!("call:{method}"));
        if method == "spawnBackground" {
            let flag = self.background_flag.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                flag.store(true, Ordering::SeqCst);
            });
        }
        Ok(args)
    }

    async fn get_property(&self, prop: &str) -> Result<Value, ActorError> {
        Ok(Value::String(prop.to_string()))
    }

    async fn alarm(&self, _retry_count: u32, _is_retry: bool) -> Result<(), ActorError> {
        if self.fail_alarm.load(Ordering::SeqCst) {
            Err(ActorError::Handler("boom".to_string()))
        } else {
            Ok(())
        }
    }
}

fn mock() -> (Arc<MockObject>, Arc<parking_lot::Mutex<Vec<String>>>, Arc<AtomicBool>) {
    let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let flag = Arc::new(AtomicBool::new(false));
    let obj = Arc::new(MockObject { calls: calls.clone(), background_flag: flag.clone(), fail_alarm: AtomicBool::new(false) });
    (obj, calls, flag)
}

#[tokio::test]
async fn in_process_executes_rpc_and_fetch() {
    let (obj, calls, _flag) = mock();
    let executor = InProcessExecutor::new(obj);
    let v = executor.execute_rpc("ping", Value::Bool(true)).await.unwrap();
    assert_eq!(v, Value::Bool(true));
    let resp = executor
        .execute_fetch(RpcRequest { method: "GET".into(), url: "/x".into(), headers: vec![], body: bytes::Bytes::new() })
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(*calls.lock(), vec!["call:ping".to_string(), "fetch:/x".to_string()]);
}

#[tokio::test]
async fn in_process_calls_serialize_under_concurrency() {
    let (obj, _calls, _flag) = mock();
    let executor = Arc::new(InProcessExecutor::new(obj));
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    for i in 0..4 {
        let executor = executor.clone();
        let order = order.clone();
        handles.push(tokio::spawn(async move {
            let _ = executor.execute_rpc("m", Value::from(i)).await;
            order.lock().push(i);
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    assert_eq!(order.lock().len(), 4);
}

#[tokio::test]
async fn in_process_dispose_rejects_subsequent_calls() {
    let (obj, _calls, _flag) = mock();
    let executor = InProcessExecutor::new(obj);
    executor.dispose().await;
    assert!(executor.is_aborted());
    let err = executor.execute_rpc("m", Value::Null).await.unwrap_err();
    assert!(matches!(err, ActorError::Disposed));
}

#[tokio::test]
async fn in_process_is_blocked_during_init_barrier() {
    let (obj, _calls, _flag) = mock();
    let executor = Arc::new(InProcessExecutor::new(obj));
    assert!(!executor.is_blocked());
    let barrier_executor = executor.clone();
    let barrier = tokio::spawn(async move {
        barrier_executor
            .block_concurrency_while(|| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
            .await;
    });
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(executor.is_blocked());
    barrier.await.unwrap();
    assert!(!executor.is_blocked());
}

#[tokio::test]
async fn isolated_executes_rpc_on_worker_thread() {
    let (obj, _calls, _flag) = mock();
    let executor = IsolatedExecutor::new(obj);
    let v = executor.execute_rpc("ping", Value::from(7)).await.unwrap();
    assert_eq!(v, Value::from(7));
    let prop = executor.execute_rpc_get("name").await.unwrap();
    assert_eq!(prop, Value::String("name".to_string()));
    executor.dispose().await;
}

#[tokio::test]
async fn isolated_dispose_rejects_in_flight_and_future_commands() {
    let (obj, _calls, _flag) = mock();
    let executor = IsolatedExecutor::new(obj);
    executor.dispose().await;
    let err = executor.execute_rpc("m", Value::Null).await.unwrap_err();
    assert!(matches!(err, ActorError::Disposed));
    assert!(executor.is_aborted());
}

#[tokio::test]
async fn isolated_fire_and_forget_work_dies_with_the_worker() {
    let (obj, _calls, flag) = mock();
    let executor = IsolatedExecutor::new(obj);
    executor.execute_rpc("spawnBackground", Value::Null).await.unwrap();
    executor.dispose().await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(!flag.load(Ordering::SeqCst), "background work must not survive dispose()");
}

#[tokio::test]
async fn isolated_alarm_failure_propagates_as_handler_error() {
    let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let flag = Arc::new(AtomicBool::new(false));
    let obj = Arc::new(MockObject { calls, background_flag: flag, fail_alarm: AtomicBool::new(true) });
    let executor = IsolatedExecutor::new(obj);
    let err = executor.execute_alarm(0, false).await.unwrap_err();
    assert!(matches!(err, ActorError::Handler(_)));
}

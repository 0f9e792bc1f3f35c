use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[test]
fn backoff_doubles_and_caps_at_max() {
    assert_eq!(backoff_delay_ms(0, 1000, 30_000), 1000);
    assert_eq!(backoff_delay_ms(1, 1000, 30_000), 2000);
    assert_eq!(backoff_delay_ms(5, 1000, 30_000), 30_000.min(32_000));
    assert_eq!(backoff_delay_ms(20, 1000, 30_000), 30_000);
}

fn store() -> (tempfile::TempDir, AlarmStore) {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(dir.path()).unwrap();
    (dir, AlarmStore::new(db, "counters"))
}

#[test]
fn set_then_get_round_trips() {
    let (_dir, store) = store();
    store.set("a", 1234).unwrap();
    assert_eq!(store.get("a").unwrap(), Some(1234));
}

#[test]
fn delete_clears_the_alarm() {
    let (_dir, store) = store();
    store.set("a", 1234).unwrap();
    store.delete("a").unwrap();
    assert_eq!(store.get("a").unwrap(), None);
}

#[test]
fn list_all_returns_every_persisted_alarm() {
    let (_dir, store) = store();
    store.set("a", 1).unwrap();
    store.set("b", 2).unwrap();
    let mut all = store.list_all().unwrap();
    all.sort();
    assert_eq!(all, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
}

#[tokio::test]
async fn armed_alarm_fires_once_on_success() {
    let (_dir, store) = store();
    store.set("a", 0).unwrap();
    let scheduler = Arc::new(AlarmScheduler::new(store));
    let fired = Arc::new(AtomicU32::new(0));
    let fired_clone = fired.clone();
    let on_fire: FireFn = Arc::new(move |_retry, _is_retry| {
        let fired = fired_clone.clone();
        Box::pin(async move {
            fired.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });
    scheduler.arm("a".to_string(), 0, 0, on_fire);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.store().get("a").unwrap(), None);
}

#[tokio::test]
async fn failing_alarm_is_retried_with_backoff() {
    let (_dir, store) = store();
    store.set("a", 0).unwrap();
    let mut scheduler = AlarmScheduler::new(store);
    scheduler.base_delay_ms = 5;
    scheduler.max_delay_ms = 100;
    let scheduler = Arc::new(scheduler);
    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_clone = attempts.clone();
    let on_fire: FireFn = Arc::new(move |_retry, _is_retry| {
        let attempts = attempts_clone.clone();
        Box::pin(async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(ActorError::Handler("boom".to_string()))
            } else {
                Ok(())
            }
        })
    });
    scheduler.arm("a".to_string(), 0, 0, on_fire);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

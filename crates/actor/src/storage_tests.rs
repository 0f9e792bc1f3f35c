use super::*;
use forge_storage::Db;

fn kv() -> (tempfile::TempDir, ActorKv) {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(dir.path()).unwrap();
    (dir, ActorKv::new(db, "counters", "abc123"))
}

#[test]
fn put_then_get_round_trips() {
    let (_dir, kv) = kv();
    kv.put("count", &serde_json::json!(1)).unwrap();
    assert_eq!(kv.get("count").unwrap(), Some(serde_json::json!(1)));
}

#[test]
fn missing_key_returns_none() {
    let (_dir, kv) = kv();
    assert_eq!(kv.get("nope").unwrap(), None);
}

#[test]
fn delete_removes_key() {
    let (_dir, kv) = kv();
    kv.put("a", &serde_json::json!(1)).unwrap();
    assert!(kv.delete("a").unwrap());
    assert_eq!(kv.get("a").unwrap(), None);
}

#[test]
fn delete_all_clears_namespace_scoped_rows_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(dir.path()).unwrap();
    let a = ActorKv::new(db.clone(), "ns", "a");
    let b = ActorKv::new(db, "ns", "b");
    a.put("x", &serde_json::json!(1)).unwrap();
    b.put("x", &serde_json::json!(2)).unwrap();
    a.delete_all().unwrap();
    assert_eq!(a.get("x").unwrap(), None);
    assert_eq!(b.get("x").unwrap(), Some(serde_json::json!(2)));
}

#[test]
fn list_respects_prefix_and_limit() {
    let (_dir, kv) = kv();
    kv.put_many(&[
        ("a/1".to_string(), serde_json::json!(1)),
        ("a/2".to_string(), serde_json::json!(2)),
        ("b/1".to_string(), serde_json::json!(3)),
    ])
    .unwrap();
    let opts = ListOptions { prefix: Some("a/".to_string()), limit: Some(1), ..Default::default() };
    let results = kv.list(opts).unwrap();
    assert_eq!(results, vec![("a/1".to_string(), serde_json::json!(1))]);
}

#[test]
fn list_reverse_flips_sort_order() {
    let (_dir, kv) = kv();
    kv.put_many(&[("a".to_string(), serde_json::json!(1)), ("b".to_string(), serde_json::json!(2))]).unwrap();
    let results = kv.list(ListOptions { reverse: true, ..Default::default() }).unwrap();
    assert_eq!(results[0].0, "b");
}

#[test]
fn transaction_rolls_back_on_error() {
    let (_dir, kv) = kv();
    kv.put("a", &serde_json::json!(1)).unwrap();
    let result: Result<(), ActorError> = kv.transaction(|tx| {
        tx.put("a", &serde_json::json!(2))?;
        Err(ActorError::Handler("boom".to_string()))
    });
    assert!(result.is_err());
}

#[test]
fn sql_storage_is_isolated_per_instance_file() {
    let dir = tempfile::tempdir().unwrap();
    let sql_a = ActorSql::open(dir.path(), "counters", "a").unwrap();
    let sql_b = ActorSql::open(dir.path(), "counters", "b").unwrap();
    sql_a.exec("CREATE TABLE t (v INTEGER)", &[]).unwrap();
    sql_a.exec("INSERT INTO t VALUES (1)", &[]).unwrap();
    let err = sql_b.exec("SELECT * FROM t", &[]).unwrap_err();
    assert!(matches!(err, ActorError::Sqlite(_)));
}

#[test]
fn sql_one_errors_on_wrong_row_count() {
    let dir = tempfile::tempdir().unwrap();
    let sql = ActorSql::open(dir.path(), "counters", "a").unwrap();
    sql.exec("CREATE TABLE t (v INTEGER)", &[]).unwrap();
    let cursor = sql.exec("SELECT * FROM t", &[]).unwrap();
    assert!(cursor.one().is_err());
}

#[test]
fn sql_tracks_rows_read_and_written() {
    let dir = tempfile::tempdir().unwrap();
    let sql = ActorSql::open(dir.path(), "counters", "a").unwrap();
    sql.exec("CREATE TABLE t (v INTEGER)", &[]).unwrap();
    sql.exec("INSERT INTO t VALUES (1)", &[]).unwrap();
    sql.exec("INSERT INTO t VALUES (2)", &[]).unwrap();
    sql.exec("SELECT * FROM t", &[]).unwrap();
    assert_eq!(sql.rows_written(), 2);
    assert_eq!(sql.rows_read(), 2);
}

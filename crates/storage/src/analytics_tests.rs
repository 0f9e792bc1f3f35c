use super::*;
use crate::db::Db;
use forge_core::test_support::fixed_clock;

fn engine() -> AnalyticsEngine<forge_core::FakeClock> {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(dir.path()).unwrap();
    AnalyticsEngine::new(db, "requests", fixed_clock(1_700_000_000_000))
}

#[test]
fn accepts_a_point_within_limits() {
    let engine = engine();
    let point = DataPoint { indexes: vec!["region".into()], doubles: vec![1.0, 2.0], blobs: vec![b"ua".to_vec()] };
    engine.write_data_point(point).unwrap();
}

#[test]
fn rejects_more_than_one_index() {
    let engine = engine();
    let point = DataPoint { indexes: vec!["a".into(), "b".into()], ..Default::default() };
    assert!(engine.write_data_point(point).is_err());
}

#[test]
fn rejects_too_many_doubles() {
    let engine = engine();
    let point = DataPoint { doubles: vec![0.0; 21], ..Default::default() };
    assert!(engine.write_data_point(point).is_err());
}

#[test]
fn rejects_total_blob_bytes_over_16kib() {
    let engine = engine();
    let point = DataPoint { blobs: vec![vec![0u8; 17 * 1024]], ..Default::default() };
    assert!(engine.write_data_point(point).is_err());
}

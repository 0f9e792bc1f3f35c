use super::*;
use crate::db::Db;
use forge_core::test_support::fixed_clock;

fn bucket() -> R2Bucket<forge_core::FakeClock> {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(dir.path()).unwrap();
    R2Bucket::new(db, "test-bucket", fixed_clock(1_700_000_000_000))
}

#[test]
fn put_then_get_round_trips_bytes_and_etag() {
    let bucket = bucket();
    let bytes = b"hello world";
    bucket.put("greeting.txt", bytes, PutOptions::default()).unwrap();

    let got = bucket.get("greeting.txt").unwrap().unwrap();
    assert_eq!(got.body, bytes);
    assert_eq!(got.meta.etag, hex::encode(md5::compute(bytes).0));
}

#[test]
fn head_without_body_matches_get_metadata() {
    let bucket = bucket();
    bucket.put("k", b"data", PutOptions::default()).unwrap();
    let head = bucket.head("k").unwrap().unwrap();
    let get = bucket.get("k").unwrap().unwrap();
    assert_eq!(head.etag, get.meta.etag);
    assert_eq!(head.size, get.meta.size);
}

#[test]
fn delete_removes_both_metadata_and_blob() {
    let bucket = bucket();
    bucket.put("k", b"data", PutOptions::default()).unwrap();
    bucket.delete("k").unwrap();
    assert!(bucket.get("k").unwrap().is_none());
    assert!(bucket.head("k").unwrap().is_none());
}

#[test]
fn path_traversal_in_key_is_rejected() {
    let bucket = bucket();
    let err = bucket.put("../escape", b"data", PutOptions::default());
    assert!(err.is_err());
}

#[test]
fn list_paginates_lexicographically() {
    let bucket = bucket();
    for k in ["a", "b", "c"] {
        bucket.put(k, b"v", PutOptions::default()).unwrap();
    }
    let (page, cursor) = bucket.list(None, None, 2).unwrap();
    assert_eq!(page.iter().map(|o| o.key.clone()).collect::<Vec<_>>(), vec!["a", "b"]);
    assert!(cursor.is_some());
}

#[test]
fn multipart_upload_concatenates_parts_in_order() {
    let bucket = bucket();
    let mut upload = bucket.create_multipart_upload("multi.bin");
    upload.upload_part(b"part1-".to_vec());
    upload.upload_part(b"part2".to_vec());
    let obj = upload.complete(&bucket).unwrap();
    let got = bucket.get(&obj.key).unwrap().unwrap();
    assert_eq!(got.body, b"part1-part2");
}

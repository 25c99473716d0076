//! Gateway Service Tests
//!
//! Operations against an on-disk database file:
//! - identifier validation happens before any SQL is built
//! - inserted and uploaded rows read back unchanged
//! - an uploaded file is released exactly once on every path
//! - concurrent writers share one service

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use axum::body::Bytes;
use serde_json::{json, Map, Value};
use tablegate::database::Database;
use tablegate::gateway::{GatewayError, GatewayService, UploadedFile};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_service() -> (TempDir, GatewayService) {
    let tmp = TempDir::new().unwrap();
    let db = Database::open(&tmp.path().join("data").join("data_store.db")).unwrap();
    let service = GatewayService::new(db);
    service.create_table("t", "id INTEGER, value TEXT").unwrap();
    (tmp, service)
}

fn row(value: Value) -> Option<Map<String, Value>> {
    value.as_object().cloned()
}

fn tracked_file(name: &str, contents: &'static [u8], released: &Arc<AtomicUsize>) -> UploadedFile {
    let counter = Arc::clone(released);
    UploadedFile::new(name, Bytes::from_static(contents)).with_release_hook(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

const THREE_ROWS: &[u8] = b"id,value\n1,a\n2,b\n3,c\n";

// =============================================================================
// Identifier Tests
// =============================================================================

#[test]
fn test_hostile_table_names_rejected_everywhere() {
    let (_tmp, service) = setup_service();
    let released = Arc::new(AtomicUsize::new(0));

    for name in ["t t", "t'", "t;", "select", "t; DROP TABLE t", "1t", ""] {
        assert!(matches!(
            service.create_table(name, "id INTEGER"),
            Err(GatewayError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            service.insert(Some(name), row(json!({"id": 1}))),
            Err(GatewayError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            service.query(None, Some(name)),
            Err(GatewayError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            service.upload(name, tracked_file("data.csv", THREE_ROWS, &released)),
            Err(GatewayError::InvalidIdentifier(_))
        ));
    }

    // the table survived every attempt
    assert!(service.query(None, Some("t")).unwrap().is_empty());
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_rows_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("data_store.db");

    {
        let service = GatewayService::new(Database::open(&path).unwrap());
        service.create_table("t", "id INTEGER, value TEXT").unwrap();
        service.insert(Some("t"), row(json!({"id": 1, "value": "x"}))).unwrap();
        service.close().unwrap();
    }

    let service = GatewayService::new(Database::open(&path).unwrap());
    let rows = service.query(None, Some("t")).unwrap();
    assert_eq!(json!(rows), json!([{"id": 1, "value": "x"}]));
}

#[test]
fn test_csv_upload_reads_back_unchanged() {
    let (_tmp, service) = setup_service();
    let released = Arc::new(AtomicUsize::new(0));

    let inserted = service
        .upload("t", tracked_file("data.csv", THREE_ROWS, &released))
        .unwrap();
    assert_eq!(inserted, 3);

    let rows = service.query(Some("SELECT * FROM t ORDER BY id"), None).unwrap();
    assert_eq!(
        json!(rows),
        json!([
            {"id": 1, "value": "a"},
            {"id": 2, "value": "b"},
            {"id": 3, "value": "c"}
        ])
    );
}

#[test]
fn test_upload_layout_mismatch_is_database_error() {
    let (_tmp, service) = setup_service();
    let released = Arc::new(AtomicUsize::new(0));

    let err = service
        .upload(
            "t",
            tracked_file("wide.csv", b"id,value,extra\n1,a,z\n", &released),
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::Database(_)));
    assert!(service.query(None, Some("t")).unwrap().is_empty());
}

#[test]
fn test_upload_type_mismatch_is_database_error() {
    let (_tmp, service) = setup_service();
    let released = Arc::new(AtomicUsize::new(0));

    let err = service
        .upload(
            "t",
            tracked_file("bad.csv", b"id,value\nabc,1\n007,2\n", &released),
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::Database(_)));
    assert!(service.query(None, Some("t")).unwrap().is_empty());
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_insert_type_mismatch_is_database_error() {
    let (_tmp, service) = setup_service();

    let err = service
        .insert(Some("t"), row(json!({"id": "not-a-number", "value": "x"})))
        .unwrap_err();
    assert!(matches!(err, GatewayError::Database(_)));

    // a compatible row still goes in afterwards
    service
        .insert(Some("t"), row(json!({"id": 1, "value": "x"})))
        .unwrap();
    assert_eq!(service.query(None, Some("t")).unwrap().len(), 1);
}

#[test]
fn test_upload_into_missing_table_is_database_error() {
    let (_tmp, service) = setup_service();
    let released = Arc::new(AtomicUsize::new(0));

    let err = service
        .upload("missing", tracked_file("data.csv", THREE_ROWS, &released))
        .unwrap_err();
    match err {
        GatewayError::Database(msg) => assert!(msg.contains("missing")),
        other => panic!("unexpected {other:?}"),
    }
}

// =============================================================================
// Release Tests
// =============================================================================

#[test]
fn test_upload_releases_file_once_on_every_path() {
    let (_tmp, service) = setup_service();
    let released = Arc::new(AtomicUsize::new(0));

    // success
    service
        .upload("t", tracked_file("data.csv", THREE_ROWS, &released))
        .unwrap();
    assert_eq!(released.load(Ordering::SeqCst), 1);

    // invalid table name
    let _ = service.upload("bad name", tracked_file("data.csv", THREE_ROWS, &released));
    assert_eq!(released.load(Ordering::SeqCst), 2);

    // unsupported suffix
    let err = service
        .upload("t", tracked_file("data.txt", THREE_ROWS, &released))
        .unwrap_err();
    assert!(matches!(err, GatewayError::UnsupportedFormat));
    assert_eq!(released.load(Ordering::SeqCst), 3);

    // decode failure
    let err = service
        .upload("t", tracked_file("data.parquet", THREE_ROWS, &released))
        .unwrap_err();
    assert!(matches!(err, GatewayError::Parse(_)));
    assert_eq!(released.load(Ordering::SeqCst), 4);

    // only the successful upload touched the table
    assert_eq!(service.query(None, Some("t")).unwrap().len(), 3);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_inserts_all_land() {
    let (_tmp, service) = setup_service();
    let service = Arc::new(service);

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for i in 0..25 {
                    let id = worker * 100 + i;
                    service
                        .insert(Some("t"), row(json!({"id": id, "value": "w"})))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let rows = service
        .query(Some("SELECT COUNT(*) AS n FROM t"), None)
        .unwrap();
    assert_eq!(rows[0]["n"], json!(200));
}

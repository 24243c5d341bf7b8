use std::sync::{Arc, Mutex};

use ftp_sync_core::contract::{MockBlobStore, StoreError};
use ftp_sync_core::publish::{object_key, publish};
use tempfile::tempdir;

#[tokio::test]
async fn uploads_each_file_under_its_base_name() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("nested")).unwrap();
    let a = dir.path().join("a.csv");
    let b = dir.path().join("nested").join("b.csv");
    std::fs::write(&a, b"alpha").unwrap();
    std::fs::write(&b, b"beta").unwrap();

    let puts = Arc::new(Mutex::new(Vec::new()));
    let recorded = puts.clone();
    let mut store = MockBlobStore::new();
    store.expect_put_file().times(2).returning(move |key, local| {
        let content = std::fs::read(&local).unwrap();
        let size = content.len() as u64;
        recorded.lock().unwrap().push((key, content));
        Ok(size)
    });

    let report = publish(&store, &[a, b]).await;

    assert_eq!(report.uploaded, vec!["a.csv", "b.csv"]);
    assert!(report.failed.is_empty());
    assert_eq!(
        *puts.lock().unwrap(),
        vec![
            ("a.csv".to_string(), b"alpha".to_vec()),
            ("b.csv".to_string(), b"beta".to_vec()),
        ]
    );
}

#[tokio::test]
async fn colliding_base_names_are_uploaded_in_order() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("x").join("data.csv");
    let second = dir.path().join("y").join("data.csv");
    for (path, body) in [(&first, "first"), (&second, "second")] {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    let puts = Arc::new(Mutex::new(Vec::new()));
    let recorded = puts.clone();
    let mut store = MockBlobStore::new();
    store.expect_put_file().times(2).returning(move |key, local| {
        let content = std::fs::read_to_string(&local).unwrap();
        recorded.lock().unwrap().push((key, content));
        Ok(0)
    });

    let report = publish(&store, &[first, second]).await;

    assert_eq!(report.uploaded, vec!["data.csv", "data.csv"]);
    let puts = puts.lock().unwrap();
    assert_eq!(puts.last().unwrap(), &("data.csv".to_string(), "second".to_string()));
}

#[tokio::test]
async fn failed_upload_does_not_stop_the_rest() {
    let dir = tempdir().unwrap();
    let files: Vec<_> = ["1.csv", "2.csv", "3.csv"]
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, name).unwrap();
            path
        })
        .collect();

    let mut store = MockBlobStore::new();
    store.expect_put_file().times(3).returning(|key, _| {
        if key == "2.csv" {
            Err(StoreError::Backend("503 Server Busy".into()))
        } else {
            Ok(5)
        }
    });

    let report = publish(&store, &files).await;

    assert_eq!(report.uploaded, vec!["1.csv", "3.csv"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].local_path, files[1]);
    assert!(report.failed[0].error.contains("503"));
}

#[tokio::test]
async fn missing_local_file_is_reported_and_skipped() {
    let dir = tempdir().unwrap();
    let present = dir.path().join("present.csv");
    std::fs::write(&present, "ok").unwrap();
    let missing = dir.path().join("missing.csv");

    let mut store = MockBlobStore::new();
    store.expect_put_file().times(2).returning(|_, local| {
        std::fs::metadata(&local)
            .map(|m| m.len())
            .map_err(StoreError::from)
    });

    let report = publish(&store, &[missing.clone(), present]).await;

    assert_eq!(report.uploaded, vec!["present.csv"]);
    assert_eq!(report.failed[0].local_path, missing);
}

#[test]
fn object_key_is_the_file_name() {
    assert_eq!(
        object_key(std::path::Path::new("/tmp/run/sub/file.csv")).as_deref(),
        Some("file.csv")
    );
    assert_eq!(object_key(std::path::Path::new("/")), None);
}

use super::*;

fn temp_root(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "darkroom_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn fresh(name: &str, rows: u32, ripeness: u32) -> (PathBuf, DirStore) {
    let root = temp_root(name);
    let store = DirStore::open(&root, "bake").unwrap();
    store.reset_schema().unwrap();
    for y in 0..rows {
        store.create_bucket(RowIndex(y), Ripeness(ripeness)).unwrap();
    }
    (root, store)
}

#[test]
fn open_rejects_unsafe_schema_names() {
    let root = temp_root("dir_names");
    for bad in ["", "../x", "a b", "a/b"] {
        assert!(DirStore::open(&root, bad).is_err(), "{bad:?}");
    }
    assert!(DirStore::open(&root, "ok_name_1").is_ok());
}

#[test]
fn buckets_live_in_one_file_per_row() {
    let (root, store) = fresh("dir_layout", 2, 3);
    assert!(store.schema_dir().join("t_0.json").is_file());
    assert!(store.schema_dir().join("t_1.json").is_file());
    let raw = std::fs::read_to_string(store.schema_dir().join("t_1.json")).unwrap();
    assert_eq!(serde_json::from_str::<Vec<u32>>(&raw).unwrap(), vec![0, 1, 2]);
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn deletions_persist_across_reopen() {
    let (root, store) = fresh("dir_persist", 1, 8);
    let h = store.prepare_row_delete(RowIndex(0)).unwrap();
    h.execute(Threshold(5)).unwrap();
    h.execute(Threshold(5)).unwrap();
    h.execute(Threshold(1)).unwrap();
    drop(store);

    let reopened = DirStore::open(&root, "bake").unwrap();
    assert_eq!(reopened.bucket(RowIndex(0)).unwrap(), vec![5, 6, 7]);
    assert!(!reopened.schema_dir().join("t_0.json.tmp").exists());
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn prepare_on_missing_bucket_fails() {
    let (root, store) = fresh("dir_missing", 1, 2);
    assert!(matches!(
        store.prepare_row_delete(RowIndex(1)),
        Err(StoreError::MissingBucket(RowIndex(1)))
    ));
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn closed_handle_rejects_execute() {
    let (root, store) = fresh("dir_closed", 1, 2);
    let h = store.prepare_row_delete(RowIndex(0)).unwrap();
    h.close();
    assert!(matches!(h.execute(Threshold(2)), Err(StoreError::Closed(_))));
    assert_eq!(store.bucket(RowIndex(0)).unwrap(), vec![0, 1]);
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn reset_removes_previous_buckets() {
    let (root, store) = fresh("dir_reset", 2, 2);
    store.reset_schema().unwrap();
    assert!(store.schema_dir().is_dir());
    assert!(matches!(
        store.bucket(RowIndex(0)),
        Err(StoreError::MissingBucket(_))
    ));
    std::fs::remove_dir_all(&root).ok();
}

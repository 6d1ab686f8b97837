//! Integration tests for `FileStore` against temporary directories.

use scimmer_core::{MappingEntry, MappingStore};
use tempfile::TempDir;

use crate::{Error, FileStore};

fn entry(remote_id: &str) -> MappingEntry { MappingEntry::new(remote_id, "sum", true) }

// ─── Load ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_file_loads_empty() {
  let dir = TempDir::new().unwrap();
  let store = FileStore::load(dir.path().join("map.yaml")).await.unwrap();
  assert_eq!(store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn empty_file_loads_empty() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("map.yaml");
  std::fs::write(&path, "\n").unwrap();

  let store = FileStore::load(&path).await.unwrap();
  assert_eq!(store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn malformed_file_is_an_error() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("map.yaml");
  std::fs::write(&path, "uid=a: [this is: not, a mapping entry").unwrap();

  let result = FileStore::load(&path).await;
  assert!(matches!(result, Err(Error::Malformed { .. })));
}

#[tokio::test]
async fn reads_human_written_file() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("map.yaml");
  std::fs::write(
    &path,
    "uid=alice,dc=example,dc=org:\n  remoteId: r-1\n  checksum: abc\n  updatedAt: 2024-05-01T10:00:00Z\n  active: false\n",
  )
  .unwrap();

  let store = FileStore::load(&path).await.unwrap();
  let got = store.get("uid=alice,dc=example,dc=org").await.unwrap().unwrap();
  assert_eq!(got.remote_id, "r-1");
  assert_eq!(got.checksum, "abc");
  assert!(!got.active);
}

// ─── Get / put / remove ──────────────────────────────────────────────────────

#[tokio::test]
async fn put_overwrites_previous_entry() {
  let store = FileStore::in_memory();
  store.put("k".into(), entry("first")).await.unwrap();
  store.put("k".into(), entry("second")).await.unwrap();

  assert_eq!(store.get("k").await.unwrap().unwrap().remote_id, "second");
  assert_eq!(store.len().await.unwrap(), 1);
}

#[tokio::test]
async fn remove_returns_the_entry() {
  let store = FileStore::in_memory();
  store.put("k".into(), entry("r")).await.unwrap();

  let removed = store.remove("k").await.unwrap();
  assert_eq!(removed.map(|e| e.remote_id).as_deref(), Some("r"));
  assert!(store.get("k").await.unwrap().is_none());
  assert!(store.remove("k").await.unwrap().is_none());
}

#[tokio::test]
async fn clones_share_state() {
  let store = FileStore::in_memory();
  let clone = store.clone();
  clone.put("k".into(), entry("r")).await.unwrap();
  assert!(store.get("k").await.unwrap().is_some());
}

// ─── Flush ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn flush_then_load_round_trips() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("nested").join("map.yaml");

  let store = FileStore::load(&path).await.unwrap();
  store.put("uid=a".into(), entry("r-a")).await.unwrap();
  store.put("cn=g".into(), entry("r-g")).await.unwrap();
  store.flush().await.unwrap();

  let reloaded = FileStore::load(&path).await.unwrap();
  assert_eq!(reloaded.snapshot().await, store.snapshot().await);
}

#[tokio::test]
async fn flush_leaves_no_temp_files() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("map.yaml");

  let store = FileStore::load(&path).await.unwrap();
  store.put("k".into(), entry("r")).await.unwrap();
  store.flush().await.unwrap();
  store.flush().await.unwrap();

  let names: Vec<_> = std::fs::read_dir(dir.path())
    .unwrap()
    .map(|e| e.unwrap().file_name().into_string().unwrap())
    .collect();
  assert_eq!(names, vec!["map.yaml".to_string()]);
}

#[tokio::test]
async fn concurrent_puts_are_all_kept() {
  let store = FileStore::in_memory();
  let mut handles = Vec::new();
  for i in 0..32 {
    let store = store.clone();
    handles.push(tokio::spawn(async move {
      store.put(format!("uid={i}"), entry(&format!("r-{i}"))).await.unwrap();
    }));
  }
  for handle in handles {
    handle.await.unwrap();
  }
  assert_eq!(store.len().await.unwrap(), 32);
}

#[tokio::test]
async fn in_memory_flush_is_a_no_op() {
  let store = FileStore::in_memory();
  store.put("k".into(), entry("r")).await.unwrap();
  store.flush().await.unwrap();
  assert!(store.path().is_none());
}

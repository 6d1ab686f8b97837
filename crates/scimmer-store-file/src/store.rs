//! [`FileStore`]: the YAML-file implementation of [`MappingStore`].

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  sync::Arc,
};

use scimmer_core::{MappingEntry, MappingStore};
use tokio::{
  io::AsyncWriteExt as _,
  sync::{Mutex, RwLock},
};
use uuid::Uuid;

use crate::{Error, Result};

type Mapping = BTreeMap<String, MappingEntry>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A mapping store backed by a single YAML file.
///
/// Cloning is cheap; clones share the same in-memory mapping.
#[derive(Clone)]
pub struct FileStore {
  path:       Option<PathBuf>,
  entries:    Arc<RwLock<Mapping>>,
  /// Serialises concurrent flushes so renames land in call order.
  flush_lock: Arc<Mutex<()>>,
}

impl FileStore {
  /// Load the mapping at `path`.
  ///
  /// An absent file is a first run and yields an empty store. A file that
  /// exists but does not parse is an error.
  pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();

    let entries = match tokio::fs::read_to_string(&path).await {
      Ok(raw) if raw.trim().is_empty() => Mapping::new(),
      Ok(raw) => serde_yaml::from_str(&raw)
        .map_err(|source| Error::Malformed { path: path.clone(), source })?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        tracing::info!(path = %path.display(), "no mapping file yet, starting empty");
        Mapping::new()
      }
      Err(e) => return Err(Error::io(&path, e)),
    };

    tracing::debug!(path = %path.display(), entries = entries.len(), "loaded mapping");

    Ok(Self {
      path:       Some(path),
      entries:    Arc::new(RwLock::new(entries)),
      flush_lock: Arc::new(Mutex::new(())),
    })
  }

  /// A store that is never written to disk, for tests and dry runs.
  pub fn in_memory() -> Self {
    Self {
      path:       None,
      entries:    Arc::new(RwLock::new(Mapping::new())),
      flush_lock: Arc::new(Mutex::new(())),
    }
  }

  pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

  /// A copy of every entry, ordered by source key.
  pub async fn snapshot(&self) -> Vec<(String, MappingEntry)> {
    self
      .entries
      .read()
      .await
      .iter()
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect()
  }

  /// Write `contents` next to `path` and rename it into place.
  async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::io(parent, e))?;
    }

    let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));

    let written = async {
      let mut file = tokio::fs::File::create(&temp_path).await?;
      file.write_all(contents).await?;
      file.sync_all().await?;
      tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(e) = written {
      let _ = tokio::fs::remove_file(&temp_path).await;
      return Err(Error::io(path, e));
    }
    Ok(())
  }
}

// ─── MappingStore impl ───────────────────────────────────────────────────────

impl MappingStore for FileStore {
  type Error = Error;

  async fn get(&self, source_key: &str) -> Result<Option<MappingEntry>> {
    Ok(self.entries.read().await.get(source_key).cloned())
  }

  async fn put(&self, source_key: String, entry: MappingEntry) -> Result<()> {
    self.entries.write().await.insert(source_key, entry);
    Ok(())
  }

  async fn remove(&self, source_key: &str) -> Result<Option<MappingEntry>> {
    Ok(self.entries.write().await.remove(source_key))
  }

  async fn len(&self) -> Result<usize> { Ok(self.entries.read().await.len()) }

  async fn flush(&self) -> Result<()> {
    let Some(path) = &self.path else {
      return Ok(());
    };

    let _guard = self.flush_lock.lock().await;
    let serialised = {
      let entries = self.entries.read().await;
      serde_yaml::to_string(&*entries)?
    };

    Self::write_atomically(path, serialised.as_bytes()).await?;
    tracing::debug!(path = %path.display(), "flushed mapping");
    Ok(())
  }
}

//! Key-value blob storage for the progress document.

use std::{
  collections::HashMap,
  fs, io,
  path::PathBuf,
  sync::{Arc, Mutex},
};

/// Whole-blob storage under a string key. Writes overwrite; last writer wins.
pub trait ProgressBackend: Send + Sync {
  fn read(&self, key: &str) -> io::Result<Option<String>>;
  fn write(&self, key: &str, blob: &str) -> io::Result<()>;
  fn remove(&self, key: &str) -> io::Result<()>;
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Clone, Debug)]
pub struct FileBackend {
  dir: PathBuf,
}

impl FileBackend {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  fn path_for(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{}.json", key))
  }
}

impl ProgressBackend for FileBackend {
  fn read(&self, key: &str) -> io::Result<Option<String>> {
    match fs::read_to_string(self.path_for(key)) {
      Ok(s) => Ok(Some(s)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e),
    }
  }

  fn write(&self, key: &str, blob: &str) -> io::Result<()> {
    fs::create_dir_all(&self.dir)?;
    let path = self.path_for(key);
    // Write-then-rename so a crash never leaves half a document behind.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, blob)?;
    fs::rename(&tmp, &path)
  }

  fn remove(&self, key: &str) -> io::Result<()> {
    match fs::remove_file(self.path_for(key)) {
      Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
      _ => Ok(()),
    }
  }
}

/// In-process storage for ephemeral runs and tests. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
  blobs: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
    self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl ProgressBackend for MemoryBackend {
  fn read(&self, key: &str) -> io::Result<Option<String>> {
    Ok(self.lock().get(key).cloned())
  }

  fn write(&self, key: &str, blob: &str) -> io::Result<()> {
    self.lock().insert(key.to_string(), blob.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> io::Result<()> {
    self.lock().remove(key);
    Ok(())
  }
}

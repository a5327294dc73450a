use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, anyhow};
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::todo::Todo;

pub const TODOS_KEY: &str = "todos";

/// String-keyed blob storage backing the persistence adapter.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// One file per key inside a data directory.
#[derive(Debug)]
pub struct FileStore {
    pub data_dir: PathBuf,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened file store");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => {
                debug!(file = %path.display(), bytes = raw.len(), "read key");
                Ok(Some(raw))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed reading {}", path.display())),
        }
    }

    #[tracing::instrument(skip(self, value))]
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        debug!(file = %path.display(), bytes = value.len(), "writing key atomically");

        let mut temp = NamedTempFile::new_in(&self.data_dir)
            .with_context(|| format!("failed to create temp file in {}", self.data_dir.display()))?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;

        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }
}

/// In-process store. `set_failing(true)` makes every call error, which is how
/// tests exercise the best-effort paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(anyhow!("memory store is unavailable"))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.check()?;
        Ok(self.map.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.check()?;
        self.map.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Mirrors the whole todo list under one key. Both directions are best
/// effort: failures are logged and swallowed.
#[derive(Clone)]
pub struct PersistenceAdapter {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl PersistenceAdapter {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            key: TODOS_KEY.to_string(),
        }
    }

    /// Previously saved list, or `None` if nothing was saved or reading it
    /// failed.
    #[tracing::instrument(skip(self), fields(key = %self.key))]
    pub fn load(&self) -> Option<Vec<Todo>> {
        match self.try_load() {
            Ok(loaded) => loaded,
            Err(err) => {
                error!(error = %format!("{err:#}"), "failed loading todos; starting empty");
                None
            }
        }
    }

    #[tracing::instrument(skip(self, todos), fields(key = %self.key, count = todos.len()))]
    pub fn save(&self, todos: &[Todo]) {
        if let Err(err) = self.try_save(todos) {
            error!(error = %format!("{err:#}"), "failed saving todos; keeping in-memory state");
        }
    }

    pub fn try_load(&self) -> anyhow::Result<Option<Vec<Todo>>> {
        let Some(raw) = self.backend.get(&self.key)? else {
            debug!("no saved todos");
            return Ok(None);
        };
        let todos = decode_todos(&raw)
            .with_context(|| format!("failed parsing saved value for key {}", self.key))?;
        debug!(count = todos.len(), "loaded todos");
        Ok(Some(todos))
    }

    pub fn try_save(&self, todos: &[Todo]) -> anyhow::Result<()> {
        let payload = encode_todos(todos)?;
        self.backend
            .set(&self.key, &payload)
            .with_context(|| format!("failed writing key {}", self.key))?;
        debug!(count = todos.len(), "saved todos");
        Ok(())
    }
}

pub fn encode_todos(todos: &[Todo]) -> anyhow::Result<String> {
    serde_json::to_string(todos).context("failed to serialize todos")
}

pub fn decode_todos(raw: &str) -> anyhow::Result<Vec<Todo>> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::Status;

    #[test]
    fn memory_store_round_trips_and_fails_on_demand() {
        let backend = Arc::new(MemoryStore::new());
        let adapter = PersistenceAdapter::new(backend.clone());
        assert_eq!(adapter.load(), None);

        let mut done = Todo::new_active(1, "b".to_string(), String::new());
        done.status = Status::Done;
        let todos = vec![Todo::new_active(0, "a".to_string(), "x".to_string()), done];
        adapter.save(&todos);
        assert_eq!(adapter.load(), Some(todos.clone()));

        backend.set_failing(true);
        adapter.save(&[]);
        assert_eq!(adapter.load(), None);

        backend.set_failing(false);
        assert_eq!(adapter.load(), Some(todos));
    }

    #[test]
    fn corrupt_blob_loads_as_absent() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(TODOS_KEY, "{not json").expect("set");
        let adapter = PersistenceAdapter::new(backend);
        assert!(adapter.try_load().is_err());
        assert_eq!(adapter.load(), None);
    }

    #[test]
    fn file_store_missing_key_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(temp.path()).expect("open");
        assert_eq!(store.get("nothing").expect("get"), None);

        store.set("k", "v1").expect("set");
        store.set("k", "v2").expect("overwrite");
        assert_eq!(store.get("k").expect("get"), Some("v2".to_string()));
        assert!(store.path_for("k").ends_with("k.json"));
    }
}

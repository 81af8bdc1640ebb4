//! Durable key/value storage for the handful of values that must survive a restart.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use agriscan_logging::{scan_debug, scan_warn};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

/// Key holding the id of the multispectral job still being polled.
pub const PENDING_JOB_KEY: &str = "pending_multispectral_job";
/// Key holding the bearer token attached to backend requests.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

const STORE_FILENAME: &str = "storage.ron";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("failed to encode store: {0}")]
    Encode(String),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Store backed by a single RON map written atomically on every change.
pub struct FileStore {
    dir: PathBuf,
    writer: AtomicFileWriter,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        crate::persist::ensure_data_dir(&dir)?;
        Ok(Self {
            writer: AtomicFileWriter::new(dir.clone()),
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILENAME)
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        load_map(&self.path())
    }

    fn save(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(map, pretty)
            .map_err(|err| StoreError::Encode(err.to_string()))?;
        self.writer.write(STORE_FILENAME, &content)?;
        Ok(())
    }

    fn modify(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut map = self.load()?;
        apply(&mut map);
        self.save(&map)
    }
}

fn load_map(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(BTreeMap::new());
        }
        Err(err) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                message: err.to_string(),
            });
        }
    };

    match ron::from_str(&content) {
        Ok(map) => Ok(map),
        Err(err) => {
            // A corrupt store must not block the client; start over empty.
            scan_warn!("Discarding unreadable store {:?}: {}", path, err);
            Ok(BTreeMap::new())
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        scan_debug!("store set {}", key);
        self.modify(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        scan_debug!("store remove {}", key);
        self.modify(|map| {
            map.remove(key);
        })
    }
}

/// Process-local store, used by tests and when no data directory is wanted.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let store = Self::new();
        store
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(AUTH_TOKEN_KEY.to_string(), token.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        values.remove(key);
        Ok(())
    }
}

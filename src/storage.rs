use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("accessing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serializing store: {0}")]
    Encode(#[from] serde_yaml::Error),
    #[error("starting writer thread: {0}")]
    Spawn(#[source] io::Error),
}

/// String-keyed, string-valued persistence with get/set only.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Keeps every key in a single YAML map on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = if path.exists() {
            let bytes = fs::read(&path).map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
            match String::from_utf8(bytes) {
                Ok(data) => parse_entries(&path, &data),
                Err(err) => {
                    warn!("ignoring store {:?} that is not UTF-8: {}", path, err);
                    BTreeMap::new()
                }
            }
        } else {
            debug!("no store at {:?}, starting empty", path);
            BTreeMap::new()
        };
        Ok(FileStore { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let serialized = serde_yaml::to_string(&self.entries)?;
        let tmp = self.path.with_extension("yml.tmp");
        fs::write(&tmp, serialized).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

fn parse_entries(path: &Path, data: &str) -> BTreeMap<String, String> {
    if data.trim().is_empty() {
        return BTreeMap::new();
    }
    match serde_yaml::from_str(data) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("ignoring unreadable store {:?}: {}", path, err);
            BTreeMap::new()
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.save()
    }
}

/// In-memory store whose clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.lock().insert(key.to_string(), value.to_string());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

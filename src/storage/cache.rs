//! Per-workspace persistence cache.
//!
//! Two tiers: an in-memory map that is always consulted first, and a cache
//! directory holding one JSON file per key. A separate file-path to
//! content-hash map lets indexers skip files that have not changed; it is
//! written back to disk by a debounced background flusher.
//!
//! Disk I/O here is an optimization only. Failures are logged and the cache
//! falls back to memory; the single exception is an explicitly configured
//! directory that cannot be created, which fails [`PersistenceCache::init`].

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::flusher::HashFlusher;
use crate::config::{CONFIG_DIR, CacheConfig};
use crate::error::{CacheError, CacheResult, ErrorReport};

/// File holding the persisted path to hash map.
pub const HASHES_FILE: &str = "file-hashes.json";

/// A cached payload, stamped with the content hash it was derived from
/// when it is file-scoped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub value: T,
}

impl<T> CacheEntry<T> {
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            hash: None,
            value,
        }
    }

    pub fn for_file(key: impl Into<String>, hash: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            hash: Some(hash.into()),
            value,
        }
    }

    /// Whether this entry was derived from content with `hash`.
    pub fn is_fresh_for(&self, hash: &str) -> bool {
        self.hash.as_deref() == Some(hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hashed_files: usize,
    pub entries: usize,
    pub dir: Option<PathBuf>,
    pub persistent: bool,
}

/// On-disk record; the key guards against sanitized-name collisions.
#[derive(Serialize, Deserialize)]
struct DiskRecord {
    key: String,
    value: Value,
}

type HashMapStore = Arc<RwLock<HashMap<String, String>>>;

pub struct PersistenceCache {
    dir: Option<PathBuf>,
    hashes: HashMapStore,
    entries: RwLock<HashMap<String, Value>>,
    flusher: Option<HashFlusher>,
}

impl std::fmt::Debug for PersistenceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceCache")
            .field("dir", &self.dir)
            .field("hashed_files", &self.hashes.read().len())
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

impl PersistenceCache {
    /// Default cache location for a workspace.
    pub fn default_dir(workspace: &Path) -> PathBuf {
        workspace.join(CONFIG_DIR).join("cache")
    }

    /// Open the cache bound to `workspace`.
    pub fn init(workspace: &Path, config: &CacheConfig) -> CacheResult<Self> {
        let dir = match &config.dir {
            Some(explicit) => {
                fs::create_dir_all(explicit).map_err(|source| CacheError::CreateDir {
                    path: explicit.clone(),
                    source,
                })?;
                Some(explicit.clone())
            }
            None => {
                let dir = Self::default_dir(workspace);
                match fs::create_dir_all(&dir) {
                    Ok(()) => Some(dir),
                    Err(source) => {
                        let err = CacheError::CreateDir { path: dir, source };
                        tracing::warn!(
                            target: "cache",
                            "running memory-only: {}",
                            ErrorReport::from_error(&err)
                        );
                        None
                    }
                }
            }
        };

        let hashes: HashMapStore = Arc::new(RwLock::new(
            dir.as_deref().map(load_hashes).unwrap_or_default(),
        ));

        let flusher = dir.as_ref().and_then(|dir| {
            let path = dir.join(HASHES_FILE);
            let store = hashes.clone();
            let persist = Box::new(move || {
                if let Err(e) = write_hashes(&path, &store.read()) {
                    tracing::warn!(target: "cache", "hash flush failed: {}", ErrorReport::from_error(&e));
                }
            });
            match HashFlusher::spawn(Duration::from_millis(config.flush_debounce_ms), persist) {
                Ok(flusher) => Some(flusher),
                Err(e) => {
                    tracing::warn!(target: "cache", "no background flusher, hashes persist on flush only: {e}");
                    None
                }
            }
        });

        crate::debug_event!(
            "cache",
            "init",
            "dir={:?} hashes={}",
            dir,
            hashes.read().len()
        );

        Ok(Self {
            dir,
            hashes,
            entries: RwLock::new(HashMap::new()),
            flusher,
        })
    }

    /// In-memory only cache, never touching disk.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            hashes: Arc::new(RwLock::new(HashMap::new())),
            entries: RwLock::new(HashMap::new()),
            flusher: None,
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn is_persistent(&self) -> bool {
        self.dir.is_some()
    }

    /// True only if `path` was recorded with exactly `hash`.
    pub fn is_unchanged(&self, path: &Path, hash: &str) -> bool {
        self.hashes
            .read()
            .get(path_key(path).as_str())
            .is_some_and(|known| known == hash)
    }

    pub fn hash_of(&self, path: &Path) -> Option<String> {
        self.hashes.read().get(path_key(path).as_str()).cloned()
    }

    /// Record `hash` for `path` and schedule a debounced write of the map.
    pub fn update_hash(&self, path: &Path, hash: &str) {
        self.hashes.write().insert(path_key(path), hash.to_string());
        if let Some(flusher) = &self.flusher {
            flusher.touch();
        }
    }

    /// Store `value` under `key`, in memory and best-effort on disk.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(source) => {
                let err = CacheError::Serialization {
                    key: key.to_string(),
                    source,
                };
                tracing::warn!(target: "cache", "{}", ErrorReport::from_error(&err));
                return;
            }
        };

        if let Some(dir) = &self.dir {
            if let Err(e) = write_record(dir, key, &value) {
                tracing::warn!(target: "cache", "save '{key}' kept in memory only: {}", ErrorReport::from_error(&e));
            }
        }
        self.entries.write().insert(key.to_string(), value);
    }

    /// Fetch `key`, falling back to disk on a memory miss.
    ///
    /// Any failure is treated as a miss.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cached = self.entries.read().get(key).cloned();
        let value = match cached {
            Some(value) => value,
            None => {
                let dir = self.dir.as_deref()?;
                let value = match read_record(dir, key) {
                    Ok(Some(value)) => value,
                    Ok(None) => return None,
                    Err(e) => {
                        tracing::warn!(target: "cache", "load '{key}' treated as miss: {}", ErrorReport::from_error(&e));
                        return None;
                    }
                };
                self.entries.write().insert(key.to_string(), value.clone());
                value
            }
        };

        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(source) => {
                let err = CacheError::Serialization {
                    key: key.to_string(),
                    source,
                };
                tracing::warn!(target: "cache", "{}", ErrorReport::from_error(&err));
                None
            }
        }
    }

    /// Wipe both tiers and every file in the cache directory.
    pub fn clear(&self) {
        self.hashes.write().clear();
        self.entries.write().clear();

        let Some(dir) = &self.dir else {
            return;
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(target: "cache", "nothing to clear in {}: {e}", dir.display());
                return;
            }
        };
        let mut removed = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(target: "cache", "cannot remove {}: {e}", path.display()),
            }
        }
        crate::log_event!("cache", "cleared", "{removed} files removed");
    }

    /// Write the hash map now, cancelling any pending debounced write.
    pub fn flush(&self) {
        match (&self.flusher, &self.dir) {
            (Some(flusher), _) => flusher.flush(),
            (None, Some(dir)) => {
                if let Err(e) = write_hashes(&dir.join(HASHES_FILE), &self.hashes.read()) {
                    tracing::warn!(target: "cache", "hash flush failed: {}", ErrorReport::from_error(&e));
                }
            }
            (None, None) => {}
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hashed_files: self.hashes.read().len(),
            entries: self.entries.read().len(),
            dir: self.dir.clone(),
            persistent: self.dir.is_some(),
        }
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// File name for a key: non-alphanumerics become `_`.
pub fn sanitize_key(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    name.push_str(".json");
    name
}

fn load_hashes(dir: &Path) -> HashMap<String, String> {
    let path = dir.join(HASHES_FILE);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(_) => return HashMap::new(),
    };
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        tracing::warn!(target: "cache", "ignoring corrupt {}: {e}", path.display());
        HashMap::new()
    })
}

fn write_hashes(path: &Path, hashes: &HashMap<String, String>) -> CacheResult<()> {
    let json = serde_json::to_vec(hashes).map_err(|source| CacheError::Serialization {
        key: HASHES_FILE.to_string(),
        source,
    })?;
    fs::write(path, json).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(target: "cache", "persisted {} hashes", hashes.len());
    Ok(())
}

fn write_record(dir: &Path, key: &str, value: &Value) -> CacheResult<()> {
    let path = dir.join(sanitize_key(key));
    let record = DiskRecord {
        key: key.to_string(),
        value: value.clone(),
    };
    let json = serde_json::to_vec(&record).map_err(|source| CacheError::Serialization {
        key: key.to_string(),
        source,
    })?;
    fs::write(&path, json).map_err(|source| CacheError::Io { path, source })
}

fn read_record(dir: &Path, key: &str) -> CacheResult<Option<Value>> {
    let path = dir.join(sanitize_key(key));
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(CacheError::Io { path, source }),
    };
    let record: DiskRecord =
        serde_json::from_slice(&bytes).map_err(|source| CacheError::Serialization {
            key: key.to_string(),
            source,
        })?;
    Ok((record.key == key).then_some(record.value))
}

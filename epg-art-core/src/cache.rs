//! Artwork cache collaborator and its stock implementations.
//!
//! The ingestion pipeline only talks to [`ArtworkCache`]. Two
//! implementations ship here: [`MemoryCache`] for tests and embedding, and
//! [`JsonFileCache`], a single JSON index on disk with per-record expiry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::artwork::ArtworkSet;
use crate::error::CoreError;

/// Cache format version. Bump when the record layout changes so stale
/// indexes are discarded instead of misread.
const CACHE_VERSION: u32 = 1;

/// Async key/value store for resolved artwork, keyed by program id.
#[async_trait]
pub trait ArtworkCache: Send + Sync {
    /// Fetch a live record. Expired records read as `None`.
    async fn get(&self, key: &str) -> Result<Option<ArtworkSet>, CoreError>;

    /// Store (or replace) the artwork for `key`.
    async fn set(&self, key: &str, artwork: &ArtworkSet) -> Result<(), CoreError>;

    /// Keys whose records are past their expiry.
    async fn expired_keys(&self) -> Result<Vec<String>, CoreError>;

    /// Drop the given keys, returning how many were present.
    async fn remove(&self, keys: &[String]) -> Result<usize, CoreError>;

    /// Persist buffered writes. No-op for stores that write through.
    async fn flush(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// How long records stay valid.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryPolicy {
    /// Lifetime of a record holding at least one entry.
    pub ttl: Duration,
    /// Lifetime of an empty (negative) record.
    pub negative_ttl: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::days(30),
            negative_ttl: Duration::days(3),
        }
    }
}

impl ExpiryPolicy {
    fn expiry_for(&self, artwork: &ArtworkSet, now: DateTime<Utc>) -> DateTime<Utc> {
        if artwork.is_empty() {
            now + self.negative_ttl
        } else {
            now + self.ttl
        }
    }
}

/// A stored artwork set with its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedArtwork {
    pub artwork: ArtworkSet,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedArtwork {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// In-process cache. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    policy: ExpiryPolicy,
    records: Mutex<HashMap<String, CachedArtwork>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ExpiryPolicy) -> Self {
        Self {
            policy,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a record with an explicit expiry, bypassing the policy.
    pub fn insert_with_expiry(&self, key: &str, artwork: ArtworkSet, expires_at: DateTime<Utc>) {
        self.records.lock().insert(
            key.to_string(),
            CachedArtwork {
                artwork,
                stored_at: Utc::now(),
                expires_at,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl ArtworkCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<ArtworkSet>, CoreError> {
        let now = Utc::now();
        Ok(self
            .records
            .lock()
            .get(key)
            .filter(|r| !r.is_expired(now))
            .map(|r| r.artwork.clone()))
    }

    async fn set(&self, key: &str, artwork: &ArtworkSet) -> Result<(), CoreError> {
        let now = Utc::now();
        let record = CachedArtwork {
            artwork: artwork.clone(),
            stored_at: now,
            expires_at: self.policy.expiry_for(artwork, now),
        };
        self.records.lock().insert(key.to_string(), record);
        Ok(())
    }

    async fn expired_keys(&self) -> Result<Vec<String>, CoreError> {
        let now = Utc::now();
        let mut keys: Vec<String> = self
            .records
            .lock()
            .iter()
            .filter(|(_, r)| r.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn remove(&self, keys: &[String]) -> Result<usize, CoreError> {
        let mut records = self.records.lock();
        Ok(keys.iter().filter(|k| records.remove(*k).is_some()).count())
    }
}

/// On-disk index layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheIndex {
    #[serde(default)]
    version: u32,
    records: HashMap<String, CachedArtwork>,
}

/// Default location of the artwork cache: `~/.cache/epg-art/artwork.json`.
pub fn cache_path() -> Result<PathBuf, CoreError> {
    let base =
        dirs::cache_dir().ok_or_else(|| CoreError::cache("Could not determine cache directory"))?;
    Ok(base.join("epg-art").join("artwork.json"))
}

/// JSON-file cache. Records live in memory and are written back on
/// [`flush`](ArtworkCache::flush).
#[derive(Debug)]
pub struct JsonFileCache {
    path: PathBuf,
    policy: ExpiryPolicy,
    state: Mutex<FileState>,
}

#[derive(Debug, Default)]
struct FileState {
    index: CacheIndex,
    dirty: bool,
}

impl JsonFileCache {
    /// Open (or start) the index at `path`. A missing file is an empty
    /// cache; an index written by another format version is discarded.
    pub async fn open(path: impl Into<PathBuf>, policy: ExpiryPolicy) -> Result<Self, CoreError> {
        let path = path.into();
        let index = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let index: CacheIndex = serde_json::from_str(&contents)?;
                if index.version != CACHE_VERSION {
                    log::info!(
                        "Discarding artwork cache {} (format {} != {})",
                        path.display(),
                        index.version,
                        CACHE_VERSION
                    );
                    CacheIndex {
                        version: CACHE_VERSION,
                        ..Default::default()
                    }
                } else {
                    index
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheIndex {
                version: CACHE_VERSION,
                ..Default::default()
            },
            Err(e) => return Err(e.into()),
        };

        log::debug!(
            "Opened artwork cache {} ({} records)",
            path.display(),
            index.records.len()
        );

        Ok(Self {
            path,
            policy,
            state: Mutex::new(FileState {
                index,
                dirty: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.state.lock().index.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().index.records.is_empty()
    }

    /// Drop every record and delete the file. Returns the number of records
    /// that were held.
    pub async fn clear(&self) -> Result<usize, CoreError> {
        let removed = {
            let mut state = self.state.lock();
            let n = state.index.records.len();
            state.index.records.clear();
            state.dirty = false;
            n
        };
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(removed)
    }
}

#[async_trait]
impl ArtworkCache for JsonFileCache {
    async fn get(&self, key: &str) -> Result<Option<ArtworkSet>, CoreError> {
        let now = Utc::now();
        Ok(self
            .state
            .lock()
            .index
            .records
            .get(key)
            .filter(|r| !r.is_expired(now))
            .map(|r| r.artwork.clone()))
    }

    async fn set(&self, key: &str, artwork: &ArtworkSet) -> Result<(), CoreError> {
        let now = Utc::now();
        let record = CachedArtwork {
            artwork: artwork.clone(),
            stored_at: now,
            expires_at: self.policy.expiry_for(artwork, now),
        };
        let mut state = self.state.lock();
        state.index.records.insert(key.to_string(), record);
        state.dirty = true;
        Ok(())
    }

    async fn expired_keys(&self) -> Result<Vec<String>, CoreError> {
        let now = Utc::now();
        let mut keys: Vec<String> = self
            .state
            .lock()
            .index
            .records
            .iter()
            .filter(|(_, r)| r.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn remove(&self, keys: &[String]) -> Result<usize, CoreError> {
        let mut state = self.state.lock();
        let removed = keys
            .iter()
            .filter(|k| state.index.records.remove(*k).is_some())
            .count();
        if removed > 0 {
            state.dirty = true;
        }
        Ok(removed)
    }

    async fn flush(&self) -> Result<(), CoreError> {
        // Serialize under the lock, write outside it.
        let contents = {
            let mut state = self.state.lock();
            if !state.dirty {
                return Ok(());
            }
            state.index.version = CACHE_VERSION;
            let contents = serde_json::to_string(&state.index)?;
            state.dirty = false;
            contents
        };

        if let Err(e) = self.write_index(contents).await {
            self.state.lock().dirty = true;
            return Err(e);
        }
        log::debug!("Flushed artwork cache to {}", self.path.display());
        Ok(())
    }
}

impl JsonFileCache {
    /// Write atomically via a sibling temp file.
    async fn write_index(&self, contents: String) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;

// src/core/cache.rs

//! # Cache Service
//!
//! A namespaced key/value store with two tiers:
//!
//! - a **session tier**, an in-process map handing out `Arc<Value>` payloads;
//! - a **disk tier**, one compressed binary file per namespace, where every
//!   entry carries its creation time, its TTL and the account that wrote it.
//!
//! An entry is only served when it is younger than its TTL *and* was written
//! by the current account. Invalid entries found during a read are removed.
//! Disk failures never reach the caller: they are logged and the tier behaves
//! as a miss.

use crate::constants::{CACHE_FILE_SUFFIX, CACHE_FORMAT_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use walkdir::WalkDir;

const HASH_TRUNCATE_LENGTH: usize = 16; // 16 bytes = 32 hex characters

// --- Time Source ---

/// Source of "now" in unix seconds.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self(AtomicU64::new(start))
    }

    pub fn advance(&self, seconds: u64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn set(&self, now: u64) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// --- Errors (internal to the disk tier) ---

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode cache file: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("Failed to decode cache file: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("Failed to decompress cache file: {0}. It might be corrupt.")]
    Decompress(#[from] lz4_flex::block::DecompressError),
    #[error("Cached payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cache file belongs to namespace '{found}' (format {version}), expected '{expected}'.")]
    Mismatch {
        expected: String,
        found: String,
        version: u32,
    },
}

type CacheResult<T> = Result<T, CacheError>;

// --- Public Views ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    Session,
    Disk,
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Session => "session",
            Self::Disk => "disk",
        })
    }
}

/// Metadata of one entry, as reported by [`CacheService::describe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheDescription {
    pub namespace: String,
    pub key: String,
    pub age_seconds: u64,
    pub ttl_seconds: u64,
    pub expired: bool,
    pub tier: CacheTier,
    pub owner_account_id: String,
}

// --- Storage Shapes ---

#[derive(Debug)]
struct SessionEntry {
    payload: Arc<Value>,
    created_at: u64,
    ttl_seconds: u64,
    owner_account_id: String,
}

/// One entry inside a namespace file. Payloads are stored as JSON text since
/// `bincode` cannot encode self-describing values.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiskEntry {
    payload_json: String,
    created_at: u64,
    ttl_seconds: u64,
    owner_account_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct NamespaceFile {
    format_version: u32,
    namespace: String,
    entries: BTreeMap<String, DiskEntry>,
}

impl NamespaceFile {
    fn empty(namespace: &str) -> Self {
        Self {
            format_version: CACHE_FORMAT_VERSION,
            namespace: namespace.to_string(),
            entries: BTreeMap::new(),
        }
    }
}

fn is_valid(now: u64, created_at: u64, ttl_seconds: u64, owner: &str, account: &str) -> bool {
    now < created_at.saturating_add(ttl_seconds) && owner == account
}

// --- The Service ---

#[derive(Debug)]
pub struct CacheService {
    session: HashMap<String, HashMap<String, SessionEntry>>,
    disk_dir: Option<PathBuf>,
    clock: Arc<dyn Clock>,
    account_id: String,
    last_seen_account: Option<String>,
}

impl CacheService {
    /// Creates a cache. `disk_dir = None` keeps everything in memory.
    pub fn new(disk_dir: Option<PathBuf>, clock: Arc<dyn Clock>, account_id: impl Into<String>) -> Self {
        Self {
            session: HashMap::new(),
            disk_dir,
            clock,
            account_id: account_id.into(),
            last_seen_account: None,
        }
    }

    pub fn account(&self) -> &str {
        &self.account_id
    }

    /// Changes the account identity. The next `get` or `put` wipes both tiers
    /// if the identity differs from the one those calls last ran under.
    pub fn set_account(&mut self, account_id: impl Into<String>) {
        self.account_id = account_id.into();
    }

    pub fn disk_dir(&self) -> Option<&Path> {
        self.disk_dir.as_deref()
    }

    fn reconcile_account(&mut self) {
        let changed = self
            .last_seen_account
            .as_ref()
            .is_some_and(|last| *last != self.account_id);
        if changed {
            log::debug!(
                "Account changed to '{}'. Invalidating all cache entries.",
                self.account_id
            );
            self.invalidate_all();
        }
        self.last_seen_account = Some(self.account_id.clone());
    }

    /// Looks up a payload. Session tier first, then disk; disk hits are
    /// promoted to the session tier.
    pub fn get(&mut self, namespace: &str, key: &str) -> Option<Arc<Value>> {
        self.reconcile_account();
        let now = self.clock.now();

        if let Some(entries) = self.session.get_mut(namespace) {
            if let Some(entry) = entries.get(key) {
                if is_valid(now, entry.created_at, entry.ttl_seconds, &entry.owner_account_id, &self.account_id) {
                    log::trace!("Session cache hit: {}:{}", namespace, key);
                    return Some(Arc::clone(&entry.payload));
                }
                log::debug!("Dropping stale session entry {}:{}", namespace, key);
                entries.remove(key);
            }
        }

        let path = self.namespace_path(namespace)?;
        let mut file = match read_namespace_file(&path, namespace) {
            Ok(Some(file)) => file,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Ignoring unreadable cache file '{}': {}", path.display(), e);
                return None;
            }
        };
        let entry = file.entries.get(key)?.clone();

        if !is_valid(now, entry.created_at, entry.ttl_seconds, &entry.owner_account_id, &self.account_id) {
            log::debug!("Evicting stale disk entry {}:{}", namespace, key);
            file.entries.remove(key);
            if let Err(e) = persist_namespace_file(&path, &file) {
                log::warn!("Failed to evict {}:{} from disk: {}", namespace, key, e);
            }
            return None;
        }

        let payload: Value = match serde_json::from_str(&entry.payload_json) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Evicting corrupt payload for {}:{}: {}", namespace, key, e);
                file.entries.remove(key);
                if let Err(e) = persist_namespace_file(&path, &file) {
                    log::warn!("Failed to evict {}:{} from disk: {}", namespace, key, e);
                }
                return None;
            }
        };
        log::trace!("Disk cache hit: {}:{}", namespace, key);

        let payload = Arc::new(payload);
        self.session.entry(namespace.to_string()).or_default().insert(
            key.to_string(),
            SessionEntry {
                payload: Arc::clone(&payload),
                created_at: entry.created_at,
                ttl_seconds: entry.ttl_seconds,
                owner_account_id: entry.owner_account_id,
            },
        );
        Some(payload)
    }

    /// Stores a payload in both tiers and returns the shared handle.
    pub fn put(&mut self, namespace: &str, key: &str, payload: Value, ttl_seconds: u64) -> Arc<Value> {
        self.reconcile_account();
        let now = self.clock.now();

        if let Some(path) = self.namespace_path(namespace) {
            if let Err(e) = self.write_disk_entry(&path, namespace, key, &payload, now, ttl_seconds) {
                log::warn!("Failed to persist {}:{} to disk: {}", namespace, key, e);
            }
        }

        let payload = Arc::new(payload);
        self.session.entry(namespace.to_string()).or_default().insert(
            key.to_string(),
            SessionEntry {
                payload: Arc::clone(&payload),
                created_at: now,
                ttl_seconds,
                owner_account_id: self.account_id.clone(),
            },
        );
        log::trace!("Cached {}:{} for {}s", namespace, key, ttl_seconds);
        payload
    }

    fn write_disk_entry(
        &self,
        path: &Path,
        namespace: &str,
        key: &str,
        payload: &Value,
        now: u64,
        ttl_seconds: u64,
    ) -> CacheResult<()> {
        let mut file = match read_namespace_file(path, namespace) {
            Ok(Some(file)) => file,
            Ok(None) => NamespaceFile::empty(namespace),
            Err(e) => {
                log::warn!("Replacing unreadable cache file '{}': {}", path.display(), e);
                NamespaceFile::empty(namespace)
            }
        };
        file.entries.insert(
            key.to_string(),
            DiskEntry {
                payload_json: serde_json::to_string(payload)?,
                created_at: now,
                ttl_seconds,
                owner_account_id: self.account_id.clone(),
            },
        );
        persist_namespace_file(path, &file)
    }

    /// Removes one entry from both tiers.
    pub fn invalidate(&mut self, namespace: &str, key: &str) {
        if let Some(entries) = self.session.get_mut(namespace) {
            entries.remove(key);
        }
        let Some(path) = self.namespace_path(namespace) else {
            return;
        };
        match read_namespace_file(&path, namespace) {
            Ok(Some(mut file)) => {
                if file.entries.remove(key).is_some() {
                    if let Err(e) = persist_namespace_file(&path, &file) {
                        log::warn!("Failed to invalidate {}:{} on disk: {}", namespace, key, e);
                    }
                }
            }
            Ok(None) => {}
            Err(_) => remove_file_logged(&path),
        }
    }

    /// Removes a whole namespace, including its disk file.
    pub fn invalidate_namespace(&mut self, namespace: &str) {
        self.session.remove(namespace);
        if let Some(path) = self.namespace_path(namespace) {
            if path.exists() {
                remove_file_logged(&path);
            }
        }
        log::debug!("Invalidated cache namespace '{}'", namespace);
    }

    /// Clears both tiers for every namespace.
    pub fn invalidate_all(&mut self) {
        self.session.clear();
        let Some(dir) = &self.disk_dir else {
            return;
        };
        let mut removed = 0usize;
        for path in cache_files(dir) {
            remove_file_logged(&path);
            removed += 1;
        }
        log::debug!("Invalidated all cache entries ({} file(s) removed)", removed);
    }

    /// Metadata for one entry, without evicting anything.
    pub fn describe(&self, namespace: &str, key: &str) -> Option<CacheDescription> {
        let now = self.clock.now();

        if let Some(entry) = self.session.get(namespace).and_then(|m| m.get(key)) {
            return Some(CacheDescription {
                namespace: namespace.to_string(),
                key: key.to_string(),
                age_seconds: now.saturating_sub(entry.created_at),
                ttl_seconds: entry.ttl_seconds,
                expired: now >= entry.created_at.saturating_add(entry.ttl_seconds),
                tier: CacheTier::Session,
                owner_account_id: entry.owner_account_id.clone(),
            });
        }

        let path = self.namespace_path(namespace)?;
        let file = read_namespace_file(&path, namespace).ok()??;
        let entry = file.entries.get(key)?;
        Some(describe_disk_entry(namespace, key, entry, now))
    }

    /// Every entry across both tiers, sorted by namespace then key. An entry
    /// present in both tiers is reported once, as session.
    pub fn entries(&self) -> Vec<CacheDescription> {
        let now = self.clock.now();
        let mut out: BTreeMap<(String, String), CacheDescription> = BTreeMap::new();

        if let Some(dir) = &self.disk_dir {
            for path in cache_files(dir) {
                let file = match read_any_namespace_file(&path) {
                    Ok(file) => file,
                    Err(e) => {
                        log::debug!("Skipping '{}': {}", path.display(), e);
                        continue;
                    }
                };
                for (key, entry) in &file.entries {
                    out.insert(
                        (file.namespace.clone(), key.clone()),
                        describe_disk_entry(&file.namespace, key, entry, now),
                    );
                }
            }
        }

        for (namespace, entries) in &self.session {
            for key in entries.keys() {
                if let Some(description) = self.describe(namespace, key) {
                    out.insert((namespace.clone(), key.clone()), description);
                }
            }
        }

        out.into_values().collect()
    }

    fn namespace_path(&self, namespace: &str) -> Option<PathBuf> {
        self.disk_dir
            .as_ref()
            .map(|dir| dir.join(namespace_file_name(namespace)))
    }
}

fn describe_disk_entry(namespace: &str, key: &str, entry: &DiskEntry, now: u64) -> CacheDescription {
    CacheDescription {
        namespace: namespace.to_string(),
        key: key.to_string(),
        age_seconds: now.saturating_sub(entry.created_at),
        ttl_seconds: entry.ttl_seconds,
        expired: now >= entry.created_at.saturating_add(entry.ttl_seconds),
        tier: CacheTier::Disk,
        owner_account_id: entry.owner_account_id.clone(),
    }
}

// --- Disk Format ---

/// `<blake3(namespace) truncated, hex>.cache.bin`
fn namespace_file_name(namespace: &str) -> String {
    let hash = blake3::hash(namespace.as_bytes());
    let truncated = hash
        .as_bytes()
        .get(..HASH_TRUNCATE_LENGTH)
        .unwrap_or_default();
    format!("{}{}", hex::encode(truncated), CACHE_FILE_SUFFIX)
}

fn cache_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().ends_with(CACHE_FILE_SUFFIX))
        .map(|e| e.into_path())
        .collect()
}

fn remove_file_logged(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        log::warn!("Failed to remove cache file '{}': {}", path.display(), e);
    }
}

fn read_any_namespace_file(path: &Path) -> CacheResult<NamespaceFile> {
    let compressed_bytes = fs::read(path)?;
    let decompressed_bytes = lz4_flex::decompress_size_prepended(&compressed_bytes)?;
    log::trace!(
        "Decompressed cache file from {} to {} bytes.",
        compressed_bytes.len(),
        decompressed_bytes.len()
    );
    let (file, _len): (NamespaceFile, usize) =
        bincode::serde::decode_from_slice(&decompressed_bytes, bincode::config::standard())?;
    Ok(file)
}

/// Reads the file for `namespace`. A missing or empty file is `Ok(None)`.
fn read_namespace_file(path: &Path, namespace: &str) -> CacheResult<Option<NamespaceFile>> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => return Ok(None),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let file = read_any_namespace_file(path)?;
    if file.format_version != CACHE_FORMAT_VERSION || file.namespace != namespace {
        return Err(CacheError::Mismatch {
            expected: namespace.to_string(),
            found: file.namespace,
            version: file.format_version,
        });
    }
    Ok(Some(file))
}

/// Writes a namespace file through a sibling temp file. An empty namespace
/// removes the file instead.
fn persist_namespace_file(path: &Path, file: &NamespaceFile) -> CacheResult<()> {
    if file.entries.is_empty() {
        if path.exists() {
            fs::remove_file(path)?;
        }
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let decompressed_bytes = bincode::serde::encode_to_vec(file, bincode::config::standard())?;
    let compressed_bytes = lz4_flex::compress_prepend_size(&decompressed_bytes);
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, &compressed_bytes)?;
    fs::rename(&tmp_path, path)?;
    log::trace!(
        "Wrote cache namespace '{}' ({} entries, {} bytes)",
        file.namespace,
        file.entries.len(),
        compressed_bytes.len()
    );
    Ok(())
}

//! Persisted worktree identity cache.
//!
//! This module defines the on-disk mapping from a worktree's lookup key to its stable
//! numeric ID, together with [`CacheStore`], which knows where the cache for a scan
//! directory lives and how to read and write it under the cross-process lock.
//!
//! # Public API
//! - [`CacheEntry`]: One tracked worktree
//! - [`WorktreeCache`]: Key → entry map plus the `next_id` counter
//! - [`WorktreeInfo`]: A freshly observed worktree, input to ID assignment
//! - [`CacheStore`]: Location, locking and persistence of a cache file
//!
//! # Cache Strategy
//! - **JSON serialization**: Human-readable, unknown fields ignored on read
//! - **Soft deletion**: Removed worktrees keep their entry so their ID stays retired
//! - **Atomic writes**: Serialize to a temp file and rename over the target

use crate::core::{
    dirs::get_scan_cache_directory,
    error::{Result, WtError},
    lock::CacheLock,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CACHE_FILE_NAME: &str = "worktrees.json";
pub const LOCK_FILE_NAME: &str = "worktrees.lock";

/// Separator used by an earlier key schema ("repo::branch"); such keys are debris
pub const LEGACY_KEY_SEPARATOR: &str = "::";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: u32,
    pub path: PathBuf,
    #[serde(default)]
    pub repo_path: PathBuf,
    #[serde(default)]
    pub branch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn is_active(&self) -> bool {
        self.removed_at.is_none()
    }

    /// Overwrite metadata with whatever the probe managed to resolve
    fn refresh_from(&mut self, info: &WorktreeInfo) {
        self.path = info.path.clone();
        if !info.repo_path.as_os_str().is_empty() {
            self.repo_path = info.repo_path.clone();
        }
        if !info.branch.is_empty() {
            self.branch = info.branch.clone();
        }
        if !info.origin_url.is_empty() {
            self.origin_url = info.origin_url.clone();
        }
    }
}

/// A worktree as observed on disk right now
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorktreeInfo {
    pub key: String,
    pub path: PathBuf,
    pub repo_path: PathBuf,
    pub branch: String,
    pub origin_url: String,
}

/// Counts reported by [`WorktreeCache::sync_worktrees`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub added: usize,
    pub refreshed: usize,
    pub removed: usize,
}

fn default_next_id() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorktreeCache {
    #[serde(default)]
    pub worktrees: BTreeMap<String, CacheEntry>,
    #[serde(default = "default_next_id")]
    pub next_id: u32,
}

impl Default for WorktreeCache {
    fn default() -> Self {
        Self {
            worktrees: BTreeMap::new(),
            next_id: default_next_id(),
        }
    }
}

pub fn is_legacy_key(key: &str) -> bool {
    key.contains(LEGACY_KEY_SEPARATOR)
}

impl WorktreeCache {
    pub fn active_entries(&self) -> impl Iterator<Item = (&String, &CacheEntry)> {
        self.worktrees.iter().filter(|(_, entry)| entry.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.active_entries().count()
    }

    /// Hand out the next ID, skipping past anything already issued
    fn allocate_id(&mut self) -> u32 {
        let max_issued = self.worktrees.values().map(|e| e.id).max().unwrap_or(0);
        let id = match max_issued.checked_add(1) {
            Some(after_max) => self.next_id.max(after_max),
            None => {
                log::warn!("Worktree ID {max_issued} already issued, reusing the lowest free ID");
                self.lowest_unissued_id()
            }
        };
        self.next_id = id.saturating_add(1);
        id
    }

    fn lowest_unissued_id(&self) -> u32 {
        let issued: HashSet<u32> = self.worktrees.values().map(|e| e.id).collect();
        (1..u32::MAX)
            .find(|id| !issued.contains(id))
            .unwrap_or(u32::MAX)
    }

    /// Return the ID for `info.key`, creating or reviving the entry as needed.
    ///
    /// An active entry keeps its ID and only has its metadata refreshed. A soft-deleted
    /// entry is revived under a new ID so retired IDs are never handed out again.
    pub fn get_or_assign_id(&mut self, info: &WorktreeInfo) -> u32 {
        if let Some(entry) = self.worktrees.get_mut(&info.key) {
            if entry.is_active() {
                entry.refresh_from(info);
                return entry.id;
            }
        }

        let id = self.allocate_id();
        log::debug!("Assigning id {id} to {}", info.key);
        self.worktrees.insert(
            info.key.clone(),
            CacheEntry {
                id,
                path: info.path.clone(),
                repo_path: info.repo_path.clone(),
                branch: info.branch.clone(),
                origin_url: info.origin_url.clone(),
                removed_at: None,
            },
        );
        id
    }

    /// Soft-delete an entry. Returns false when the key is unknown or already removed.
    pub fn mark_removed(&mut self, key: &str) -> bool {
        match self.worktrees.get_mut(key) {
            Some(entry) if entry.is_active() => {
                entry.removed_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Hard-delete an entry; only used for legacy-format debris
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.worktrees.remove(key)
    }

    /// Give an active entry a brand new ID
    pub fn reassign_id(&mut self, key: &str) -> Option<u32> {
        if !self.worktrees.get(key).is_some_and(CacheEntry::is_active) {
            return None;
        }
        let id = self.allocate_id();
        let entry = self.worktrees.get_mut(key)?;
        log::debug!("Reassigning {key} from id {} to {id}", entry.id);
        entry.id = id;
        Some(id)
    }

    /// Reconcile against a full scan: new keys get IDs, vanished keys are
    /// soft-deleted, surviving keys get fresh metadata.
    pub fn sync_worktrees(&mut self, scanned: &[WorktreeInfo]) -> SyncSummary {
        let mut summary = SyncSummary::default();
        let seen: HashSet<&str> = scanned.iter().map(|info| info.key.as_str()).collect();

        for info in scanned {
            let was_active = self
                .worktrees
                .get(&info.key)
                .is_some_and(CacheEntry::is_active);
            self.get_or_assign_id(info);
            if was_active {
                summary.refreshed += 1;
            } else {
                summary.added += 1;
            }
        }

        let vanished: Vec<String> = self
            .active_entries()
            .filter(|(key, _)| !seen.contains(key.as_str()))
            .map(|(key, _)| key.clone())
            .collect();
        for key in vanished {
            if self.mark_removed(&key) {
                summary.removed += 1;
            }
        }

        summary
    }

    /// Build a fresh cache with dense IDs from 1, in key order
    pub fn from_scan(scanned: &[WorktreeInfo]) -> Self {
        let mut sorted: Vec<&WorktreeInfo> = scanned.iter().collect();
        sorted.sort_by(|a, b| a.key.cmp(&b.key));

        let mut cache = Self::default();
        for info in sorted {
            cache.get_or_assign_id(info);
        }
        cache
    }
}

/// Where the cache for one scan directory lives, and how long to wait for its lock
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_file: PathBuf,
    lock_file: PathBuf,
    lock_timeout: Duration,
}

impl CacheStore {
    /// Default location under the user cache directory, keyed by the scan directory
    pub fn for_scan_dir(scan_dir: &Path, lock_timeout: Duration) -> Result<Self> {
        let dir = get_scan_cache_directory(scan_dir)?;
        Ok(Self::in_dir(&dir, lock_timeout))
    }

    /// Pin the cache and its lock to an explicit directory
    pub fn in_dir(dir: &Path, lock_timeout: Duration) -> Self {
        Self {
            cache_file: dir.join(CACHE_FILE_NAME),
            lock_file: dir.join(LOCK_FILE_NAME),
            lock_timeout,
        }
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    pub fn lock(&self) -> Result<CacheLock> {
        CacheLock::acquire(&self.lock_file, self.lock_timeout)
    }

    /// Take the lock, then load. The returned lock must outlive every mutation.
    pub fn load_locked(&self) -> Result<(WorktreeCache, CacheLock)> {
        let lock = self.lock()?;
        let cache = self.load()?;
        Ok((cache, lock))
    }

    /// Read the cache; a missing file is an empty cache with `next_id = 1`
    pub fn load(&self) -> Result<WorktreeCache> {
        if !self.cache_file.exists() {
            log::debug!("No cache at {}, starting empty", self.cache_file.display());
            return Ok(WorktreeCache::default());
        }

        let content = fs::read_to_string(&self.cache_file).map_err(|e| {
            log::error!(
                "Failed to read cache file '{}': {}",
                self.cache_file.display(),
                e
            );
            WtError::cache_read_failed(&self.cache_file, e)
        })?;

        let cache: WorktreeCache = serde_json::from_str(&content).map_err(|e| {
            log::error!(
                "Failed to parse cache file '{}': {}",
                self.cache_file.display(),
                e
            );
            WtError::cache_parse_failed(&self.cache_file, e)
        })?;

        log::debug!(
            "Loaded {} cache entries ({} active)",
            cache.worktrees.len(),
            cache.active_count()
        );
        Ok(cache)
    }

    pub fn save(&self, cache: &WorktreeCache) -> Result<()> {
        if let Some(dir) = self.cache_file.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                log::error!("Failed to create cache directory '{}': {}", dir.display(), e);
                WtError::cache_directory_creation_failed(dir, e)
            })?;
        }

        let json = serde_json::to_string_pretty(cache).map_err(|e| {
            log::error!("Failed to serialize cache data: {e}");
            WtError::cache_serialization_failed(e)
        })?;

        let tmp_file = self.cache_file.with_extension("json.tmp");
        fs::write(&tmp_file, json)
            .and_then(|()| fs::rename(&tmp_file, &self.cache_file))
            .map_err(|e| {
                log::error!(
                    "Failed to write cache file '{}': {}",
                    self.cache_file.display(),
                    e
                );
                let _ = fs::remove_file(&tmp_file);
                WtError::cache_write_failed(&self.cache_file, e)
            })?;

        log::debug!("Saved {} cache entries", cache.worktrees.len());
        Ok(())
    }
}

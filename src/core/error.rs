//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`WtError`] which covers every failure mode of the worktree
//! cache and the doctor engine. It uses `thiserror` for ergonomic error definitions
//! and includes named constructors for the common failure scenarios.
//!
//! # Public API
//! - [`WtError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, WtError>`
//!
//! # Error Categories
//! - **Locking**: the cross-process cache lock could not be taken
//! - **Loading**: the cache file exists but cannot be read or parsed
//! - **Probing**: a worktree or repository could not be inspected
//! - **Persisting**: the cache could not be written back
//! - **Doctor outcome**: unresolved issues or failed fixes

use std::path::PathBuf;
use thiserror::Error;

/// Domain-specific error types for wt
#[derive(Error, Debug)]
pub enum WtError {
    // Scan directory errors
    #[error("Scan directory does not exist: {path}")]
    ScanDirNotFound { path: PathBuf },

    // Lock errors
    #[error("Failed to lock worktree cache '{path}': {source}")]
    LockFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Timed out after {seconds}s waiting for worktree cache lock '{path}'")]
    LockTimeout { path: PathBuf, seconds: u64 },

    // Cache load errors
    #[error("Could not find cache directory")]
    CacheDirectoryNotFound,

    #[error("Failed to read cache file '{path}': {source}")]
    CacheReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse cache file '{path}': {source}. Run 'wt doctor --reset' to rebuild it.")]
    CacheParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    // Cache persist errors
    #[error("Failed to create cache directory '{path}': {source}")]
    CacheDirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize cache data: {source}")]
    CacheSerializationFailed { source: serde_json::Error },

    #[error("Failed to write cache file '{path}': {source}")]
    CacheWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No active cache entry for '{key}'")]
    CacheEntryNotFound { key: String },

    // Probe errors
    #[error("Not a git worktree: {path}")]
    NotAWorktree { path: PathBuf },

    #[error("Cannot locate main repository for worktree: {path}")]
    MainRepoNotFound { path: PathBuf },

    #[error("Worktree link is still broken after repair: {path}")]
    RepairIncomplete { path: PathBuf },

    #[error("git command failed in '{dir}': {message}")]
    GitCommandFailed { dir: PathBuf, message: String },

    #[error("Git repository error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Doctor outcome
    #[error("{count} issue(s) found. Run 'wt doctor --fix' to repair them.")]
    UnresolvedIssues { count: usize },

    #[error("{failed} fix(es) failed ({fixed} applied)")]
    FixesFailed { failed: usize, fixed: usize },
}

/// Convenience type alias for Results using WtError
pub type Result<T> = std::result::Result<T, WtError>;

impl WtError {
    /// Create a scan directory not found error
    pub fn scan_dir_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ScanDirNotFound { path: path.into() }
    }

    /// Create a lock failed error
    pub fn lock_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LockFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a lock timeout error
    pub fn lock_timeout(path: impl Into<PathBuf>, seconds: u64) -> Self {
        Self::LockTimeout {
            path: path.into(),
            seconds,
        }
    }

    /// Create a cache read failed error
    pub fn cache_read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheReadFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a cache parse failed error
    pub fn cache_parse_failed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::CacheParseFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a cache directory creation failed error
    pub fn cache_directory_creation_failed(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::CacheDirectoryCreationFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a cache serialization failed error
    pub fn cache_serialization_failed(source: serde_json::Error) -> Self {
        Self::CacheSerializationFailed { source }
    }

    /// Create a cache write failed error
    pub fn cache_write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn cache_entry_not_found(key: impl Into<String>) -> Self {
        Self::CacheEntryNotFound { key: key.into() }
    }

    pub fn not_a_worktree(path: impl Into<PathBuf>) -> Self {
        Self::NotAWorktree { path: path.into() }
    }

    pub fn main_repo_not_found(path: impl Into<PathBuf>) -> Self {
        Self::MainRepoNotFound { path: path.into() }
    }

    pub fn repair_incomplete(path: impl Into<PathBuf>) -> Self {
        Self::RepairIncomplete { path: path.into() }
    }

    /// Create a git command failed error from captured stderr
    pub fn git_command_failed(dir: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::GitCommandFailed {
            dir: dir.into(),
            message: message.into(),
        }
    }

    /// True for failures that happen before the cache could be read at all
    pub fn is_lock_error(&self) -> bool {
        matches!(self, Self::LockFailed { .. } | Self::LockTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_dir_not_found_error() {
        let err = WtError::scan_dir_not_found("/nope");
        assert_eq!(err.to_string(), "Scan directory does not exist: /nope");
    }

    #[test]
    fn test_lock_timeout_error() {
        let err = WtError::lock_timeout("/tmp/worktrees.lock", 30);
        assert!(err.to_string().contains("30s"));
        assert!(err.to_string().contains("/tmp/worktrees.lock"));
        assert!(err.is_lock_error());
    }

    #[test]
    fn test_cache_parse_failed() {
        let path = PathBuf::from("/test/worktrees.json");
        let json_err = serde_json::from_str::<serde_json::Value>("{ invalid json").unwrap_err();
        let err = WtError::cache_parse_failed(&path, json_err);
        assert!(err.to_string().contains("/test/worktrees.json"));
        assert!(err.to_string().contains("Failed to parse"));
        assert!(!err.is_lock_error());
    }

    #[test]
    fn test_cache_write_failed() {
        let path = PathBuf::from("/test/worktrees.json");
        let io_err = std::io::Error::new(std::io::ErrorKind::OutOfMemory, "no space left");
        let err = WtError::cache_write_failed(&path, io_err);
        assert!(err.to_string().contains("/test/worktrees.json"));
        assert!(err.to_string().contains("no space left"));
    }

    #[test]
    fn test_git_command_failed() {
        let err = WtError::git_command_failed("/repo", "fatal: not a git repository");
        assert_eq!(
            err.to_string(),
            "git command failed in '/repo': fatal: not a git repository"
        );
    }

    #[test]
    fn test_doctor_outcome_errors() {
        assert_eq!(
            WtError::UnresolvedIssues { count: 3 }.to_string(),
            "3 issue(s) found. Run 'wt doctor --fix' to repair them."
        );
        assert_eq!(
            WtError::FixesFailed { failed: 1, fixed: 4 }.to_string(),
            "1 fix(es) failed (4 applied)"
        );
    }
}

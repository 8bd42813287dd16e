//! wt - worktree identity tracking and self-healing for directories full of git worktrees.
//!
//! Every worktree found under a scan directory gets a short numeric ID that survives
//! moves and renames. `wt doctor` finds and repairs drift between that cache, the
//! filesystem, and git's own worktree links.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module, which provides:
//! - The persisted worktree cache and its exclusive lock
//! - Git probing, link repair, and metadata pruning
//! - Issue detection and fixing
//! - Error handling and result types

pub mod commands;
pub mod core;

// Re-export the core public API for external users
pub use core::{
    // Doctor engine
    apply_fixes,
    detect,
    // Cache
    CacheEntry,
    CacheLock,
    CacheStore,
    Detection,
    FixAction,
    FixReport,
    // Git operations
    GitRepo,
    Issue,
    IssueCategory,
    IssueSummary,
    // Error handling
    Result,
    WorktreeCache,
    WorktreeInfo,
    WtConfig,
    WtError,
};

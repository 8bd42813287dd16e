//! Core functionality for the wt tool.
//!
//! This module provides the building blocks behind every command: the persisted
//! worktree cache and its lock, git probing and repair, disk scanning, issue
//! detection and fixing, error handling, and output formatting.

pub mod cache;
pub mod colors;
pub mod config;
pub mod detector;
pub mod dirs;
pub mod error;
pub mod fixer;
pub mod git;
pub mod issues;
pub mod lock;
pub mod output;
pub mod scan;

// === Error handling ===
// Core error types and result type used throughout the application
pub use error::{Result, WtError};

// === Configuration ===
pub use config::WtConfig;

// === Cache ===
// Persisted worktree identities and the locked store that reads and writes them
pub use cache::{CacheEntry, CacheStore, SyncSummary, WorktreeCache, WorktreeInfo};
pub use lock::CacheLock;

// === Git operations ===
// Read-only repository access via git2; mutations go through the git CLI
pub use git::{GitRepo, GitWorktreeEntry};

// === Doctor engine ===
pub use detector::{detect, Detection, IssueSummary};
pub use fixer::{apply_fixes, FixOutcome, FixReport};
pub use issues::{FixAction, Issue, IssueCategory};

// === Color system ===
pub use colors::{format_issue_line, format_worktree_line, get_category_color_style};

// === Output formatting ===
// Unified output formatting for consistent CLI presentation
pub use output::{
    print_error, print_fix_line, print_info, print_section_header, print_success, print_warning,
};

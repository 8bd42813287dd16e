//! Typed doctor findings.
//!
//! An [`Issue`] is never persisted: the detector produces them from the cache plus live
//! probes, the report prints them and the fixer consumes them.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueCategory {
    /// The cache disagrees with itself or with the filesystem
    Cache,
    /// The worktree ↔ repository link is broken or git holds stale metadata
    Git,
    /// A worktree exists with no cache entry, or an entry git no longer knows
    Orphan,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 3] = [Self::Cache, Self::Git, Self::Orphan];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Git => "git",
            Self::Orphan => "orphan",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Cache => "Cache issues",
            Self::Git => "Git link issues",
            Self::Orphan => "Orphans",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FixAction {
    /// Hard-delete a legacy-format entry
    Remove,
    /// Refill an empty `repo_path` (and branch/origin) from git
    UpdateMetadata,
    /// Point the entry at where the naming convention says the worktree is
    UpdatePath,
    /// Give a duplicate-ID entry a fresh ID
    ReassignId,
    /// Regenerate both halves of the worktree ↔ repository link
    Repair,
    /// Track a worktree found on disk
    AddToCache,
    /// Soft-delete the entry
    MarkRemoved,
    /// Drop the repository's stale worktree metadata
    Prune,
}

impl FixAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remove => "remove",
            Self::UpdateMetadata => "update_metadata",
            Self::UpdatePath => "update_path",
            Self::ReassignId => "reassign_id",
            Self::Repair => "repair",
            Self::AddToCache => "add_to_cache",
            Self::MarkRemoved => "mark_removed",
            Self::Prune => "prune",
        }
    }

    /// Order in which the fixer applies actions. Repairs must land before prunes,
    /// otherwise pruning deletes the metadata a moved worktree still needs. Metadata
    /// is read back from git, so it waits until broken links have been repaired.
    pub fn phase(&self) -> u8 {
        match self {
            Self::Remove => 0,
            Self::UpdatePath => 1,
            Self::ReassignId => 2,
            Self::Repair => 3,
            Self::UpdateMetadata => 4,
            Self::AddToCache => 5,
            Self::MarkRemoved => 6,
            Self::Prune => 7,
        }
    }
}

impl fmt::Display for FixAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Cache key, or the discovered path for orphans and prunable metadata
    pub key: String,
    pub category: IssueCategory,
    pub description: String,
    pub fix_action: FixAction,
    /// Repository a git-level fix has to run against
    pub repo_path: Option<PathBuf>,
}

impl Issue {
    pub fn new(
        key: impl Into<String>,
        category: IssueCategory,
        fix_action: FixAction,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            category,
            description: description.into(),
            fix_action,
            repo_path: None,
        }
    }

    pub fn with_repo(mut self, repo_path: impl Into<PathBuf>) -> Self {
        self.repo_path = Some(repo_path.into());
        self
    }
}

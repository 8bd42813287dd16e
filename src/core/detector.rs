//! Issue detection over a loaded cache.
//!
//! Three independent passes run against the same unmodified [`WorktreeCache`]:
//!
//! 1. **Cache integrity**: legacy keys, vanished paths, moved paths, missing
//!    metadata, and duplicate IDs.
//! 2. **Git links**: broken worktree ↔ repository links and stale metadata inside
//!    each distinct repository.
//! 3. **Orphans**: worktrees on disk with no entry, and entries git no longer lists.
//!
//! Each pass flags at most one issue per entry. Probes are read-only; a probe that
//! fails is logged and skipped without aborting the run.

use crate::core::{
    cache::{is_legacy_key, CacheEntry, WorktreeCache},
    git,
    issues::{FixAction, Issue, IssueCategory},
    scan::{find_worktree_dirs, predicted_path, worktree_key},
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Aggregate view printed after the issue list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueSummary {
    /// Active entries with no issue in any category
    pub healthy: usize,
    /// Issues the fixer resolves without retiring anything
    pub repairable: usize,
    /// Entries that can only be retired or removed
    pub unrepairable: usize,
    /// Worktrees on disk waiting to be adopted
    pub orphaned: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub issues: Vec<Issue>,
    pub summary: IssueSummary,
}

impl Detection {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, category: IssueCategory) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.category == category)
            .count()
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Run all three passes
pub fn detect(cache: &WorktreeCache, scan_dir: &Path) -> Detection {
    let mut issues = check_cache_integrity(cache, scan_dir);

    let skip: HashSet<String> = issues
        .iter()
        .filter(|issue| {
            matches!(
                issue.fix_action,
                FixAction::Remove | FixAction::MarkRemoved | FixAction::UpdatePath
            )
        })
        .map(|issue| issue.key.clone())
        .collect();
    let git_issues = check_git_links(cache, scan_dir, &skip);

    let mut flagged = skip;
    flagged.extend(git_issues.iter().map(|issue| issue.key.clone()));
    issues.extend(git_issues);
    issues.extend(check_orphans(cache, scan_dir, &flagged));

    let summary = summarize(cache, &issues);
    log::debug!("Detected {} issue(s): {summary:?}", issues.len());
    Detection { issues, summary }
}

fn summarize(cache: &WorktreeCache, issues: &[Issue]) -> IssueSummary {
    let mut summary = IssueSummary::default();
    for issue in issues {
        match issue.fix_action {
            FixAction::AddToCache => summary.orphaned += 1,
            FixAction::Remove | FixAction::MarkRemoved => summary.unrepairable += 1,
            _ => summary.repairable += 1,
        }
    }

    let with_issues: HashSet<&str> = issues.iter().map(|issue| issue.key.as_str()).collect();
    summary.healthy = cache
        .active_entries()
        .filter(|(key, _)| !with_issues.contains(key.as_str()))
        .count();
    summary
}

/// Pass 1: the cache against itself and the filesystem
pub fn check_cache_integrity(cache: &WorktreeCache, scan_dir: &Path) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut retiring = HashSet::new();

    for (key, entry) in cache.active_entries() {
        if is_legacy_key(key) {
            issues.push(Issue::new(
                key,
                IssueCategory::Cache,
                FixAction::Remove,
                "legacy key format",
            ));
            retiring.insert(key.as_str());
            continue;
        }

        let predicted = predicted_path(scan_dir, key);
        if entry.path != predicted && git::is_worktree(&predicted) {
            issues.push(Issue::new(
                key,
                IssueCategory::Cache,
                FixAction::UpdatePath,
                format!(
                    "path {} is stale, worktree found at {}",
                    entry.path.display(),
                    predicted.display()
                ),
            ));
        } else if !entry.path.exists() {
            issues.push(Issue::new(
                key,
                IssueCategory::Cache,
                FixAction::MarkRemoved,
                format!("path {} no longer exists", entry.path.display()),
            ));
            retiring.insert(key.as_str());
        } else if entry.repo_path.as_os_str().is_empty() {
            issues.push(Issue::new(
                key,
                IssueCategory::Cache,
                FixAction::UpdateMetadata,
                "missing repository path",
            ));
        }
    }

    // Lowest key keeps a contested ID; BTreeMap iteration makes that deterministic
    let mut claimants: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for (key, entry) in cache.active_entries() {
        if !retiring.contains(key.as_str()) {
            claimants.entry(entry.id).or_default().push(key);
        }
    }
    for (id, keys) in claimants {
        for key in keys.into_iter().skip(1) {
            issues.push(Issue::new(
                key,
                IssueCategory::Cache,
                FixAction::ReassignId,
                format!("duplicate id {id}"),
            ));
        }
    }

    issues
}

/// Pass 2: worktree ↔ repository links, plus stale metadata per repository
pub fn check_git_links(
    cache: &WorktreeCache,
    scan_dir: &Path,
    skip: &HashSet<String>,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut repos: BTreeSet<PathBuf> = BTreeSet::new();
    // Metadata about to be repaired must not be reported as prunable
    let mut repairing: HashSet<(PathBuf, String)> = HashSet::new();

    for (key, entry) in cache.active_entries() {
        if skip.contains(key) || is_legacy_key(key) {
            continue;
        }

        if entry.repo_path.is_dir() {
            repos.insert(canonical(&entry.repo_path));
        }

        if let Some(issue) = classify_link(key, entry, scan_dir) {
            if let (FixAction::Repair, Some(repo)) = (issue.fix_action, &issue.repo_path) {
                repos.insert(repo.clone());
                if let Some(name) = git::worktree_metadata_name(&entry.path) {
                    repairing.insert((repo.clone(), name));
                }
            }
            issues.push(issue);
        }
    }

    for repo in repos {
        let names = match git::list_prunable(&repo) {
            Ok(names) => names,
            Err(e) => {
                log::warn!("Skipping prune check for {}: {e}", repo.display());
                continue;
            }
        };

        let worktrees_dir = git::repo_common_dir(&repo)
            .unwrap_or_else(|| repo.clone())
            .join("worktrees");
        for name in names {
            if repairing.contains(&(repo.clone(), name.clone())) {
                continue;
            }
            issues.push(
                Issue::new(
                    worktrees_dir.join(&name).to_string_lossy(),
                    IssueCategory::Git,
                    FixAction::Prune,
                    format!("stale worktree metadata '{name}' in {}", repo.display()),
                )
                .with_repo(repo.clone()),
            );
        }
    }

    issues
}

fn classify_link(key: &str, entry: &CacheEntry, scan_dir: &Path) -> Option<Issue> {
    let dot_git = entry.path.join(".git");

    if !dot_git.exists() {
        return Some(Issue::new(
            key,
            IssueCategory::Git,
            FixAction::MarkRemoved,
            "no .git file, not a worktree anymore",
        ));
    }

    if git::is_main_repo(&entry.path) {
        return Some(Issue::new(
            key,
            IssueCategory::Git,
            FixAction::MarkRemoved,
            "main repository tracked as a worktree",
        ));
    }

    if git::is_link_valid(&entry.path) {
        return None;
    }

    let hints = [entry.repo_path.as_path()];
    match git::locate_main_repo(&entry.path, &hints, Some(scan_dir)) {
        Some(repo) => Some(
            Issue::new(
                key,
                IssueCategory::Git,
                FixAction::Repair,
                format!("broken link to {}", repo.display()),
            )
            .with_repo(repo),
        ),
        None => Some(Issue::new(
            key,
            IssueCategory::Git,
            FixAction::MarkRemoved,
            "broken link, main repository not found",
        )),
    }
}

/// Pass 3: worktrees the cache misses, and entries git has forgotten
pub fn check_orphans(
    cache: &WorktreeCache,
    scan_dir: &Path,
    flagged: &HashSet<String>,
) -> Vec<Issue> {
    let mut issues = Vec::new();

    let tracked_paths: HashSet<PathBuf> = cache
        .active_entries()
        .map(|(_, entry)| canonical(&entry.path))
        .collect();

    for dir in find_worktree_dirs(scan_dir) {
        let key_tracked = worktree_key(scan_dir, &dir).is_some_and(|key| {
            cache
                .worktrees
                .get(&key)
                .is_some_and(CacheEntry::is_active)
        });
        if key_tracked || tracked_paths.contains(&canonical(&dir)) {
            continue;
        }

        // Nothing to adopt if we cannot tell which repository owns it
        let Some(repo) = git::locate_main_repo(&dir, &[], Some(scan_dir)) else {
            log::debug!("Ignoring unlinked worktree {}", dir.display());
            continue;
        };

        issues.push(
            Issue::new(
                dir.to_string_lossy(),
                IssueCategory::Orphan,
                FixAction::AddToCache,
                "worktree not tracked in cache",
            )
            .with_repo(repo),
        );
    }

    let mut listed: HashMap<PathBuf, Option<HashSet<PathBuf>>> = HashMap::new();
    for (key, entry) in cache.active_entries() {
        if flagged.contains(key)
            || !entry.path.exists()
            || entry.repo_path.as_os_str().is_empty()
            || !entry.repo_path.is_dir()
        {
            continue;
        }

        if repo_lists(&mut listed, &entry.repo_path, &entry.path) != Some(false) {
            continue;
        }

        // A live worktree credited to the wrong repository only needs its metadata
        let owner = git::get_main_repo_path(&entry.path)
            .ok()
            .filter(|owner| repo_lists(&mut listed, owner, &entry.path) == Some(true));
        match owner {
            Some(owner) => issues.push(
                Issue::new(
                    key,
                    IssueCategory::Cache,
                    FixAction::UpdateMetadata,
                    format!(
                        "{} does not list it, {} does",
                        entry.repo_path.display(),
                        owner.display()
                    ),
                )
                .with_repo(owner),
            ),
            None => issues.push(Issue::new(
                key,
                IssueCategory::Orphan,
                FixAction::MarkRemoved,
                format!(
                    "ghost entry, {} does not list it",
                    entry.repo_path.display()
                ),
            )),
        }
    }

    issues
}

/// Whether `repo` lists `worktree`; `None` when the repository cannot be read
fn repo_lists(
    listed: &mut HashMap<PathBuf, Option<HashSet<PathBuf>>>,
    repo: &Path,
    worktree: &Path,
) -> Option<bool> {
    listed
        .entry(repo.to_path_buf())
        .or_insert_with(|| match git::list_worktrees_from_repo(repo) {
            Ok(worktrees) => Some(worktrees.iter().map(|wt| canonical(&wt.path)).collect()),
            Err(e) => {
                log::warn!("Cannot list worktrees of {}: {e}", repo.display());
                None
            }
        })
        .as_ref()
        .map(|known| known.contains(&canonical(worktree)))
}

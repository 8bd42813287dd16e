//! Applies detected issues to the in-memory cache and, for link repairs and prunes,
//! to git's own bookkeeping.
//!
//! Fixes run in [`FixAction::phase`] order and one failure never aborts the batch.
//! Nothing here persists the cache: the caller saves it once, after the whole batch,
//! while still holding the lock.

use crate::core::{
    cache::{CacheEntry, WorktreeCache},
    error::{Result, WtError},
    git,
    issues::{FixAction, Issue},
    scan::{predicted_path, probe_worktree},
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct FixOutcome {
    pub issue: Issue,
    /// Short description of what changed, or why it could not
    pub result: Result<String>,
}

#[derive(Debug, Default)]
pub struct FixReport {
    pub fixed: usize,
    pub failed: usize,
    pub outcomes: Vec<FixOutcome>,
}

struct FixContext<'a> {
    cache: &'a mut WorktreeCache,
    scan_dir: &'a Path,
    pruned: HashSet<PathBuf>,
}

pub fn apply_fixes(cache: &mut WorktreeCache, issues: &[Issue], scan_dir: &Path) -> FixReport {
    let mut ordered: Vec<&Issue> = issues.iter().collect();
    ordered.sort_by(|a, b| {
        a.fix_action
            .phase()
            .cmp(&b.fix_action.phase())
            .then_with(|| a.key.cmp(&b.key))
    });

    let mut ctx = FixContext {
        cache,
        scan_dir,
        pruned: HashSet::new(),
    };
    let mut report = FixReport::default();

    for issue in ordered {
        let result = ctx.apply(issue);
        match &result {
            Ok(detail) => {
                log::debug!("Fixed {} ({}): {detail}", issue.key, issue.fix_action);
                report.fixed += 1;
            }
            Err(e) => {
                log::warn!("Fix {} failed for {}: {e}", issue.fix_action, issue.key);
                report.failed += 1;
            }
        }
        report.outcomes.push(FixOutcome {
            issue: issue.clone(),
            result,
        });
    }

    report
}

impl FixContext<'_> {
    fn apply(&mut self, issue: &Issue) -> Result<String> {
        match issue.fix_action {
            FixAction::Remove => self.remove(&issue.key),
            FixAction::MarkRemoved => self.mark_removed(&issue.key),
            FixAction::UpdatePath => self.update_path(&issue.key),
            FixAction::UpdateMetadata => self.update_metadata(&issue.key),
            FixAction::ReassignId => self.reassign_id(&issue.key),
            FixAction::Repair => self.repair(&issue.key, issue.repo_path.as_deref()),
            FixAction::AddToCache => self.add_to_cache(&issue.key, issue.repo_path.as_deref()),
            FixAction::Prune => self.prune(&issue.key, issue.repo_path.as_deref()),
        }
    }

    fn remove(&mut self, key: &str) -> Result<String> {
        self.cache
            .remove(key)
            .map(|entry| format!("removed entry #{}", entry.id))
            .ok_or_else(|| WtError::cache_entry_not_found(key))
    }

    fn mark_removed(&mut self, key: &str) -> Result<String> {
        match self.cache.worktrees.get(key) {
            None => Err(WtError::cache_entry_not_found(key)),
            Some(entry) if !entry.is_active() => Ok("already removed".to_string()),
            Some(entry) => {
                let id = entry.id;
                self.cache.mark_removed(key);
                Ok(format!("retired #{id}"))
            }
        }
    }

    fn update_path(&mut self, key: &str) -> Result<String> {
        let predicted = predicted_path(self.scan_dir, key);
        let info = probe_worktree(self.scan_dir, &predicted)
            .ok_or_else(|| WtError::not_a_worktree(&predicted))?;

        let entry = self
            .cache
            .worktrees
            .get_mut(key)
            .filter(|entry| entry.is_active())
            .ok_or_else(|| WtError::cache_entry_not_found(key))?;
        entry.path = info.path.clone();
        if !info.repo_path.as_os_str().is_empty() {
            entry.repo_path = info.repo_path;
        }
        if !info.branch.is_empty() {
            entry.branch = info.branch;
        }

        Ok(format!("path now {}", predicted.display()))
    }

    fn update_metadata(&mut self, key: &str) -> Result<String> {
        let scan_dir = self.scan_dir;
        let entry = self
            .cache
            .worktrees
            .get_mut(key)
            .filter(|entry| entry.is_active())
            .ok_or_else(|| WtError::cache_entry_not_found(key))?;

        // Follows the recorded pointer first, then searches the scan directory
        let repo_path = git::locate_main_repo(&entry.path, &[], Some(scan_dir))
            .ok_or_else(|| WtError::main_repo_not_found(&entry.path))?;
        refresh_git_metadata(entry, &repo_path);
        entry.repo_path = repo_path;

        Ok(format!("repository {}", entry.repo_path.display()))
    }

    fn reassign_id(&mut self, key: &str) -> Result<String> {
        self.cache
            .reassign_id(key)
            .map(|id| format!("now #{id}"))
            .ok_or_else(|| WtError::cache_entry_not_found(key))
    }

    fn repair(&mut self, key: &str, repo_path: Option<&Path>) -> Result<String> {
        let entry = self
            .cache
            .worktrees
            .get_mut(key)
            .filter(|entry| entry.is_active())
            .ok_or_else(|| WtError::cache_entry_not_found(key))?;
        let repo_path = repo_path.ok_or_else(|| WtError::main_repo_not_found(&entry.path))?;

        git::repair(repo_path, &entry.path)?;
        refresh_git_metadata(entry, repo_path);
        entry.repo_path = repo_path.to_path_buf();

        Ok(format!("relinked to {}", repo_path.display()))
    }

    fn add_to_cache(&mut self, discovered: &str, repo_path: Option<&Path>) -> Result<String> {
        let path = PathBuf::from(discovered);

        // A moved orphan is relinked before it is adopted
        if !git::is_link_valid(&path) {
            let repo_path = repo_path.ok_or_else(|| WtError::main_repo_not_found(&path))?;
            git::repair(repo_path, &path)?;
        }

        let info =
            probe_worktree(self.scan_dir, &path).ok_or_else(|| WtError::not_a_worktree(&path))?;
        if info.repo_path.as_os_str().is_empty() {
            return Err(WtError::main_repo_not_found(&path));
        }

        let id = self.cache.get_or_assign_id(&info);
        Ok(format!("tracked as #{id}"))
    }

    fn prune(&mut self, key: &str, repo_path: Option<&Path>) -> Result<String> {
        let repo_path = repo_path.ok_or_else(|| WtError::main_repo_not_found(key))?;

        if !self.pruned.insert(repo_path.to_path_buf()) {
            return Ok("already pruned".to_string());
        }
        git::prune(repo_path)?;
        Ok(format!("pruned {}", repo_path.display()))
    }
}

/// Re-read what git knows about a worktree whose link resolves
fn refresh_git_metadata(entry: &mut CacheEntry, repo_path: &Path) {
    match git::get_current_branch(&entry.path) {
        Ok(branch) => entry.branch = branch,
        Err(e) => log::debug!("Keeping cached branch for {}: {e}", entry.path.display()),
    }
    if let Ok(Some(url)) = git::get_origin_url(repo_path) {
        entry.origin_url = url;
    }
}

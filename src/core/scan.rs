//! Discovery of worktrees under a scan directory.
//!
//! The lookup key of a worktree is its path relative to the scan directory with `/`
//! separators, so `scan_dir.join(key)` is where the naming convention expects it.

use crate::core::{
    cache::WorktreeInfo,
    git::{self, is_worktree},
};
use std::fs;
use std::path::{Component, Path, PathBuf};

const MAX_SCAN_DEPTH: usize = 3;

/// Lookup key for `path`, or `None` when it is not under `scan_dir`
pub fn worktree_key(scan_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(scan_dir).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Where the naming convention places the worktree for `key`
pub fn predicted_path(scan_dir: &Path, key: &str) -> PathBuf {
    key.split('/')
        .fold(scan_dir.to_path_buf(), |path, part| path.join(part))
}

/// Every directory under `scan_dir` that carries a `.git` file
pub fn find_worktree_dirs(scan_dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    walk(scan_dir, 1, &mut found);
    found.sort();
    found
}

fn walk(dir: &Path, depth: usize, found: &mut Vec<PathBuf>) {
    if depth > MAX_SCAN_DEPTH {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Skipping unreadable directory {}: {e}", dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        // Symlinked directories are not followed
        if !file_type.is_dir() || entry.file_name() == ".git" {
            continue;
        }

        let path = entry.path();
        if is_worktree(&path) {
            found.push(path);
            continue;
        }
        walk(&path, depth + 1, found);
    }
}

/// Probe one worktree directory; fields that cannot be resolved stay empty
pub fn probe_worktree(scan_dir: &Path, path: &Path) -> Option<WorktreeInfo> {
    let key = worktree_key(scan_dir, path)?;

    let repo_path = match git::get_main_repo_path(path) {
        Ok(repo) => repo,
        Err(e) => {
            log::warn!("Cannot resolve main repository of {}: {e}", path.display());
            PathBuf::new()
        }
    };

    let branch = git::get_current_branch(path).unwrap_or_else(|e| {
        log::debug!("Cannot read branch of {}: {e}", path.display());
        String::new()
    });

    let origin_url = if repo_path.as_os_str().is_empty() {
        String::new()
    } else {
        git::get_origin_url(&repo_path)
            .ok()
            .flatten()
            .unwrap_or_default()
    };

    Some(WorktreeInfo {
        key,
        path: path.to_path_buf(),
        repo_path,
        branch,
        origin_url,
    })
}

/// Probe every worktree under `scan_dir`
pub fn scan_worktrees(scan_dir: &Path) -> Vec<WorktreeInfo> {
    let infos: Vec<WorktreeInfo> = find_worktree_dirs(scan_dir)
        .iter()
        .filter_map(|path| probe_worktree(scan_dir, path))
        .collect();

    log::debug!("Found {} worktrees under {}", infos.len(), scan_dir.display());
    infos
}

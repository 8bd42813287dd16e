use crate::core::{
    cache::{CacheStore, WorktreeCache},
    colors::format_worktree_line,
    error::Result,
    print_info,
    scan::scan_worktrees,
};
use std::path::Path;

/// Rescan `scan_dir`, reconcile the cache with what is on disk, and print every
/// tracked worktree with its ID.
pub fn execute_list(store: &CacheStore, scan_dir: &Path) -> Result<WorktreeCache> {
    let (mut cache, _lock) = store.load_locked()?;

    let scanned = scan_worktrees(scan_dir);
    let summary = cache.sync_worktrees(&scanned);
    log::debug!(
        "Synced cache: {} added, {} refreshed, {} removed",
        summary.added,
        summary.refreshed,
        summary.removed
    );
    store.save(&cache)?;

    let mut entries: Vec<_> = cache.active_entries().collect();
    if entries.is_empty() {
        print_info(&format!("No worktrees found in {}", scan_dir.display()));
        return Ok(cache);
    }

    entries.sort_by_key(|(_, entry)| entry.id);
    println!();
    for (key, entry) in entries {
        println!(
            "{}",
            format_worktree_line(entry.id, key, &entry.branch, &entry.path.to_string_lossy())
        );
    }
    println!();

    Ok(cache)
}

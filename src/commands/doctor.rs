use crate::core::{
    cache::{CacheStore, WorktreeCache},
    colors::format_issue_line,
    detector::{detect, Detection},
    error::{Result, WtError},
    fixer::{apply_fixes, FixReport},
    issues::IssueCategory,
    print_fix_line, print_info, print_section_header, print_success, print_warning,
    scan::scan_worktrees,
};
use colored::*;
use std::path::Path;

/// Diagnose the cache for `scan_dir` and, with `fix`, repair what can be repaired.
///
/// Lock → load → detect → report → (fix → persist) → unlock. The cache is written at
/// most once, after every fix has been attempted, and success is only reported once
/// that write has landed.
///
/// Returns an error when issues remain in report-only mode or when any fix failed.
pub fn execute_doctor(store: &CacheStore, scan_dir: &Path, fix: bool) -> Result<()> {
    let (mut cache, _lock) = store.load_locked()?;
    log::debug!("Running doctor on {} (fix = {fix})", scan_dir.display());

    let detection = detect(&cache, scan_dir);
    print_detection(&detection);

    if detection.is_clean() {
        print_success(&format!(
            "All {} tracked worktree(s) are healthy.",
            cache.active_count()
        ));
        return Ok(());
    }

    if !fix {
        return Err(WtError::UnresolvedIssues {
            count: detection.issues.len(),
        });
    }

    let report = apply_fixes(&mut cache, &detection.issues, scan_dir);
    store.save(&cache)?;
    print_fix_report(&report);

    if report.failed > 0 {
        return Err(WtError::FixesFailed {
            failed: report.failed,
            fixed: report.fixed,
        });
    }

    print_success(&format!("Fixed {} issue(s).", report.fixed));
    Ok(())
}

/// Throw the cache away and rebuild it from the worktrees on disk, IDs from 1.
///
/// The old cache file is never read, so this also recovers from a corrupt cache.
pub fn execute_reset(store: &CacheStore, scan_dir: &Path) -> Result<WorktreeCache> {
    let _lock = store.lock()?;

    print_warning("Resetting the worktree cache. All worktree IDs will be reassigned.");

    let (linked, unlinked): (Vec<_>, Vec<_>) = scan_worktrees(scan_dir)
        .into_iter()
        .partition(|info| !info.repo_path.as_os_str().is_empty());
    for info in &unlinked {
        log::warn!(
            "Skipping {}: main repository not found",
            info.path.display()
        );
    }

    let cache = WorktreeCache::from_scan(&linked);
    store.save(&cache)?;

    print_success(&format!(
        "Rebuilt cache with {} worktree(s).",
        cache.active_count()
    ));
    if !unlinked.is_empty() {
        print_info(&format!(
            "{} worktree(s) skipped because their repository could not be found. \
             Run 'wt doctor --fix' after relocating them.",
            unlinked.len()
        ));
    }

    Ok(cache)
}

fn print_detection(detection: &Detection) {
    for category in IssueCategory::ALL {
        let issues: Vec<_> = detection
            .issues
            .iter()
            .filter(|issue| issue.category == category)
            .collect();
        if issues.is_empty() {
            continue;
        }

        print_section_header(&format!("{} ({})", category.title(), issues.len()));
        for issue in issues {
            println!("{}", format_issue_line(issue));
        }
    }

    let summary = detection.summary;
    println!(
        "\n{} {}  {} {}  {} {}  {} {}",
        "healthy:".bright_black(),
        summary.healthy.to_string().green(),
        "repairable:".bright_black(),
        summary.repairable.to_string().yellow(),
        "unrepairable:".bright_black(),
        summary.unrepairable.to_string().red(),
        "orphaned:".bright_black(),
        summary.orphaned.to_string().cyan(),
    );
}

fn print_fix_report(report: &FixReport) {
    print_section_header("Fixes");
    for outcome in &report.outcomes {
        let result = match &outcome.result {
            Ok(detail) => Ok(detail.as_str()),
            Err(e) => Err(e.to_string()),
        };
        print_fix_line(
            &format!("{} {}", outcome.issue.fix_action, outcome.issue.key),
            result,
        );
    }
}

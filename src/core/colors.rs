//! Unified color system for doctor and list output.
//!
//! Every issue category and fix outcome maps to one color here so the report reads the
//! same everywhere.
//!
//! # Color Scheme
//! - **Cache**: Yellow, the cache disagrees with the disk
//! - **Git**: Red, git's own links or metadata are broken
//! - **Orphan**: Cyan, something exists that nothing tracks
//! - **IDs**: Cyan bold, matching how worktrees are addressed on the command line

use crate::core::issues::{FixAction, Issue, IssueCategory};
use colored::*;

/// Returns a closure that colors any text in the category's color
pub fn get_category_color_style(category: IssueCategory) -> Box<dyn Fn(&str) -> ColoredString> {
    match category {
        IssueCategory::Cache => Box::new(|text: &str| text.yellow()),
        IssueCategory::Git => Box::new(|text: &str| text.red()),
        IssueCategory::Orphan => Box::new(|text: &str| text.cyan()),
    }
}

/// Retiring actions are dimmed; anything that keeps the worktree alive stays bright
pub fn get_action_label(action: FixAction) -> ColoredString {
    let label = format!("[{action}]");
    match action {
        FixAction::Remove | FixAction::MarkRemoved | FixAction::Prune => label.bright_black(),
        _ => label.green(),
    }
}

/// `  <key>  <description>  [action]`, key colored by category
pub fn format_issue_line(issue: &Issue) -> String {
    let color_fn = get_category_color_style(issue.category);
    format!(
        "  {}  {}  {}",
        color_fn(&issue.key),
        issue.description.white(),
        get_action_label(issue.fix_action)
    )
}

/// `[id] key  branch  path` for `wt list`
pub fn format_worktree_line(id: u32, key: &str, branch: &str, path: &str) -> String {
    let id_colored = format!("[{id}]").cyan().bold();
    format!(
        "{id_colored} {}  {}  {}",
        key.white(),
        branch.green(),
        path.bright_black()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_issue_line() {
        let issue = Issue::new(
            "repo-feature",
            IssueCategory::Git,
            FixAction::Repair,
            "broken link",
        );
        let line = format_issue_line(&issue);
        assert!(line.contains("repo-feature"));
        assert!(line.contains("broken link"));
        assert!(line.contains("[repair]"));
    }

    #[test]
    fn test_format_worktree_line() {
        let line = format_worktree_line(3, "repo-fix", "fix", "/src/repo-fix");
        assert!(line.contains("[3]"));
        assert!(line.contains("repo-fix"));
        assert!(line.contains("/src/repo-fix"));
    }

    #[test]
    fn test_category_color_style_consistency() {
        for category in IssueCategory::ALL {
            let color_fn = get_category_color_style(category);
            assert_eq!(color_fn("x").to_string(), color_fn("x").to_string());
        }
    }
}

//! Common assertion helpers for test output validation
//!
//! Provides predicates for validating wt command output and error messages.

#![allow(dead_code)]

use predicates::prelude::*;

/// Doctor in report-only mode found something to fix
pub fn issues_found() -> impl Predicate<str> {
    predicates::str::contains("issue(s) found").and(predicates::str::contains("wt doctor --fix"))
}

/// Doctor found nothing to fix
pub fn all_healthy() -> impl Predicate<str> {
    predicates::str::contains("are healthy")
}

/// Creates a predicate that checks for a worktree listed with its ID
pub fn has_worktree_id(id: u32, key: &str) -> impl Predicate<str> {
    predicates::str::contains(format!("[{id}] {key}"))
}

/// Creates a predicate that checks for a section header in the doctor report
pub fn has_section(title: &str) -> impl Predicate<str> {
    predicates::str::contains(format!("{title} ("))
}

/// Creates a predicate that checks for an issue carrying the given fix action
pub fn has_action(action: &str) -> impl Predicate<str> {
    predicates::str::contains(format!("[{action}]"))
}

pub fn corrupt_cache() -> impl Predicate<str> {
    predicates::str::contains("Failed to parse cache file")
        .and(predicates::str::contains("wt doctor --reset"))
}

pub fn lock_timeout() -> impl Predicate<str> {
    predicates::str::contains("waiting for worktree cache lock")
}

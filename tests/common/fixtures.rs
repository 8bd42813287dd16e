//! Predefined workspace scenarios
//!
//! Provides workspaces with repositories and worktrees already laid out under the
//! scan directory, so tests only describe the drift they introduce.

#![allow(dead_code)]

use super::repository::*;
use wt::core::error::Result;

/// Scenario: one repository `app` with worktrees `app-feature` and `app-fix`
///
/// ```text
/// src/
///   app/          main checkout
///   app-feature/  worktree on branch feature
///   app-fix/      worktree on branch fix
/// ```
pub fn create_repo_with_two_worktrees() -> Result<TestWorkspace> {
    let ws = TestWorkspace::new()?;
    let repo = ws.path("app");

    init_repo(&repo)?;
    add_worktree(&repo, &ws.path("app-feature"), "feature")?;
    add_worktree(&repo, &ws.path("app-fix"), "fix")?;

    Ok(ws)
}

/// Scenario: one repository `app` with a single worktree `app-feature`
pub fn create_repo_with_one_worktree() -> Result<TestWorkspace> {
    let ws = TestWorkspace::new()?;
    let repo = ws.path("app");

    init_repo(&repo)?;
    add_worktree(&repo, &ws.path("app-feature"), "feature")?;

    Ok(ws)
}

/// Same as [`create_repo_with_two_worktrees`] with the cache already populated by
/// `wt list`
pub fn create_tracked_workspace() -> Result<TestWorkspace> {
    use assert_cmd::prelude::*;

    let ws = create_repo_with_two_worktrees()?;
    ws.wt().arg("list").assert().success();
    Ok(ws)
}

//! Git repository and workspace management utilities
//!
//! Provides an isolated workspace (scan directory, cache home, config home) plus
//! helpers that drive the real git CLI to create repositories and worktrees.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use wt::core::cache::{CacheStore, WorktreeCache, CACHE_FILE_NAME};
use wt::core::error::{Result, WtError};

/// An isolated wt environment. The TempDir must be kept alive for the duration of
/// the test to prevent cleanup.
pub struct TestWorkspace {
    pub temp_dir: TempDir,
    /// Directory passed to `wt --dir`
    pub scan_dir: PathBuf,
    /// Used as `XDG_CACHE_HOME` for every wt invocation
    pub cache_home: PathBuf,
    /// Used as `XDG_CONFIG_HOME` so no user config leaks in
    pub config_home: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        // Canonical so paths match what wt stores (macOS /tmp is a symlink)
        let root = temp_dir.path().canonicalize()?;

        let scan_dir = root.join("src");
        let cache_home = root.join("cache");
        let config_home = root.join("config");
        for dir in [&scan_dir, &cache_home, &config_home] {
            fs::create_dir_all(dir)?;
        }

        Ok(Self {
            temp_dir,
            scan_dir,
            cache_home,
            config_home,
        })
    }

    /// `wt` with cache and config homes pinned to the workspace and no `--dir`
    pub fn wt_bare(&self) -> Command {
        use assert_cmd::prelude::*;

        let mut cmd = Command::cargo_bin("wt").expect("wt binary is built for integration tests");
        cmd.env("XDG_CACHE_HOME", &self.cache_home)
            .env("XDG_CONFIG_HOME", &self.config_home)
            .env("NO_COLOR", "1")
            .env("CLICOLOR", "0");
        cmd
    }

    /// `wt --dir <dir>`
    pub fn wt_in(&self, dir: &Path) -> Command {
        let mut cmd = self.wt_bare();
        cmd.arg("--dir").arg(dir);
        cmd
    }

    /// `wt --dir <scan_dir>`
    pub fn wt(&self) -> Command {
        self.wt_in(&self.scan_dir)
    }

    /// Write `<config_home>/wt/config.json`
    pub fn write_config(&self, json: &str) -> Result<()> {
        let dir = self.config_home.join("wt");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("config.json"), json)?;
        Ok(())
    }

    /// The single per-scan-dir cache directory wt created under the cache home
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let root = self.cache_home.join("wt");
        let mut dirs = fs::read_dir(&root)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir());

        match (dirs.next(), dirs.next()) {
            (Some(dir), None) => Ok(dir),
            _ => Err(WtError::Io(std::io::Error::other(format!(
                "expected exactly one cache directory under {}",
                root.display()
            )))),
        }
    }

    pub fn cache_file(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join(CACHE_FILE_NAME))
    }

    pub fn store(&self) -> Result<CacheStore> {
        Ok(CacheStore::in_dir(
            &self.cache_dir()?,
            std::time::Duration::from_secs(1),
        ))
    }

    pub fn read_cache(&self) -> Result<WorktreeCache> {
        self.store()?.load()
    }

    pub fn write_cache(&self, cache: &WorktreeCache) -> Result<()> {
        self.store()?.save(cache)
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.scan_dir.join(relative)
    }
}

/// Runs git in `dir` and fails with its stderr if it exits non-zero
pub fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git").args(args).current_dir(dir).output()?;

    if !output.status.success() {
        return Err(WtError::git_command_failed(
            dir,
            String::from_utf8_lossy(&output.stderr).trim(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Initializes a repository on `main` with one commit
pub fn init_repo(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    git(path, &["init", "-b", "main"])?;

    // Set git config to avoid prompts during tests
    git(path, &["config", "user.name", "Test User"])?;
    git(path, &["config", "user.email", "test@example.com"])?;

    fs::write(path.join("README.md"), "test repository\n")?;
    git(path, &["add", "README.md"])?;
    git(path, &["commit", "-m", "Initial commit"])?;
    Ok(())
}

/// `git worktree add -b <branch> <path>` from `repo`
pub fn add_worktree(repo: &Path, path: &Path, branch: &str) -> Result<()> {
    let path_str = path.to_string_lossy();
    git(repo, &["worktree", "add", "-b", branch, &path_str])?;
    Ok(())
}

/// Paths `git worktree list` reports for `repo`, main checkout included
pub fn listed_worktrees(repo: &Path) -> Result<Vec<PathBuf>> {
    let raw = git(repo, &["worktree", "list", "--porcelain"])?;
    Ok(raw
        .lines()
        .filter_map(|line| line.strip_prefix("worktree "))
        .map(PathBuf::from)
        .collect())
}

pub fn move_dir(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(from, to)?;
    Ok(())
}

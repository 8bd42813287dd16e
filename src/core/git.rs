//! Git worktree probing and link repair.
//!
//! Reads go through `git2` (branch, remotes) or straight to the small pointer files git
//! keeps on disk; anything that mutates git state shells out to the `git` CLI so that
//! git itself stays the authority on its own bookkeeping.
//!
//! # Public API
//! - [`GitRepo`]: Thin `git2` wrapper for branch and remote lookups
//! - [`is_worktree`], [`get_main_repo_path`], [`list_worktrees_from_repo`]: probes
//! - [`is_link_valid`], [`can_repair`], [`repair`], [`list_prunable`], [`prune`]:
//!   the bidirectional link primitives
//!
//! # Link layout
//! A linked worktree holds a `.git` *file* containing `gitdir: <metadata dir>`. The
//! metadata dir lives at `<common dir>/worktrees/<name>` and holds a `gitdir` file
//! pointing back at `<worktree>/.git`, plus a `commondir` file pointing at the
//! repository's common dir. Either pointer may be relative to the file holding it.

use crate::core::error::{Result, WtError};
use git2::{ErrorCode, Repository};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const GITDIR_PREFIX: &str = "gitdir:";
const REPO_SEARCH_DEPTH: usize = 3;

pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path)?;
        Ok(GitRepo { repo })
    }

    pub fn get_current_branch(&self) -> Result<String> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                // No commits yet: HEAD is still a symbolic ref to the branch name
                let head_ref = self.repo.find_reference("HEAD")?;
                let target = head_ref.symbolic_target().unwrap_or("");
                return Ok(target.trim_start_matches("refs/heads/").to_string());
            }
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            Ok(head.shorthand().unwrap_or("-none-").to_string())
        } else {
            match head.target() {
                Some(oid) => Ok(format!("detached at {}", &oid.to_string()[..7])),
                None => Ok("-none-".to_string()),
            }
        }
    }

    /// URL of the `origin` remote, if one is configured
    pub fn get_origin_url(&self) -> Result<Option<String>> {
        match self.repo.find_remote("origin") {
            Ok(remote) => Ok(remote.url().map(str::to_string)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Run a git command in `dir` and return its stdout
fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    log::debug!("git -C {} {}", dir.display(), args.join(" "));

    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(WtError::Io)?;

    if !output.status.success() {
        let error_msg = String::from_utf8_lossy(&output.stderr);
        return Err(WtError::git_command_failed(dir, error_msg.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve a pointer read from a file inside `base`
fn resolve_pointer(base: &Path, value: &str) -> PathBuf {
    let pointer = PathBuf::from(value.trim());
    if pointer.is_absolute() {
        pointer
    } else {
        base.join(pointer)
    }
}

/// A worktree has a `.git` file; a main repository has a `.git` directory
pub fn is_worktree(path: &Path) -> bool {
    path.join(".git").is_file()
}

pub fn is_main_repo(path: &Path) -> bool {
    path.join(".git").is_dir()
}

/// Metadata directory the worktree's `.git` file points at (it may not exist)
pub fn read_gitdir_pointer(worktree: &Path) -> Result<PathBuf> {
    let git_file = worktree.join(".git");
    if !git_file.is_file() {
        return Err(WtError::not_a_worktree(worktree));
    }

    let data = fs::read_to_string(&git_file)?;
    let value = data
        .lines()
        .find_map(|line| line.trim().strip_prefix(GITDIR_PREFIX))
        .ok_or_else(|| WtError::not_a_worktree(worktree))?;

    Ok(resolve_pointer(worktree, value))
}

/// Name git uses for this worktree's metadata directory
pub fn worktree_metadata_name(worktree: &Path) -> Option<String> {
    let pointer = read_gitdir_pointer(worktree).ok()?;
    pointer
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Common dir for a metadata directory, via its `commondir` file or its location
fn common_dir_of(metadata_dir: &Path) -> Option<PathBuf> {
    if let Ok(value) = fs::read_to_string(metadata_dir.join("commondir")) {
        return Some(canonical(&resolve_pointer(metadata_dir, &value)));
    }

    let worktrees_dir = metadata_dir.parent()?;
    if worktrees_dir.file_name()? != "worktrees" {
        return None;
    }
    worktrees_dir.parent().map(canonical)
}

/// `<repo>/.git` → `<repo>`; a bare repository is its own common dir
fn repo_from_common_dir(common_dir: &Path) -> PathBuf {
    if common_dir.file_name().is_some_and(|name| name == ".git") {
        common_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| common_dir.to_path_buf())
    } else {
        common_dir.to_path_buf()
    }
}

/// Common dir of a main repository, normal (`.git` dir) or bare
pub fn repo_common_dir(repo: &Path) -> Option<PathBuf> {
    let dot_git = repo.join(".git");
    if dot_git.is_dir() {
        return Some(canonical(&dot_git));
    }
    let looks_bare = repo.join("HEAD").is_file() && repo.join("objects").is_dir();
    looks_bare.then(|| canonical(repo))
}

/// Main repository of a worktree, following the pointers recorded on disk
pub fn get_main_repo_path(worktree: &Path) -> Result<PathBuf> {
    let metadata_dir = read_gitdir_pointer(worktree)?;
    if !metadata_dir.is_dir() {
        return Err(WtError::main_repo_not_found(worktree));
    }

    let common_dir =
        common_dir_of(&metadata_dir).ok_or_else(|| WtError::main_repo_not_found(worktree))?;
    let repo = repo_from_common_dir(&common_dir);
    if !repo.exists() {
        return Err(WtError::main_repo_not_found(worktree));
    }

    Ok(canonical(&repo))
}

pub fn get_current_branch(path: &Path) -> Result<String> {
    GitRepo::open(path)?.get_current_branch()
}

pub fn get_origin_url(repo_path: &Path) -> Result<Option<String>> {
    GitRepo::open(repo_path)?.get_origin_url()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitWorktreeEntry {
    pub path: PathBuf,
    pub branch: Option<String>,
}

/// Worktrees the repository itself knows about, main worktree included
pub fn list_worktrees_from_repo(repo_path: &Path) -> Result<Vec<GitWorktreeEntry>> {
    let stdout = run_git(repo_path, &["worktree", "list", "--porcelain"])?;
    Ok(parse_worktree_porcelain(&stdout))
}

/// Parse `git worktree list --porcelain`; a bare repository's own entry is skipped
pub fn parse_worktree_porcelain(raw: &str) -> Vec<GitWorktreeEntry> {
    let mut entries = Vec::new();
    let mut current_path: Option<PathBuf> = None;
    let mut current_branch: Option<String> = None;
    let mut is_bare = false;

    let mut flush = |current_path: &mut Option<PathBuf>,
                     current_branch: &mut Option<String>,
                     is_bare: &mut bool| {
        let branch = current_branch.take();
        if let Some(path) = current_path.take() {
            if !*is_bare {
                entries.push(GitWorktreeEntry { path, branch });
            }
        }
        *is_bare = false;
    };

    for line in raw.lines() {
        if line.is_empty() {
            flush(&mut current_path, &mut current_branch, &mut is_bare);
            continue;
        }

        if let Some(value) = line.strip_prefix("worktree ") {
            flush(&mut current_path, &mut current_branch, &mut is_bare);
            current_path = Some(PathBuf::from(value.trim()));
        } else if let Some(value) = line.strip_prefix("branch ") {
            let value = value.trim();
            current_branch = Some(value.strip_prefix("refs/heads/").unwrap_or(value).to_string());
        } else if line == "bare" {
            is_bare = true;
        }
    }

    flush(&mut current_path, &mut current_branch, &mut is_bare);
    entries
}

/// Metadata dir's `gitdir` file resolved to the `.git` file it should name
fn read_back_pointer(metadata_dir: &Path) -> Option<PathBuf> {
    let value = fs::read_to_string(metadata_dir.join("gitdir")).ok()?;
    Some(resolve_pointer(metadata_dir, &value))
}

/// Both halves of the link resolve to existing, matching locations
pub fn is_link_valid(worktree: &Path) -> bool {
    let Ok(metadata_dir) = read_gitdir_pointer(worktree) else {
        return false;
    };
    if !metadata_dir.is_dir() {
        return false;
    }

    let Some(back) = read_back_pointer(&metadata_dir) else {
        return false;
    };
    if canonical(&back) != canonical(&worktree.join(".git")) {
        return false;
    }

    common_dir_of(&metadata_dir).is_some_and(|common| common.is_dir())
}

/// True when `repo` owns metadata named `name` that is free for this worktree to claim
fn repo_claims_worktree(repo: &Path, name: &str, worktree: &Path) -> bool {
    let Some(common_dir) = repo_common_dir(repo) else {
        return false;
    };
    let metadata_dir = common_dir.join("worktrees").join(name);
    if !metadata_dir.is_dir() {
        return false;
    }

    // Never steal metadata that still belongs to another live worktree
    match read_back_pointer(&metadata_dir) {
        Some(back) => {
            !back.exists() || canonical(&back) == canonical(&worktree.join(".git"))
        }
        None => true,
    }
}

fn find_repos(dir: &Path, depth: usize, found: &mut Vec<PathBuf>) {
    if depth > REPO_SEARCH_DEPTH {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() || path.file_name().is_some_and(|name| name == ".git") {
            continue;
        }
        if is_worktree(&path) {
            continue;
        }
        if repo_common_dir(&path).is_some() {
            found.push(path.clone());
        }
        find_repos(&path, depth + 1, found);
    }
}

/// Find the current main repository of a worktree whose recorded link may be stale.
///
/// Tries the recorded pointer, then each hint (e.g. the cached `repo_path`), then any
/// repository under `search_root` holding matching worktree metadata.
pub fn locate_main_repo(
    worktree: &Path,
    hints: &[&Path],
    search_root: Option<&Path>,
) -> Option<PathBuf> {
    if let Ok(repo) = get_main_repo_path(worktree) {
        return Some(repo);
    }

    let name = worktree_metadata_name(worktree)?;

    if let Some(repo) = hints
        .iter()
        .filter(|hint| !hint.as_os_str().is_empty())
        .find(|hint| repo_claims_worktree(hint, &name, worktree))
    {
        return Some(canonical(repo));
    }

    // The pointer may still name the old common dir; that repo may exist elsewhere
    let mut candidates = Vec::new();
    if let Some(root) = search_root {
        find_repos(root, 1, &mut candidates);
    }
    candidates.sort();

    candidates
        .into_iter()
        .find(|repo| repo_claims_worktree(repo, &name, worktree))
        .map(|repo| canonical(&repo))
}

/// Enough survives to regenerate both pointers without human input
pub fn can_repair(worktree: &Path, hints: &[&Path], search_root: Option<&Path>) -> bool {
    worktree.is_dir()
        && is_worktree(worktree)
        && locate_main_repo(worktree, hints, search_root).is_some()
}

/// Rewrite both halves of the link between `repo_path` and `worktree_path`
pub fn repair(repo_path: &Path, worktree_path: &Path) -> Result<()> {
    let already_linked = is_link_valid(worktree_path)
        && get_main_repo_path(worktree_path)
            .is_ok_and(|current| current == canonical(repo_path));
    if already_linked {
        log::debug!("Link already valid: {}", worktree_path.display());
        return Ok(());
    }

    let worktree_arg = worktree_path.to_string_lossy();
    if let Err(e) = run_git(repo_path, &["worktree", "repair", worktree_arg.as_ref()]) {
        log::debug!("Path repair failed for {}: {e}", worktree_path.display());
    }

    // Older git cannot follow a dangling .git file; the repository side can still
    // rewrite it from its own metadata. Other broken worktrees make this exit non-zero.
    if !is_link_valid(worktree_path) {
        if let Err(e) = run_git(repo_path, &["worktree", "repair"]) {
            log::debug!("Repository repair reported: {e}");
        }
    }

    if !is_link_valid(worktree_path) {
        return Err(WtError::repair_incomplete(worktree_path));
    }

    log::debug!(
        "Repaired link {} <-> {}",
        repo_path.display(),
        worktree_path.display()
    );
    Ok(())
}

/// Names of metadata entries whose worktree directory no longer exists
pub fn list_prunable(repo_path: &Path) -> Result<Vec<String>> {
    let common_dir =
        repo_common_dir(repo_path).ok_or_else(|| WtError::main_repo_not_found(repo_path))?;
    let worktrees_dir = common_dir.join("worktrees");
    if !worktrees_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut prunable = Vec::new();
    for entry in fs::read_dir(&worktrees_dir)?.flatten() {
        let metadata_dir = entry.path();
        if !metadata_dir.is_dir() || metadata_dir.join("locked").exists() {
            continue;
        }

        let stale = match read_back_pointer(&metadata_dir) {
            Some(back) => !back.parent().is_some_and(Path::is_dir),
            None => true,
        };
        if stale {
            prunable.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    prunable.sort();
    Ok(prunable)
}

/// Drop stale metadata entries; real worktrees are untouched
pub fn prune(repo_path: &Path) -> Result<()> {
    run_git(repo_path, &["worktree", "prune"])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .output()
            .unwrap();
        assert!(
            status.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&status.stderr)
        );
    }

    /// scan/repo with one commit and scan/repo-feature as a linked worktree
    fn setup_repo_with_worktree() -> (TempDir, PathBuf, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let scan = temp_dir.path().canonicalize().unwrap();
        let repo = scan.join("repo");
        fs::create_dir_all(&repo).unwrap();

        git(&repo, &["init", "-b", "main"]);
        git(&repo, &["config", "user.name", "Test User"]);
        git(&repo, &["config", "user.email", "test@example.com"]);
        fs::write(repo.join("README.md"), "hello\n").unwrap();
        git(&repo, &["add", "."]);
        git(&repo, &["commit", "-m", "Initial commit"]);

        let worktree = scan.join("repo-feature");
        git(
            &repo,
            &["worktree", "add", "-b", "feature", worktree.to_str().unwrap()],
        );

        (temp_dir, scan, repo, worktree)
    }

    #[test]
    fn test_probe_healthy_worktree() {
        let (_temp_dir, _scan, repo, worktree) = setup_repo_with_worktree();

        assert!(is_worktree(&worktree));
        assert!(!is_worktree(&repo));
        assert!(is_main_repo(&repo));
        assert_eq!(get_main_repo_path(&worktree).unwrap(), repo);
        assert_eq!(get_current_branch(&worktree).unwrap(), "feature");
        assert_eq!(get_current_branch(&repo).unwrap(), "main");
        assert!(is_link_valid(&worktree));
        assert_eq!(worktree_metadata_name(&worktree).as_deref(), Some("repo-feature"));
    }

    #[test]
    fn test_list_worktrees_from_repo() {
        let (_temp_dir, _scan, repo, worktree) = setup_repo_with_worktree();

        let entries = list_worktrees_from_repo(&repo).unwrap();
        let paths: Vec<PathBuf> = entries.iter().map(|e| canonical(&e.path)).collect();
        assert!(paths.contains(&repo));
        assert!(paths.contains(&worktree));
        assert!(entries
            .iter()
            .any(|e| e.branch.as_deref() == Some("feature")));
    }

    #[test]
    fn test_parse_worktree_porcelain() {
        let raw = "worktree /src/repo\nHEAD abc\nbranch refs/heads/main\n\n\
                   worktree /src/repo-x\nHEAD def\ndetached\n\n";
        let entries = parse_worktree_porcelain(raw);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].branch.as_deref(), Some("main"));
        assert_eq!(entries[1].path, PathBuf::from("/src/repo-x"));
        assert_eq!(entries[1].branch, None);

        let bare = "worktree /src/repo.git\nbare\n\nworktree /src/repo-y\nHEAD abc\nbranch refs/heads/y\n";
        let entries = parse_worktree_porcelain(bare);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, PathBuf::from("/src/repo-y"));
        assert_eq!(entries[0].branch.as_deref(), Some("y"));
    }

    #[test]
    fn test_origin_url() {
        let (_temp_dir, _scan, repo, _worktree) = setup_repo_with_worktree();
        assert_eq!(get_origin_url(&repo).unwrap(), None);

        git(&repo, &["remote", "add", "origin", "git@example.com:team/repo.git"]);
        assert_eq!(
            get_origin_url(&repo).unwrap().as_deref(),
            Some("git@example.com:team/repo.git")
        );
    }

    #[test]
    fn test_repair_after_worktree_moved() {
        let (_temp_dir, scan, repo, worktree) = setup_repo_with_worktree();
        let moved = scan.join("moved-feature");
        fs::rename(&worktree, &moved).unwrap();

        assert!(!is_link_valid(&moved));
        assert!(can_repair(&moved, &[], Some(&scan)));
        assert_eq!(locate_main_repo(&moved, &[], Some(&scan)), Some(repo.clone()));

        repair(&repo, &moved).unwrap();
        assert!(is_link_valid(&moved));
        git(&moved, &["status"]);
    }

    #[test]
    fn test_repair_after_repo_moved() {
        let (_temp_dir, scan, repo, worktree) = setup_repo_with_worktree();
        let moved_repo = scan.join("relocated");
        fs::rename(&repo, &moved_repo).unwrap();

        assert!(!is_link_valid(&worktree));
        assert!(get_main_repo_path(&worktree).is_err());
        assert!(!can_repair(&worktree, &[], None));
        assert_eq!(
            locate_main_repo(&worktree, &[], Some(&scan)),
            Some(moved_repo.clone())
        );

        repair(&moved_repo, &worktree).unwrap();
        assert!(is_link_valid(&worktree));
        assert_eq!(get_main_repo_path(&worktree).unwrap(), moved_repo);
    }

    #[test]
    fn test_repair_after_both_moved() {
        let (_temp_dir, scan, repo, worktree) = setup_repo_with_worktree();
        let moved_repo = scan.join("relocated");
        let moved_worktree = scan.join("relocated-feature");
        fs::rename(&repo, &moved_repo).unwrap();
        fs::rename(&worktree, &moved_worktree).unwrap();

        let hint = moved_repo.as_path();
        assert!(can_repair(&moved_worktree, &[hint], None));

        repair(&moved_repo, &moved_worktree).unwrap();
        assert!(is_link_valid(&moved_worktree));
        git(&moved_worktree, &["status"]);
    }

    #[test]
    fn test_repair_is_idempotent_on_valid_link() {
        let (_temp_dir, _scan, repo, worktree) = setup_repo_with_worktree();
        repair(&repo, &worktree).unwrap();
        repair(&repo, &worktree).unwrap();
        assert!(is_link_valid(&worktree));
    }

    #[test]
    fn test_list_prunable_and_prune() {
        let (_temp_dir, _scan, repo, worktree) = setup_repo_with_worktree();
        assert!(list_prunable(&repo).unwrap().is_empty());

        fs::remove_dir_all(&worktree).unwrap();
        assert_eq!(list_prunable(&repo).unwrap(), vec!["repo-feature".to_string()]);

        prune(&repo).unwrap();
        assert!(list_prunable(&repo).unwrap().is_empty());
        assert!(repo.join("README.md").exists());
    }

    #[test]
    fn test_not_a_worktree() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!is_worktree(temp_dir.path()));
        assert!(!is_link_valid(temp_dir.path()));
        assert!(matches!(
            read_gitdir_pointer(temp_dir.path()),
            Err(WtError::NotAWorktree { .. })
        ));
    }
}

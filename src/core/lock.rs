//! Cross-process exclusive lock for the worktree cache.
//!
//! The lock is an OS advisory lock held on an open file handle, so the kernel drops it
//! when the process exits or crashes. [`CacheLock`] releases it explicitly on `Drop`.

use crate::core::error::{Result, WtError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const LOCK_RETRY_MS: u64 = 100;

/// Held for as long as the caller mutates the cache
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Block until the lock at `path` is ours or `timeout` elapses
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WtError::cache_directory_creation_failed(parent, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| WtError::lock_failed(path, e))?;

        let start = Instant::now();
        let mut waited = false;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::WouldBlock || is_contended(&err) => {
                    if start.elapsed() >= timeout {
                        return Err(WtError::lock_timeout(path, timeout.as_secs()));
                    }
                    if !waited {
                        log::info!("Waiting for another wt process to release {}", path.display());
                        waited = true;
                    }
                    std::thread::sleep(Duration::from_millis(LOCK_RETRY_MS));
                }
                Err(err) => return Err(WtError::lock_failed(path, err)),
            }
        }

        log::debug!("Acquired cache lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// fs2 reports contention as a raw OS error on some platforms
fn is_contended(err: &std::io::Error) -> bool {
    err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        log::debug!("Released cache lock {}", self.path.display());
    }
}

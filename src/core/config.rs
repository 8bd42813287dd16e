use crate::core::dirs::get_config_directory;
use crate::core::error::WtError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WtConfig {
    /// Directory scanned for worktrees when `--dir` is not given
    pub scan_dir: Option<PathBuf>,
    /// How long to wait for another wt process to release the cache lock
    pub lock_timeout_secs: u64,
}

impl Default for WtConfig {
    fn default() -> Self {
        Self {
            scan_dir: None,
            lock_timeout_secs: DEFAULT_LOCK_TIMEOUT_SECS,
        }
    }
}

impl WtConfig {
    /// Load `config.json` from the wt config directory, falling back to defaults
    pub fn load() -> Result<Self, WtError> {
        let config_file = get_config_directory()?.join("config.json");
        Self::load_from(&config_file)
    }

    pub fn load_from(config_file: &Path) -> Result<Self, WtError> {
        if !config_file.exists() {
            log::debug!("No config at {}, using defaults", config_file.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_file)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Resolve the scan directory: explicit flag, then config, then the current directory.
    ///
    /// The result is canonicalized so cache keys and hashes do not depend on how the
    /// directory was spelled on the command line.
    pub fn resolve_scan_dir(&self, explicit: Option<PathBuf>) -> Result<PathBuf, WtError> {
        let candidate = match explicit.or_else(|| self.scan_dir.clone()) {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };

        if !candidate.is_dir() {
            return Err(WtError::scan_dir_not_found(candidate));
        }

        Ok(candidate.canonicalize()?)
    }
}

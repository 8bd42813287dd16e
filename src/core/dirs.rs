use crate::core::error::WtError;
use std::path::{Path, PathBuf};

pub fn get_config_directory() -> Result<PathBuf, WtError> {
    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config"))),
        "macos" => dirs::home_dir().map(|home| home.join("Library/Application Support")),
        _ => dirs::config_dir(),
    };

    base.map(|dir| dir.join("wt"))
        .ok_or(WtError::CacheDirectoryNotFound)
}

pub fn get_cache_directory() -> Result<PathBuf, WtError> {
    // XDG_CACHE_HOME wins on every platform so tests and sandboxes can redirect it
    let base = std::env::var("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .ok()
        .or_else(dirs::cache_dir);

    base.map(|dir| dir.join("wt"))
        .ok_or(WtError::CacheDirectoryNotFound)
}

/// Per-scan-directory cache folder, keyed by an md5 of the scan directory path
pub fn get_scan_cache_directory(scan_dir: &Path) -> Result<PathBuf, WtError> {
    let scan_hash = format!("{:x}", md5::compute(scan_dir.to_string_lossy().as_bytes()));

    log::debug!("get_scan_cache_directory: scan_dir = {scan_dir:?}");
    log::debug!("get_scan_cache_directory: scan_hash = {scan_hash:?}");

    Ok(get_cache_directory()?.join(scan_hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_cache_directory_is_deterministic() {
        let a = get_scan_cache_directory(Path::new("/work/src")).unwrap();
        let b = get_scan_cache_directory(Path::new("/work/src")).unwrap();
        let c = get_scan_cache_directory(Path::new("/work/other")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.parent().unwrap().ends_with("wt"));
    }
}

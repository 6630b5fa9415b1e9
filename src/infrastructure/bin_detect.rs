//! # Binary Detection
//!
//! Locates the swarm CLI on `PATH`. Agents call `takopiswarm` when it is installed and
//! fall back to the `takopi` umbrella binary otherwise.

use std::path::{Path, PathBuf};

pub const SWARM_BINARY: &str = "takopiswarm";
pub const FALLBACK_BINARY: &str = "takopi";

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && (m.permissions().mode() & 0o111 != 0))
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file())
        .unwrap_or(false)
}

pub fn find_executable_in_dirs(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    if name.trim().is_empty() {
        return None;
    }
    dirs.iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Resolves the swarm binary within `dirs`: `takopiswarm` first, then `takopi`.
pub fn resolve_swarm_binary_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    find_executable_in_dirs(SWARM_BINARY, dirs)
        .or_else(|| find_executable_in_dirs(FALLBACK_BINARY, dirs))
}

/// Same as `resolve_swarm_binary_in`, searching the `PATH` environment variable.
pub fn resolve_swarm_binary() -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    let dirs = std::env::split_paths(&path_var).collect::<Vec<_>>();
    resolve_swarm_binary_in(&dirs)
}

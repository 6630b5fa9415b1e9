//! # Paths
//!
//! Single source of truth for where the swarm tooling keeps its files.
//! Everything lives next to the config file unless the config says otherwise.

use std::path::{Component, Path, PathBuf};

pub const CONFIG_DIR: &str = ".takopi";
pub const CONFIG_FILENAME: &str = "takopi.yaml";
pub const TOPIC_STATE_FILENAME: &str = "telegram_topics_state.json";
pub const DEFAULT_INBOX_FILENAME: &str = "telegram_swarm_inbox.jsonl";

/// Returns `~/.takopi/takopi.yaml` (or a relative fallback when no home directory exists).
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILENAME)
}

/// Topic bindings are stored beside the config file.
pub fn resolve_state_path(config_path: &Path) -> PathBuf {
    config_path.with_file_name(TOPIC_STATE_FILENAME)
}

pub fn default_inbox_path(config_path: &Path) -> PathBuf {
    config_path.with_file_name(DEFAULT_INBOX_FILENAME)
}

/// Expands a leading `~` to the home directory.
pub fn expand_user(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Expands `~` and anchors relative paths at `base_dir`.
pub fn resolve_config_relative(raw: &str, base_dir: &Path) -> PathBuf {
    let expanded = expand_user(raw);
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

/// Directory holding the config file; `.` for bare file names.
pub fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Human-friendly rendering of a config path (`~` instead of the home directory).
pub fn config_path_display(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return Path::new("~").join(rest).display().to_string();
        }
    }
    path.display().to_string()
}

/// Lexically normalises a path (drops `.` and folds `..`) without touching the file system.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

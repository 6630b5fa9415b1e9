//! # Configuration
//!
//! Manages the loading and parsing of the swarm configuration file (`takopi.yaml`).
//! Defines the structs for the chat transport, projects, plugin tables and logging,
//! and normalises project entries into a `ProjectsConfig`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::paths;

/// Configuration problems. Surfaced to the user verbatim and mapped to exit code 2.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing config file {0}.")]
    Missing(String),
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Main configuration structure.
/// Matches the layout of `~/.takopi/takopi.yaml`.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub transports: TransportsConfig,
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectEntry>,
    #[serde(default)]
    pub default_project: Option<String>,
    /// Raw plugin tables; each plugin validates its own section.
    #[serde(default)]
    pub plugins: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct TransportsConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Bot API credentials and the main chat.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub api_base: Option<String>,
}

/// A project as written in the config file.
#[derive(Debug, Deserialize, Clone)]
pub struct ProjectEntry {
    pub path: String,
    #[serde(default)]
    pub worktrees_dir: Option<String>,
    #[serde(default)]
    pub worktree_base: Option<String>,
    #[serde(default)]
    pub chat_id: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

pub const DEFAULT_WORKTREES_DIR: &str = ".worktrees";

/// A resolved project: absolute paths, alias as written.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub alias: String,
    pub path: PathBuf,
    pub worktrees_dir: PathBuf,
    pub worktree_base: Option<String>,
    pub chat_id: Option<i64>,
}

impl ProjectConfig {
    #[cfg(test)]
    pub fn new(alias: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            alias: alias.into(),
            path: path.into(),
            worktrees_dir: PathBuf::from(DEFAULT_WORKTREES_DIR),
            worktree_base: None,
            chat_id: None,
        }
    }

    /// Directory that holds one worktree per branch.
    pub fn worktrees_root(&self) -> PathBuf {
        if self.worktrees_dir.is_absolute() {
            self.worktrees_dir.clone()
        } else {
            self.path.join(&self.worktrees_dir)
        }
    }
}

/// Projects keyed by their lower-cased id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectsConfig {
    pub projects: BTreeMap<String, ProjectConfig>,
}

impl ProjectsConfig {
    /// Project key -> display alias.
    pub fn aliases(&self) -> BTreeMap<String, String> {
        self.projects
            .iter()
            .map(|(key, project)| (key.clone(), project.alias.clone()))
            .collect()
    }

    /// Looks a project up by alias or id (case-insensitive), returning `(key, alias)`.
    pub fn resolve(&self, project: &str) -> Result<(String, String), ConfigError> {
        let key = project.trim().to_lowercase();
        match self.projects.get(&key) {
            Some(cfg) => Ok((key, cfg.alias.clone())),
            None => {
                let available = if self.projects.is_empty() {
                    "none".to_string()
                } else {
                    self.projects.keys().cloned().collect::<Vec<_>>().join(", ")
                };
                Err(ConfigError::Invalid(format!(
                    "Unknown project {:?}. Available project ids: {}.",
                    project, available
                )))
            }
        }
    }
}

impl AppConfig {
    /// Parses a YAML document. An empty document yields the defaults.
    pub fn from_yaml(content: &str, config_path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: config_path.display().to_string(),
            source,
        })
    }

    pub fn bot_token(&self, config_path: &Path) -> Result<&str, ConfigError> {
        let token = self.transports.telegram.bot_token.trim();
        if token.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "Missing `transports.telegram.bot_token` in {}.",
                config_path.display()
            )));
        }
        Ok(token)
    }

    pub fn main_chat_id(&self, config_path: &Path) -> Result<i64, ConfigError> {
        self.transports.telegram.chat_id.ok_or_else(|| {
            ConfigError::Invalid(format!(
                "Missing `transports.telegram.chat_id` in {}.",
                config_path.display()
            ))
        })
    }

    /// Normalises the `projects` table.
    pub fn to_projects_config(&self, config_path: &Path) -> Result<ProjectsConfig, ConfigError> {
        let base_dir = paths::config_dir(config_path);
        let mut projects = BTreeMap::new();

        for (alias, entry) in &self.projects {
            let key = alias.trim().to_lowercase();
            if key.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Invalid project id {:?} in {}; expected a non-empty name.",
                    alias,
                    config_path.display()
                )));
            }
            if entry.path.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Invalid `projects.{}.path` in {}; expected a non-empty string.",
                    alias,
                    config_path.display()
                )));
            }
            let project = ProjectConfig {
                alias: alias.trim().to_string(),
                path: paths::resolve_config_relative(entry.path.trim(), &base_dir),
                worktrees_dir: entry
                    .worktrees_dir
                    .as_deref()
                    .map(paths::expand_user)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKTREES_DIR)),
                worktree_base: entry
                    .worktree_base
                    .as_deref()
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .map(str::to_string),
                chat_id: entry.chat_id,
            };
            if projects.insert(key.clone(), project).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "Duplicate project id {:?} in {} (project ids are case-insensitive).",
                    key,
                    config_path.display()
                )));
            }
        }

        if let Some(raw) = &self.default_project
            && !projects.contains_key(&raw.trim().to_lowercase())
        {
            return Err(ConfigError::Invalid(format!(
                "Invalid `default_project` {:?} in {}; no such project.",
                raw,
                config_path.display()
            )));
        }

        Ok(ProjectsConfig { projects })
    }
}

/// Loads the config from `path` (or the default location), returning it with the resolved path.
pub fn load_settings(path: Option<&Path>) -> Result<(AppConfig, PathBuf), ConfigError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(paths::default_config_path);
    if !config_path.exists() {
        return Err(ConfigError::Missing(paths::config_path_display(&config_path)));
    }
    let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.display().to_string(),
        source,
    })?;
    let config = AppConfig::from_yaml(&content, &config_path)?;
    tracing::debug!("Loaded config from {}", config_path.display());
    Ok((config, config_path))
}

//! # Swarm Ingress Config
//!
//! Validates the `plugins.swarm` table that enables the local trigger inbox.

use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::config::ConfigError;
use crate::domain::paths;

pub const SWARM_PLUGIN_ID: &str = "swarm";
pub const DEFAULT_POLL_INTERVAL_S: f64 = 0.35;
pub const MAX_POLL_INTERVAL_S: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SwarmIngressConfig {
    pub inbox_path: PathBuf,
    pub poll_interval_s: f64,
}

impl SwarmIngressConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_s)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_S))
    }
}

fn invalid(key: &str, config_path: &Path, expected: &str) -> ConfigError {
    ConfigError::Invalid(format!(
        "Invalid `plugins.{}.{}` in {}; {}",
        SWARM_PLUGIN_ID,
        key,
        config_path.display(),
        expected
    ))
}

fn resolve_inbox_path(value: Option<&Value>, config_path: &Path) -> Result<PathBuf, ConfigError> {
    match value {
        None | Some(Value::Null) => Ok(paths::default_inbox_path(config_path)),
        Some(Value::String(raw)) if !raw.trim().is_empty() => Ok(paths::resolve_config_relative(
            raw,
            &paths::config_dir(config_path),
        )),
        Some(_) => Err(invalid(
            "inbox_path",
            config_path,
            "expected a non-empty string.",
        )),
    }
}

fn resolve_poll_interval(value: Option<&Value>, config_path: &Path) -> Result<f64, ConfigError> {
    let interval = match value {
        None | Some(Value::Null) => return Ok(DEFAULT_POLL_INTERVAL_S),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| invalid("poll_interval_s", config_path, "expected a number."))?,
        Some(_) => {
            return Err(invalid(
                "poll_interval_s",
                config_path,
                "expected a number.",
            ));
        }
    };
    if !interval.is_finite() || interval <= 0.0 {
        return Err(invalid(
            "poll_interval_s",
            config_path,
            "expected a value > 0.",
        ));
    }
    if interval > MAX_POLL_INTERVAL_S {
        return Err(invalid(
            "poll_interval_s",
            config_path,
            &format!("expected at most {} seconds.", MAX_POLL_INTERVAL_S),
        ));
    }
    Ok(interval)
}

/// Parses one `plugins.swarm` table. `None` means ingress is disabled.
pub fn parse_swarm_ingress_config(
    raw: Option<&Value>,
    config_path: &Path,
) -> Result<Option<SwarmIngressConfig>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let Value::Mapping(table) = raw else {
        return Err(ConfigError::Invalid(format!(
            "Invalid `plugins.{}` in {}; expected a table.",
            SWARM_PLUGIN_ID,
            config_path.display()
        )));
    };

    let enabled = match table.get("enabled") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(invalid("enabled", config_path, "expected true/false.")),
    };
    if !enabled {
        return Ok(None);
    }

    let inbox_path = resolve_inbox_path(table.get("inbox_path"), config_path)?;
    let poll_interval_s = resolve_poll_interval(table.get("poll_interval_s"), config_path)?;
    Ok(Some(SwarmIngressConfig {
        inbox_path,
        poll_interval_s,
    }))
}

/// Picks the swarm table out of the plugin configs.
pub fn resolve_swarm_ingress_config_from_plugins(
    plugins: &BTreeMap<String, Value>,
    config_path: &Path,
) -> Result<Option<SwarmIngressConfig>, ConfigError> {
    match plugins.get(SWARM_PLUGIN_ID) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => parse_swarm_ingress_config(Some(raw), config_path),
    }
}

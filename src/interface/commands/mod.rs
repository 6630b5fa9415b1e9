//! # Command Handlers
//!
//! One handler per `swarm` subcommand. Handlers write their output to the given writer
//! (stdout in production) and report failures through `anyhow`; `ExitError` carries an
//! explicit exit code and message for the cases that are not plain errors.

pub mod control;
pub mod inbox;
pub mod topics;
pub mod trigger;
pub mod which;
pub mod worktree;

use anyhow::{Result, anyhow};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

use crate::application::state::TopicStateStore;
use crate::domain::config::{AppConfig, ConfigError, ProjectsConfig};
use crate::domain::ingress::{SwarmIngressConfig, resolve_swarm_ingress_config_from_plugins};
use crate::domain::paths;
use crate::infrastructure::git::SystemGit;
use crate::infrastructure::telegram::TelegramClient;
use crate::interface::cli::{
    ControlCommand, InboxCommand, SwarmCommand, TopicsCommand, TriggerCommand, WorktreeCommand,
};

/// Ends the process with `code` after printing `message` to stderr as-is.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExitError {
    pub code: u8,
    pub message: String,
}

impl ExitError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Loaded settings shared by every handler.
pub struct SwarmContext {
    pub config: AppConfig,
    pub config_path: PathBuf,
}

impl SwarmContext {
    pub fn new(config: AppConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn projects(&self) -> Result<ProjectsConfig, ConfigError> {
        self.config.to_projects_config(&self.config_path)
    }

    pub fn state_store(&self) -> TopicStateStore {
        TopicStateStore::new(paths::resolve_state_path(&self.config_path))
    }

    pub fn ingress(&self) -> Result<Option<SwarmIngressConfig>, ConfigError> {
        resolve_swarm_ingress_config_from_plugins(&self.config.plugins, &self.config_path)
    }

    pub fn transport(&self) -> Result<TelegramClient> {
        let token = self.config.bot_token(&self.config_path)?;
        TelegramClient::new(token, self.config.transports.telegram.api_base.as_deref())
            .map_err(|e| anyhow!(e))
    }

    /// Explicit chat id, else the project's chat, else the main chat.
    pub fn target_chat_id(
        &self,
        explicit: Option<i64>,
        project_chat_id: Option<i64>,
    ) -> Result<i64, ConfigError> {
        match explicit.or(project_chat_id) {
            Some(chat_id) => Ok(chat_id),
            None => self.config.main_chat_id(&self.config_path),
        }
    }
}

pub async fn dispatch(ctx: &SwarmContext, command: SwarmCommand, out: &mut dyn Write) -> Result<()> {
    match command {
        SwarmCommand::Topics(TopicsCommand::List(args)) => topics::handle_list(ctx, &args, out).await,
        SwarmCommand::Topics(TopicsCommand::Status(args)) => {
            topics::handle_status(ctx, &args, out).await
        }
        SwarmCommand::Topics(TopicsCommand::Ensure(args)) => {
            let transport = ctx.transport()?;
            topics::handle_ensure(ctx, &transport, &args, out).await
        }
        SwarmCommand::Control(ControlCommand::Send(args)) => {
            let transport = ctx.transport()?;
            control::handle_send(ctx, &transport, &args, out).await
        }
        SwarmCommand::Trigger(TriggerCommand::Send(args)) => {
            trigger::handle_send(ctx, &args, out).await
        }
        SwarmCommand::Inbox(InboxCommand::Watch(args)) => inbox::handle_watch(ctx, &args, out).await,
        SwarmCommand::Worktree(WorktreeCommand::Resolve(args)) => {
            worktree::handle_resolve(ctx, &SystemGit, &args, out).await
        }
        SwarmCommand::Which(args) => which::handle_which(&args, out),
    }
}

#[cfg(test)]
pub mod testing {
    //! Context fixtures for handler tests.

    use super::*;
    use crate::domain::config::load_settings;
    use std::path::Path;

    pub const BASE_YAML: &str = r#"
transports:
  telegram:
    bot_token: "123:abc"
    chat_id: -1001
projects:
  Z80:
    path: /srv/z80
    chat_id: -2002
  web:
    path: /srv/web
"#;

    /// Writes `yaml` as `takopi.yaml` in `dir` and loads it.
    pub fn context_with(dir: &Path, yaml: &str) -> SwarmContext {
        let config_path = dir.join("takopi.yaml");
        std::fs::write(&config_path, yaml).unwrap();
        let (config, config_path) = load_settings(Some(&config_path)).unwrap();
        SwarmContext::new(config, config_path)
    }

    pub fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }
}

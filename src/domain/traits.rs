//! # Domain Traits
//!
//! Abstract interfaces for the outside systems the swarm commands talk to (chat API, git).
//! Allows for pluggable implementations in the Infrastructure layer and fakes in tests.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::types::ForumTopic;

/// The subset of a forum-capable chat API the swarm needs.
#[async_trait]
pub trait ForumTransport: Send + Sync {
    /// Create a forum topic in the chat
    async fn create_forum_topic(&self, chat_id: i64, name: &str) -> Result<ForumTopic, String>;

    /// Rename an existing topic. Fails when the topic no longer exists.
    async fn edit_forum_topic(&self, chat_id: i64, thread_id: i64, name: &str)
    -> Result<(), String>;

    /// Post a message as the bot, returning its message id
    async fn send_message(
        &self,
        chat_id: i64,
        thread_id: Option<i64>,
        text: &str,
        disable_notification: bool,
    ) -> Result<i64, String>;
}

/// Captured result of one git invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs git subcommands. `None` means git itself could not be started.
#[async_trait]
pub trait GitRunner: Send + Sync {
    async fn run(&self, args: &[String], cwd: &Path) -> Option<GitOutput>;
}

//! # Domain Types
//!
//! Common data structures shared by the topic registry, the trigger inbox and the CLI.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The project/branch a topic is bound to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunContext {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

impl RunContext {
    pub fn new(project: impl Into<String>, branch: Option<String>) -> Self {
        Self {
            project: Some(project.into()),
            branch,
        }
    }
}

/// One tracked forum thread as persisted in the topic state file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicThreadSnapshot {
    pub chat_id: i64,
    pub thread_id: i64,
    #[serde(default)]
    pub context: Option<RunContext>,
    /// Engine id -> resume token. Written by the bot, opaque here.
    #[serde(default)]
    pub sessions: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub topic_title: Option<String>,
    #[serde(default)]
    pub default_engine: Option<String>,
}

impl TopicThreadSnapshot {
    pub fn new(chat_id: i64, thread_id: i64) -> Self {
        Self {
            chat_id,
            thread_id,
            context: None,
            sessions: BTreeMap::new(),
            topic_title: None,
            default_engine: None,
        }
    }
}

/// User-facing view of a topic.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopicStatus {
    pub chat_id: i64,
    pub thread_id: i64,
    pub project: Option<String>,
    pub branch: Option<String>,
    pub topic_title: Option<String>,
    pub default_engine: Option<String>,
    pub sessions: Vec<String>,
}

/// Control notes are for humans; triggers start agent runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SwarmIntent {
    Control,
    Trigger,
}

impl SwarmIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwarmIntent::Control => "control",
            SwarmIntent::Trigger => "trigger",
        }
    }
}

fn default_envelope_version() -> u32 {
    1
}

/// One line of the swarm inbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SwarmEnvelope {
    #[serde(default = "default_envelope_version")]
    pub version: u32,
    pub event_id: String,
    pub intent: SwarmIntent,
    pub chat_id: i64,
    #[serde(default)]
    pub thread_id: Option<i64>,
    pub text: String,
    #[serde(default)]
    pub origin_agent: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A message synthesised from the inbox, shaped like one received from the chat.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IncomingMessage {
    pub transport: String,
    pub chat_id: i64,
    pub message_id: i64,
    pub text: String,
    pub reply_to_message_id: Option<i64>,
    pub reply_to_text: Option<String>,
    pub sender_id: Option<i64>,
    pub thread_id: Option<i64>,
    pub raw: serde_json::Value,
    pub ingress_source: String,
    pub ingress_intent: SwarmIntent,
    pub origin_agent: Option<String>,
}

/// A created forum topic as reported by the chat API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForumTopic {
    pub message_thread_id: i64,
    pub name: String,
}

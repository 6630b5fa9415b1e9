//! # Messages
//!
//! Constant strings and format functions for the human-readable command output.
//! JSON output is built from the domain types directly and never goes through here.

use std::path::Path;

use crate::domain::types::{IncomingMessage, TopicStatus};

pub const NO_TRACKED_TOPICS: &str = "no tracked topics";
pub const TOPIC_NOT_FOUND: &str = "topic not found";
pub const CONTROL_MESSAGE_FAILED: &str = "control message failed";
pub const NO_SWARM_BINARY: &str = "no takopiswarm or takopi binary found on PATH";

/// Quoted title, escaped so it always stays on one line. Single quotes unless the text
/// itself contains one and no double quote.
pub fn quoted(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() && (c as u32) < 0x100 => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn thread_suffix(thread_id: Option<i64>) -> String {
    thread_id
        .map(|t| format!(" thread {t}"))
        .unwrap_or_default()
}

/// One line per topic: `chat:thread  ctx=...  title=...  default_engine=...  sessions=...`.
pub fn topic_status_line(status: &TopicStatus) -> String {
    let ctx = match (&status.project, &status.branch) {
        (Some(project), Some(branch)) if !branch.is_empty() => format!("{project}@{branch}"),
        (Some(project), _) => project.clone(),
        (None, _) => "-".to_string(),
    };
    let sessions = if status.sessions.is_empty() {
        "none".to_string()
    } else {
        status.sessions.join(", ")
    };
    let title = quoted(status.topic_title.as_deref().unwrap_or("-"));
    let default_engine = status.default_engine.as_deref().unwrap_or("-");
    format!(
        "{}:{}  ctx={ctx}  title={title}  default_engine={default_engine}  sessions={sessions}",
        status.chat_id, status.thread_id
    )
}

pub fn topic_ensured(created: bool, status: &TopicStatus, fallback_project: &str) -> String {
    let action = if created { "created" } else { "reused" };
    let project = status.project.as_deref().unwrap_or(fallback_project);
    let branch = status
        .branch
        .as_deref()
        .filter(|b| !b.is_empty())
        .map(|b| format!(" @{b}"))
        .unwrap_or_default();
    format!(
        "{action} topic {}:{} for {project}{branch}",
        status.chat_id, status.thread_id
    )
}

pub fn control_sent(chat_id: i64, thread_id: Option<i64>, message_id: i64) -> String {
    format!(
        "sent control message to chat {chat_id}{} (message_id={message_id})",
        thread_suffix(thread_id)
    )
}

pub fn trigger_queued(event_id: &str, chat_id: i64, thread_id: Option<i64>, inbox: &Path) -> String {
    format!(
        "queued trigger {event_id} for chat {chat_id}{} via {}",
        thread_suffix(thread_id),
        inbox.display()
    )
}

pub fn ingress_disabled(config_display: &str) -> String {
    format!(
        "error: swarm trigger ingress is disabled; set `plugins: {{swarm: {{enabled: true}}}}` in {config_display}"
    )
}

pub fn inbox_message_line(message: &IncomingMessage) -> String {
    let thread = message
        .thread_id
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".to_string());
    let origin = message.origin_agent.as_deref().unwrap_or("-");
    format!(
        "{}:{thread} #{} from {origin}: {}",
        message.chat_id, message.message_id, message.text
    )
}

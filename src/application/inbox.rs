//! # Swarm Inbox
//!
//! The trigger plane. `trigger send` appends JSON envelopes to an append-only inbox file;
//! the bot tails that file and turns trigger envelopes into synthetic incoming messages.

use bytes::BytesMut;
use chrono::{SecondsFormat, Utc};
use futures::Stream;
use std::io::{ErrorKind, SeekFrom};
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::domain::ingress::SwarmIngressConfig;
use crate::domain::types::{IncomingMessage, SwarmEnvelope, SwarmIntent};

pub const INGRESS_SOURCE: &str = "swarm";

/// Builds a fresh envelope with a random event id and a UTC timestamp.
pub fn new_swarm_envelope(
    intent: SwarmIntent,
    chat_id: i64,
    thread_id: Option<i64>,
    text: &str,
    origin_agent: Option<&str>,
) -> SwarmEnvelope {
    SwarmEnvelope {
        version: 1,
        event_id: uuid::Uuid::new_v4().simple().to_string(),
        intent,
        chat_id,
        thread_id,
        text: text.to_string(),
        origin_agent: origin_agent.map(str::to_string),
        created_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false)),
    }
}

/// Appends one envelope as a single JSON line, creating the inbox (and its directory) if needed.
pub async fn append_swarm_envelope(path: &Path, envelope: &SwarmEnvelope) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }
    let mut line = serde_json::to_vec(envelope)
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
    line.push(b'\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&line).await?;
    file.flush().await?;
    tracing::debug!(
        "Queued {} envelope {} in {}",
        envelope.intent.as_str(),
        envelope.event_id,
        path.display()
    );
    Ok(())
}

/// Only non-blank triggers become messages; control envelopes never start work.
pub fn to_synthetic_message(envelope: &SwarmEnvelope, message_id: i64) -> Option<IncomingMessage> {
    if envelope.intent != SwarmIntent::Trigger {
        return None;
    }
    if envelope.text.trim().is_empty() {
        tracing::debug!(
            "Skipping swarm envelope {} (empty text) for {}:{:?}",
            envelope.event_id,
            envelope.chat_id,
            envelope.thread_id
        );
        return None;
    }
    Some(IncomingMessage {
        transport: "telegram".to_string(),
        chat_id: envelope.chat_id,
        message_id,
        text: envelope.text.clone(),
        reply_to_message_id: None,
        reply_to_text: None,
        sender_id: None,
        thread_id: envelope.thread_id,
        raw: serde_json::json!({ "swarm": envelope }),
        ingress_source: INGRESS_SOURCE.to_string(),
        ingress_intent: envelope.intent,
        origin_agent: envelope.origin_agent.clone(),
    })
}

/// Reads everything after `offset`. If the file shrank below `offset` it was truncated or
/// replaced, and reading restarts at 0 (reported by the returned flag).
async fn read_chunk(path: &Path, offset: u64) -> std::io::Result<(Vec<u8>, u64, bool)> {
    let mut file = File::open(path).await?;
    let size = file.metadata().await?.len();
    let (start, rewound) = if size < offset {
        (0, true)
    } else {
        (offset, false)
    };
    file.seek(SeekFrom::Start(start)).await?;
    let mut chunk = Vec::new();
    file.read_to_end(&mut chunk).await?;
    let next = start + chunk.len() as u64;
    Ok((chunk, next, rewound))
}

fn decode_line(line: &[u8], path: &Path) -> Option<SwarmEnvelope> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_slice::<SwarmEnvelope>(trimmed) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            tracing::warn!("Failed to decode swarm envelope in {}: {}", path.display(), e);
            None
        }
    }
}

/// Tails the inbox forever, yielding a synthetic message per trigger envelope.
///
/// Message ids are negative (-1, -2, ...) so they never collide with real chat messages.
/// A partial trailing line is held back until its newline arrives.
pub fn poll_swarm_inbox(cfg: SwarmIngressConfig) -> impl Stream<Item = IncomingMessage> {
    async_stream::stream! {
        let interval = cfg.poll_interval();
        let mut offset: u64 = 0;
        let mut remainder = BytesMut::new();
        let mut next_message_id: i64 = -1;

        loop {
            match read_chunk(&cfg.inbox_path, offset).await {
                Ok((chunk, next_offset, rewound)) => {
                    if rewound {
                        tracing::info!("Swarm inbox {} was truncated; rereading", cfg.inbox_path.display());
                        remainder.clear();
                    }
                    offset = next_offset;
                    remainder.extend_from_slice(&chunk);
                    while let Some(pos) = remainder.iter().position(|b| *b == b'\n') {
                        let line = remainder.split_to(pos + 1);
                        let Some(envelope) = decode_line(&line[..pos], &cfg.inbox_path) else {
                            continue;
                        };
                        if let Some(message) = to_synthetic_message(&envelope, next_message_id) {
                            next_message_id -= 1;
                            yield message;
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    offset = 0;
                    remainder.clear();
                }
                Err(e) => {
                    tracing::warn!("Failed to read swarm inbox {}: {}", cfg.inbox_path.display(), e);
                }
            }
            tokio::time::sleep(interval).await;
        }
    }
}

//! # Trigger Commands
//!
//! Handles `swarm trigger send`: queues a prompt in the local inbox, where the bot's
//! ingress poller picks it up and runs it like a user message.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

use crate::application::inbox::{append_swarm_envelope, new_swarm_envelope};
use crate::domain::paths;
use crate::domain::types::SwarmIntent;
use crate::interface::cli::TriggerSendArgs;
use crate::interface::commands::{ExitError, SwarmContext};
use crate::interface::output::{write_json, write_line};
use crate::strings::messages;

#[derive(Debug, Serialize)]
struct TriggerOutput {
    event_id: String,
    chat_id: i64,
    thread_id: Option<i64>,
    inbox_path: String,
}

pub async fn handle_send(
    ctx: &SwarmContext,
    args: &TriggerSendArgs,
    out: &mut dyn Write,
) -> Result<()> {
    // A broken projects table fails here, as every other command does.
    ctx.projects()?;
    let Some(ingress) = ctx.ingress()? else {
        return Err(ExitError::new(
            2,
            messages::ingress_disabled(&paths::config_path_display(&ctx.config_path)),
        )
        .into());
    };

    let chat_id = ctx.target_chat_id(args.chat_id, None)?;
    let envelope = new_swarm_envelope(
        SwarmIntent::Trigger,
        chat_id,
        args.thread_id,
        &args.text,
        args.origin_agent.as_deref(),
    );
    append_swarm_envelope(&ingress.inbox_path, &envelope)
        .await
        .with_context(|| format!("failed to write {}", ingress.inbox_path.display()))?;

    if args.json {
        return write_json(
            out,
            &TriggerOutput {
                event_id: envelope.event_id,
                chat_id,
                thread_id: args.thread_id,
                inbox_path: ingress.inbox_path.display().to_string(),
            },
        );
    }
    write_line(
        out,
        &messages::trigger_queued(&envelope.event_id, chat_id, args.thread_id, &ingress.inbox_path),
    )
}

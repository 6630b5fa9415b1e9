//! # Control Commands
//!
//! Handles `swarm control send`: the bot posts a visible note into a chat or topic.
//! Control messages are coordination only and never reach the trigger inbox.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use crate::application::service::send_control_message;
use crate::domain::traits::ForumTransport;
use crate::interface::cli::ControlSendArgs;
use crate::interface::commands::{ExitError, SwarmContext};
use crate::interface::output::{write_json, write_line};
use crate::strings::messages;

#[derive(Debug, Serialize)]
struct ControlOutput {
    chat_id: i64,
    thread_id: Option<i64>,
    message_id: Option<i64>,
}

pub async fn handle_send(
    ctx: &SwarmContext,
    transport: &dyn ForumTransport,
    args: &ControlSendArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let chat_id = ctx.target_chat_id(args.chat_id, None)?;
    let message_id =
        send_control_message(transport, chat_id, args.thread_id, &args.text, args.notify()).await;

    // JSON callers get the payload either way and inspect `message_id`.
    if args.json {
        return write_json(
            out,
            &ControlOutput {
                chat_id,
                thread_id: args.thread_id,
                message_id,
            },
        );
    }
    match message_id {
        Some(message_id) => write_line(
            out,
            &messages::control_sent(chat_id, args.thread_id, message_id),
        ),
        None => Err(ExitError::new(1, messages::CONTROL_MESSAGE_FAILED).into()),
    }
}

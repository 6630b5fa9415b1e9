//! # Inbox Commands
//!
//! Handles `swarm inbox watch`: tails the trigger inbox the way the bot's ingress does and
//! prints each synthetic message it would dispatch.

use anyhow::Result;
use futures::StreamExt;
use std::io::Write;

use crate::application::inbox::poll_swarm_inbox;
use crate::domain::paths;
use crate::interface::cli::InboxWatchArgs;
use crate::interface::commands::{ExitError, SwarmContext};
use crate::interface::output::{write_json, write_line};
use crate::strings::messages;

pub async fn handle_watch(
    ctx: &SwarmContext,
    args: &InboxWatchArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let Some(ingress) = ctx.ingress()? else {
        return Err(ExitError::new(
            2,
            messages::ingress_disabled(&paths::config_path_display(&ctx.config_path)),
        )
        .into());
    };
    tracing::info!(
        "Watching swarm inbox {} every {}s",
        ingress.inbox_path.display(),
        ingress.poll_interval_s
    );

    let mut stream = Box::pin(poll_swarm_inbox(ingress));
    let mut seen = 0usize;
    while args.limit.is_none_or(|limit| seen < limit) {
        let Some(message) = stream.next().await else {
            break;
        };
        if args.json {
            write_json(out, &message)?;
        } else {
            write_line(out, &messages::inbox_message_line(&message))?;
        }
        out.flush()?;
        seen += 1;
    }
    Ok(())
}

//! # Command Line
//!
//! Argument definitions for `takopiswarm`. Everything lives under `swarm` so the same
//! argument vector works when the commands are invoked through `takopi`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "takopiswarm",
    version,
    about = "Multi-agent orchestration over Telegram forum topics"
)]
pub struct Cli {
    /// Path to takopi.yaml (defaults to ~/.takopi/takopi.yaml).
    #[arg(long, env = "TAKOPI_CONFIG", global = true, value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Swarm helpers for topic orchestration and agent triggers.
    #[command(subcommand)]
    Swarm(SwarmCommand),
}

#[derive(Debug, Subcommand)]
pub enum SwarmCommand {
    /// Inspect and manage topic bindings.
    #[command(subcommand)]
    Topics(TopicsCommand),
    /// Send bot-plane control messages to Telegram.
    #[command(subcommand)]
    Control(ControlCommand),
    /// Send trigger-plane synthetic prompts to Takopi.
    #[command(subcommand)]
    Trigger(TriggerCommand),
    /// Read the local trigger inbox.
    #[command(subcommand)]
    Inbox(InboxCommand),
    /// Resolve the directory a project/branch runs in.
    #[command(subcommand)]
    Worktree(WorktreeCommand),
    /// Print the swarm binary found on PATH.
    Which(WhichArgs),
}

#[derive(Debug, Subcommand)]
pub enum TopicsCommand {
    /// List tracked topics from topic state.
    List(TopicsListArgs),
    /// Show a single topic thread status.
    Status(TopicsStatusArgs),
    /// Ensure a project/branch topic exists in Telegram.
    Ensure(TopicsEnsureArgs),
}

#[derive(Debug, Subcommand)]
pub enum ControlCommand {
    /// Send a control-plane Telegram message as the bot.
    Send(ControlSendArgs),
}

#[derive(Debug, Subcommand)]
pub enum TriggerCommand {
    /// Queue a synthetic trigger message for the local swarm ingress.
    Send(TriggerSendArgs),
}

#[derive(Debug, Subcommand)]
pub enum InboxCommand {
    /// Tail the inbox and print the trigger messages it yields.
    Watch(InboxWatchArgs),
}

#[derive(Debug, Subcommand)]
pub enum WorktreeCommand {
    /// Resolve (creating when needed) the run directory for a project/branch.
    Resolve(WorktreeResolveArgs),
}

#[derive(Debug, Args)]
pub struct TopicsListArgs {
    /// Filter tracked topics by chat id.
    #[arg(long, allow_negative_numbers = true)]
    pub chat_id: Option<i64>,
    /// Output JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TopicsStatusArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub chat_id: i64,
    #[arg(long)]
    pub thread_id: i64,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TopicsEnsureArgs {
    /// Project alias or id.
    #[arg(long)]
    pub project: String,
    /// Optional branch name for the topic binding.
    #[arg(long)]
    pub branch: Option<String>,
    /// Target chat id (defaults to the project chat_id or the main chat).
    #[arg(long, allow_negative_numbers = true)]
    pub chat_id: Option<i64>,
    /// Persist the topic -> context binding (default).
    #[arg(long, overrides_with = "no_bind_state")]
    pub bind_state: bool,
    /// Create or reuse the topic without recording the binding.
    #[arg(long, overrides_with = "bind_state")]
    pub no_bind_state: bool,
    #[arg(long)]
    pub json: bool,
}

impl TopicsEnsureArgs {
    pub fn bind_state(&self) -> bool {
        !self.no_bind_state
    }
}

#[derive(Debug, Args)]
pub struct ControlSendArgs {
    /// Message text.
    pub text: String,
    /// Target chat id (defaults to the main chat).
    #[arg(long, allow_negative_numbers = true)]
    pub chat_id: Option<i64>,
    /// Target thread id in forum chats.
    #[arg(long)]
    pub thread_id: Option<i64>,
    /// Send with notification (default).
    #[arg(long, overrides_with = "silent")]
    pub notify: bool,
    /// Send without notification.
    #[arg(long, overrides_with = "notify")]
    pub silent: bool,
    #[arg(long)]
    pub json: bool,
}

impl ControlSendArgs {
    pub fn notify(&self) -> bool {
        !self.silent
    }
}

#[derive(Debug, Args)]
pub struct TriggerSendArgs {
    /// Prompt text injected into the agent loop.
    pub text: String,
    /// Target chat id (defaults to the main chat).
    #[arg(long, allow_negative_numbers = true)]
    pub chat_id: Option<i64>,
    /// Target thread id in forum chats.
    #[arg(long)]
    pub thread_id: Option<i64>,
    /// Optional source label written into ingress metadata.
    #[arg(long)]
    pub origin_agent: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct InboxWatchArgs {
    /// Stop after this many messages.
    #[arg(long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct WorktreeResolveArgs {
    /// Project alias or id.
    #[arg(long)]
    pub project: String,
    /// Branch to run on; omitted means the project root.
    #[arg(long)]
    pub branch: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct WhichArgs {
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("takopiswarm").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_topics_list_with_negative_chat_id() {
        let cli = parse(&["swarm", "topics", "list", "--chat-id", "-1001234", "--json"]);
        match cli.command {
            Command::Swarm(SwarmCommand::Topics(TopicsCommand::List(args))) => {
                assert_eq!(args.chat_id, Some(-1001234));
                assert!(args.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_options_after_subcommand() {
        let cli = parse(&["swarm", "which", "--config-path", "/tmp/t.yaml", "-v"]);
        assert_eq!(cli.config_path, Some(PathBuf::from("/tmp/t.yaml")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_ensure_flags() {
        let cli = parse(&[
            "swarm",
            "topics",
            "ensure",
            "--project",
            "z80",
            "--branch",
            "feat/x",
            "--no-bind-state",
        ]);
        match cli.command {
            Command::Swarm(SwarmCommand::Topics(TopicsCommand::Ensure(args))) => {
                assert_eq!(args.project, "z80");
                assert_eq!(args.branch.as_deref(), Some("feat/x"));
                assert!(!args.bind_state());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_control_silent_and_notify() {
        let cli = parse(&["swarm", "control", "send", "hello", "--silent"]);
        match cli.command {
            Command::Swarm(SwarmCommand::Control(ControlCommand::Send(args))) => {
                assert_eq!(args.text, "hello");
                assert!(!args.notify());
            }
            other => panic!("unexpected command: {:?}", other),
        }
        let cli = parse(&["swarm", "control", "send", "hello", "--silent", "--notify"]);
        match cli.command {
            Command::Swarm(SwarmCommand::Control(ControlCommand::Send(args))) => {
                assert!(args.notify());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_status_requires_thread_id() {
        let result = Cli::try_parse_from([
            "takopiswarm",
            "swarm",
            "topics",
            "status",
            "--chat-id",
            "1",
        ]);
        assert!(result.is_err());
    }
}

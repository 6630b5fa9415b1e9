//! # Main Entry Point
//!
//! `takopiswarm` lets agents coordinate through Telegram forum topics:
//! - Domain: Configuration, Paths and Types
//! - Infrastructure: Telegram Bot API, Git, Binary Detection
//! - Application: Topic State, Topic Service, Inbox, Worktrees, Logging
//! - Interface: CLI and Command Handlers
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use clap::Parser;
use std::io::Write;
use std::process::ExitCode;

use crate::application::logging::init_logging;
use crate::domain::config::{ConfigError, load_settings};
use crate::interface::cli::{Cli, Command, SwarmCommand};
use crate::interface::commands::{self, ExitError, SwarmContext};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let Command::Swarm(command) = cli.command;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    // 1. `which` needs no configuration
    if let SwarmCommand::Which(args) = &command {
        let _guard = init_logging(None, None, cli.verbose);
        return exit_with(commands::which::handle_which(args, &mut out));
    }

    // 2. Load Configuration
    let (config, config_path) = match load_settings(cli.config_path.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            let _guard = init_logging(None, None, cli.verbose);
            return exit_with(Err(e.into()));
        }
    };

    // 3. Logging Setup (guard flushes the file sink on exit)
    let _guard = init_logging(Some(&config.logging), Some(&config_path), cli.verbose);
    tracing::debug!("Using config {}", config_path.display());

    // 4. Run
    let ctx = SwarmContext::new(config, config_path);
    let result = commands::dispatch(&ctx, command, &mut out).await;
    let _ = out.flush();
    exit_with(result)
}

/// Prints the failure to stderr and picks the exit code.
fn exit_with(result: anyhow::Result<()>) -> ExitCode {
    let Err(err) = result else {
        return ExitCode::SUCCESS;
    };
    if let Some(exit) = err.downcast_ref::<ExitError>() {
        eprintln!("{}", exit.message);
        return ExitCode::from(exit.code);
    }
    if let Some(config_err) = err.downcast_ref::<ConfigError>() {
        eprintln!("error: {}", config_err);
        return ExitCode::from(2);
    }
    tracing::debug!("Command failed: {:?}", err);
    eprintln!("error: {:#}", err);
    ExitCode::FAILURE
}

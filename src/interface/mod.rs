//! # Interface Layer
//!
//! Command-line definitions, the per-command handlers and the stdout helpers they share.

pub mod cli;
pub mod commands;
pub mod output;

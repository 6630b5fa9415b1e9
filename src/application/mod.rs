//! # Application Layer
//!
//! Contains the swarm logic: the topic registry, topic orchestration, the trigger inbox,
//! worktree resolution and logging setup.

pub mod inbox;
pub mod logging;
pub mod service;
pub mod state;
pub mod worktrees;

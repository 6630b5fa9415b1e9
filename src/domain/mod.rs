//! # Domain Layer
//!
//! Core definitions, types, and traits that define the swarm domain.
//! Independent of the chat API and git, serving as the contract for other layers.

pub mod config;
pub mod ingress;
pub mod paths;
pub mod traits;
pub mod types;

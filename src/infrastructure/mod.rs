//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (ForumTransport, GitRunner).

pub mod bin_detect;
pub mod git;
pub mod telegram;

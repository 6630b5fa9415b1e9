//! # Strings Module
//!
//! Centralizes user-facing output strings.
//! Ensures the human-readable lines stay consistent across commands.

pub mod messages;

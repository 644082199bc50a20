//! Shared domain types for Halibot.
//!
//! This crate contains the core domain types used across the Halibot runtime:
//! messages, permission grants, agent/runtime configuration, and their
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod message;
pub mod permission;

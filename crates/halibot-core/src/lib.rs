//! Message routing and access control for Halibot.
//!
//! This crate defines the actor model (agents and modules), the name registry,
//! the mailbox-based dispatcher, and the permission engine. Persistence of
//! permission grants goes through the `PermissionStore` port; the JSON file
//! adapter lives in `halibot-infra`.

pub mod actor;
pub mod auth;
pub mod dispatch;
pub mod registry;
pub mod runtime;

pub use actor::{Actor, ActorKind, ActorRef, Agent, Module, Router};
pub use auth::{PermissionEngine, PermissionGate};
pub use dispatch::Dispatcher;
pub use registry::Registry;
pub use runtime::Halibot;

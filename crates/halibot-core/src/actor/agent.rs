//! Agents: actors that originate messages and forward them over their links.

use std::sync::RwLock;

use halibot_types::config::AgentConfig;
use halibot_types::message::Message;
use tracing::debug;

use super::{Actor, ActorRef};
use crate::dispatch::Dispatcher;

/// Outbound side of an agent.
///
/// Holds the agent's link configuration and a handle to the runtime's
/// dispatcher. `connect` mutates the links in place; every later `dispatch`
/// sees the change.
pub struct Router {
    config: RwLock<AgentConfig>,
    dispatcher: Dispatcher,
}

impl Router {
    pub fn new(dispatcher: Dispatcher, config: AgentConfig) -> Self {
        Self {
            config: RwLock::new(config),
            dispatcher,
        }
    }

    /// Snapshot of the current link configuration.
    pub fn config(&self) -> AgentConfig {
        self.config.read().expect("router config lock poisoned").clone()
    }

    /// Append `name` to the default outbound bucket.
    pub fn connect(&self, name: impl Into<String>) {
        let name = name.into();
        debug!(recipient = %name, "connecting agent link");
        self.config
            .write()
            .expect("router config lock poisoned")
            .out
            .default
            .push(name);
    }

    /// Recipient names `dispatch` would deliver to right now.
    pub fn links(&self) -> Vec<String> {
        self.config
            .read()
            .expect("router config lock poisoned")
            .recipients()
    }

    /// Send `msg` over the configured links.
    pub fn send(&self, msg: Message) -> usize {
        self.dispatch(msg)
    }

    /// Send `msg` to the named recipients. Returns the number of deliveries queued.
    pub fn send_to<S: AsRef<str>>(&self, msg: Message, names: &[S]) -> usize {
        self.dispatcher.send_to(msg, names)
    }

    /// Resolve the default and self-named link buckets and send to both.
    pub fn dispatch(&self, msg: Message) -> usize {
        let names = self.links();
        self.send_to(msg, &names)
    }
}

/// An actor that can originate messages.
///
/// Implementors only provide `router()`; linking and sending are delegated to it.
pub trait Agent: Actor {
    fn router(&self) -> &Router;

    /// Link this agent to another registered actor.
    fn connect(&self, to: &ActorRef) {
        self.router().connect(to.name());
    }

    fn send(&self, msg: Message) -> usize {
        self.router().send(msg)
    }

    fn send_to<S: AsRef<str>>(&self, msg: Message, names: &[S]) -> usize {
        self.router().send_to(msg, names)
    }

    fn dispatch(&self, msg: Message) -> usize {
        self.router().dispatch(msg)
    }
}

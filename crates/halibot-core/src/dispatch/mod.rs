//! Asynchronous delivery of messages to named actors.
//!
//! - `mailbox` -- per-actor unbounded inbox plus the worker draining it
//! - `Dispatcher` -- resolves recipient names through the registry and enqueues
//!
//! Delivery is fire-and-forget: `send_to` returns once every resolved inbox
//! holds the message. Each inbox is drained in FIFO order, so repeated sends
//! from one caller arrive in program order.

pub mod mailbox;

use std::sync::{Arc, Weak};

use halibot_types::message::Message;
use tracing::{debug, warn};

pub use mailbox::{Mailbox, spawn_worker};

use crate::registry::Registry;

/// Cloneable delivery handle shared by the runtime and every agent.
///
/// Holds the registry weakly; once the runtime is dropped, sends deliver nothing.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Weak<Registry>,
}

impl Dispatcher {
    pub fn new(registry: &Arc<Registry>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
        }
    }

    /// Deliver `msg` to each named actor. Returns the number of deliveries queued.
    ///
    /// Names without a registered actor are skipped. A name listed twice
    /// receives the message twice.
    pub fn send_to<S: AsRef<str>>(&self, msg: Message, names: &[S]) -> usize {
        self.deliver(Arc::new(msg), names)
    }

    /// Like [`send_to`](Self::send_to) for a message that is already shared.
    pub fn deliver<S: AsRef<str>>(&self, msg: Arc<Message>, names: &[S]) -> usize {
        let Some(registry) = self.registry.upgrade() else {
            debug!(message_id = %msg.id, "runtime gone, message dropped");
            return 0;
        };

        let targets = registry.lookup_many(names);
        if targets.len() < names.len() {
            debug!(
                message_id = %msg.id,
                requested = names.len(),
                resolved = targets.len(),
                "skipping unregistered recipients"
            );
        }

        let mut queued = 0;
        for target in &targets {
            if target.mailbox().deliver(Arc::clone(&msg)) {
                queued += 1;
            } else {
                warn!(recipient = %target.name(), message_id = %msg.id, "mailbox closed, message dropped");
            }
        }
        queued
    }
}

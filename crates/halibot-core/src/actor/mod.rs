//! Actors: the agents and modules that exchange messages.
//!
//! - `Actor` -- the one capability every registered object has: receive a message
//! - `agent` -- `Router` and the `Agent` trait for actors that originate messages
//! - `module` -- the `Module` trait for actors with permission-gated handlers
//!
//! `Actor` uses RPITIT and therefore cannot be a trait object. The registry
//! stores actors as `Arc<dyn ActorDyn>`, an object-safe mirror with a blanket
//! implementation for every `Actor`.

pub mod agent;
pub mod module;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use halibot_types::error::ActorError;
use halibot_types::message::Message;

use crate::dispatch::Mailbox;

pub use agent::{Agent, Router};
pub use module::Module;

/// Something that can be registered with the runtime and handed messages.
///
/// Deliveries may overlap with direct calls made by other code; an actor that
/// mutates its own state in `receive` must synchronize that state itself.
pub trait Actor: Send + Sync + 'static {
    /// Called exactly once, when the actor is added to the runtime.
    fn init(&self) {}

    /// Handle one delivered message.
    fn receive(&self, msg: &Message) -> impl Future<Output = Result<(), ActorError>> + Send;

    /// Called when the runtime shuts down.
    fn shutdown(&self) {}
}

/// Object-safe version of [`Actor`] with a boxed `receive` future.
pub trait ActorDyn: Send + Sync {
    fn init_dyn(&self);

    fn receive_boxed<'a>(
        &'a self,
        msg: &'a Message,
    ) -> Pin<Box<dyn Future<Output = Result<(), ActorError>> + Send + 'a>>;

    fn shutdown_dyn(&self);
}

impl<T: Actor> ActorDyn for T {
    fn init_dyn(&self) {
        Actor::init(self)
    }

    fn receive_boxed<'a>(
        &'a self,
        msg: &'a Message,
    ) -> Pin<Box<dyn Future<Output = Result<(), ActorError>> + Send + 'a>> {
        Box::pin(self.receive(msg))
    }

    fn shutdown_dyn(&self) {
        Actor::shutdown(self)
    }
}

/// Which side of the runtime an actor was registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKind {
    Agent,
    Module,
}

/// Handle to a registered actor: its name, kind, instance, and inbox.
///
/// Cheap to clone. Returned by registration and by registry lookups.
#[derive(Clone)]
pub struct ActorRef {
    name: String,
    kind: ActorKind,
    actor: Arc<dyn ActorDyn>,
    mailbox: Mailbox,
}

impl ActorRef {
    pub(crate) fn new(
        name: String,
        kind: ActorKind,
        actor: Arc<dyn ActorDyn>,
        mailbox: Mailbox,
    ) -> Self {
        Self {
            name,
            kind,
            actor,
            mailbox,
        }
    }

    /// The name the actor is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    pub fn actor(&self) -> &Arc<dyn ActorDyn> {
        &self.actor
    }

    pub(crate) fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Whether this handle refers to the given actor instance.
    pub fn is<A: Actor>(&self, other: &Arc<A>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.actor), Arc::as_ptr(other))
    }

    /// Invoke the actor's `receive` directly, bypassing its mailbox.
    pub async fn receive(&self, msg: &Message) -> Result<(), ActorError> {
        self.actor.receive_boxed(msg).await
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("mailbox_open", &!self.mailbox.is_closed())
            .finish()
    }
}

//! Message domain types for Halibot.
//!
//! A `Message` is the unit that agents and modules exchange. It is built once
//! by a producer and then shared read-only with every recipient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message routed between actors.
///
/// `origin` names the routing context the message came from (a channel or
/// room identifier) and `identity` names the sending principal. Both may be
/// empty for plain delivery; authorization requires them to be non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// UUIDv7 message ID.
    pub id: Uuid,
    /// Flexible JSON body.
    pub body: serde_json::Value,
    /// Routing scope the message came from.
    #[serde(default)]
    pub origin: String,
    /// Principal that sent the message.
    #[serde(default)]
    pub identity: String,
    /// Optional display name of the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message carrying only a body.
    pub fn new(body: impl Into<serde_json::Value>) -> Self {
        Self {
            id: Uuid::now_v7(),
            body: body.into(),
            origin: String::new(),
            identity: String::new(),
            author: None,
            timestamp: Utc::now(),
        }
    }

    /// Build a message sent by `identity` from the routing scope `origin`.
    pub fn from_principal(
        body: impl Into<serde_json::Value>,
        origin: impl Into<String>,
        identity: impl Into<String>,
    ) -> Self {
        Self::new(body).with_origin(origin).with_identity(identity)
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// A value that can be presented to the permission engine.
///
/// `None` means the attribute does not exist on the value at all. `Some("")`
/// means it exists but is empty. The permission gate rejects the former; the
/// engine rejects both while enforcement is on.
pub trait Authorizable {
    fn origin(&self) -> Option<&str>;

    fn identity(&self) -> Option<&str>;
}

impl Authorizable for Message {
    fn origin(&self) -> Option<&str> {
        Some(&self.origin)
    }

    fn identity(&self) -> Option<&str> {
        Some(&self.identity)
    }
}

impl<T: Authorizable + ?Sized> Authorizable for &T {
    fn origin(&self) -> Option<&str> {
        (**self).origin()
    }

    fn identity(&self) -> Option<&str> {
        (**self).identity()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

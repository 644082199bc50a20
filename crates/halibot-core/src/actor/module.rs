//! Modules: actors whose handlers are gated by the permission engine.

use halibot_types::error::AuthError;
use halibot_types::message::Authorizable;

use super::Actor;
use crate::auth::PermissionEngine;

/// An actor that handles messages, typically behind permission checks.
///
/// Handlers either call `has_permission` explicitly or are wrapped in a
/// [`PermissionGate`](crate::auth::PermissionGate).
pub trait Module: Actor {
    /// The permission engine this module authorizes against.
    fn auth(&self) -> &PermissionEngine;

    fn has_permission<M: Authorizable + ?Sized>(
        &self,
        msg: &M,
        permission: &str,
    ) -> Result<bool, AuthError> {
        self.auth().has_permission(msg, permission)
    }

    /// Tell the sender a gated handler refused to run.
    ///
    /// Invoked by gates configured with `reply`. The default does nothing.
    fn reply_denied(&self, _msg: &dyn Authorizable, _permission: &str) {}
}

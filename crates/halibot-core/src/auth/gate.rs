//! Permission gate around module handlers.
//!
//! A `PermissionGate` names a permission and says which handler argument holds
//! the message to authorize. It can be used as an explicit guard
//! (`check`/`run`) or turned into a wrapped handler with `wrap`.

use halibot_types::error::AuthError;
use halibot_types::message::Authorizable;
use tracing::debug;

use crate::actor::Module;

/// Where the gate finds the message among a handler's arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgSource {
    /// Positional argument at this index.
    Position(usize),
    /// Keyword argument with this name.
    Key(String),
}

/// Arguments of one handler call, as seen by a gate.
#[derive(Default)]
pub struct HandlerArgs<'a> {
    positional: Vec<&'a dyn Authorizable>,
    keyword: Vec<(&'a str, &'a dyn Authorizable)>,
}

impl<'a> HandlerArgs<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: &'a dyn Authorizable) -> Self {
        self.positional.push(value);
        self
    }

    /// Add a keyword argument. A repeated key replaces the earlier value.
    pub fn kwarg(mut self, key: &'a str, value: &'a dyn Authorizable) -> Self {
        self.keyword.retain(|(k, _)| *k != key);
        self.keyword.push((key, value));
        self
    }

    pub fn positional(&self, index: usize) -> Option<&'a dyn Authorizable> {
        self.positional.get(index).copied()
    }

    pub fn keyword(&self, key: &str) -> Option<&'a dyn Authorizable> {
        self.keyword
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| *value)
    }
}

impl std::fmt::Debug for HandlerArgs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerArgs")
            .field("positional", &self.positional.len())
            .field("keyword", &self.keyword.iter().map(|(k, _)| *k).collect::<Vec<_>>())
            .finish()
    }
}

/// Runs a handler only when the message's sender holds `permission`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGate {
    permission: String,
    reply: bool,
    source: ArgSource,
}

impl PermissionGate {
    pub fn new(permission: impl Into<String>, source: ArgSource) -> Self {
        Self {
            permission: permission.into(),
            reply: false,
            source,
        }
    }

    /// Gate reading the message from positional argument `argnum`.
    pub fn at(permission: impl Into<String>, argnum: usize) -> Self {
        Self::new(permission, ArgSource::Position(argnum))
    }

    /// Gate reading the message from keyword argument `key`.
    pub fn keyed(permission: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(permission, ArgSource::Key(key.into()))
    }

    /// Whether a denial triggers the module's `reply_denied`.
    pub fn with_reply(mut self, reply: bool) -> Self {
        self.reply = reply;
        self
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }

    pub fn reply(&self) -> bool {
        self.reply
    }

    pub fn source(&self) -> &ArgSource {
        &self.source
    }

    fn extract<'a>(&self, args: &HandlerArgs<'a>) -> Result<&'a dyn Authorizable, AuthError> {
        let value = match &self.source {
            ArgSource::Position(index) => args.positional(*index).ok_or_else(|| {
                AuthError::MalformedMessage(format!("no positional argument at index {index}"))
            })?,
            ArgSource::Key(key) => args
                .keyword(key)
                .ok_or_else(|| AuthError::MissingArgument(key.clone()))?,
        };

        if value.origin().is_none() || value.identity().is_none() {
            return Err(AuthError::MalformedMessage(
                "argument has no origin or identity".to_string(),
            ));
        }
        Ok(value)
    }

    /// Authorize the call without running anything.
    ///
    /// On denial with `reply` set, the module's `reply_denied` is invoked
    /// before returning `Ok(false)`.
    pub fn check<M: Module>(&self, module: &M, args: &HandlerArgs<'_>) -> Result<bool, AuthError> {
        let msg = self.extract(args)?;
        let allowed = module.has_permission(msg, &self.permission)?;
        if !allowed {
            debug!(permission = %self.permission, reply = self.reply, "permission denied");
            if self.reply {
                module.reply_denied(msg, &self.permission);
            }
        }
        Ok(allowed)
    }

    /// Run `handler` with the original arguments if the call is authorized.
    ///
    /// Returns `Ok(None)` when denied. Errors mean the handler was not run.
    pub fn run<M, R, F>(&self, module: &M, args: &HandlerArgs<'_>, handler: F) -> Result<Option<R>, AuthError>
    where
        M: Module,
        F: FnOnce(&HandlerArgs<'_>) -> R,
    {
        if self.check(module, args)? {
            Ok(Some(handler(args)))
        } else {
            Ok(None)
        }
    }

    /// Wrap a module handler so every call goes through this gate.
    pub fn wrap<M, R, F>(self, handler: F) -> impl Fn(&M, &HandlerArgs<'_>) -> Result<Option<R>, AuthError>
    where
        M: Module,
        F: Fn(&M, &HandlerArgs<'_>) -> R,
    {
        move |module: &M, args: &HandlerArgs<'_>| self.run(module, args, |args| handler(module, args))
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while authorizing a message.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The value presented for authorization has no usable origin or identity.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The permission gate was told to read a keyword argument that was not supplied.
    #[error("no such keyword argument: '{0}'")]
    MissingArgument(String),

    /// A stored grant pattern is not a valid regular expression.
    #[error("invalid permission pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors from permission store operations (used by the store port in halibot-core).
#[derive(Debug, Error)]
pub enum PermissionStoreError {
    #[error("permission store not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("permission store I/O error: {0}")]
    Io(String),

    #[error("permission store parse error: {0}")]
    Parse(String),

    #[error("no permission store path configured")]
    NoPath,
}

/// Errors returned by an actor while handling a message.
#[derive(Debug, Error)]
pub enum ActorError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("handler failed: {0}")]
    Failed(String),
}

/// Errors raised while adding an actor to the runtime.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// No tokio runtime was supplied and none is running on this thread.
    #[error("cannot register actor '{0}': no async runtime available")]
    NoAsyncRuntime(String),
}

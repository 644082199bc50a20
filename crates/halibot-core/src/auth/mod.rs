//! Access control for module handlers.
//!
//! - `engine` -- `PermissionEngine`: regex grants, enforcement flag, fail-closed loading
//! - `gate` -- `PermissionGate`: guard or wrapper that authorizes a handler argument
//! - `pattern` -- `PatternCache`: compiled whole-string patterns keyed by source
//! - `store` -- `PermissionStore` port and its type-erased/in-memory forms

pub mod engine;
pub mod gate;
pub mod pattern;
pub mod store;

pub use engine::PermissionEngine;
pub use gate::{ArgSource, HandlerArgs, PermissionGate};
pub use pattern::PatternCache;
pub use store::{BoxPermissionStore, MemoryPermissionStore, PermissionStore};

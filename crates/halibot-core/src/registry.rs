//! Name registry for live actors.
//!
//! A concurrent name-indexed map of actor handles. Entries are added when an
//! actor is registered and stay until the runtime is dropped.

use dashmap::DashMap;

use crate::actor::ActorRef;

/// Registry of running actors, indexed by name.
#[derive(Debug, Default)]
pub struct Registry {
    entries: DashMap<String, ActorRef>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Register an actor under its own name.
    ///
    /// If an actor with this name already exists, it is replaced and the old
    /// handle is returned.
    pub fn register(&self, actor: ActorRef) -> Option<ActorRef> {
        self.entries.insert(actor.name().to_string(), actor)
    }

    /// Look up an actor by name.
    pub fn lookup(&self, name: &str) -> Option<ActorRef> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }

    /// Look up several actors, keeping request order and dropping unknown names.
    pub fn lookup_many<S: AsRef<str>>(&self, names: &[S]) -> Vec<ActorRef> {
        names
            .iter()
            .filter_map(|name| self.lookup(name.as_ref()))
            .collect()
    }

    /// List all registered names.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

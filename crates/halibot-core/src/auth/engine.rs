//! The permission engine: grants, enforcement flag, and fail-closed loading.
//!
//! While enforcement is off every check passes and `grant_permission` /
//! `revoke_permission` leave the grant list untouched. A failed `load_perms`
//! always turns enforcement on with no grants.
//!
//! Compiled patterns are cached. The cache is cleared whenever the grant list
//! is replaced, and a revoke evicts sources no remaining grant uses.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use halibot_types::config::AuthConfig;
use halibot_types::error::{AuthError, PermissionStoreError};
use halibot_types::message::Authorizable;
use halibot_types::permission::Grant;
use tracing::{debug, info, warn};

use super::pattern::PatternCache;
use super::store::BoxPermissionStore;

#[derive(Debug, Default)]
struct EngineState {
    enabled: bool,
    perms: Vec<Grant>,
    path: Option<PathBuf>,
    /// Bumped on every change to `perms`.
    generation: u64,
}

impl EngineState {
    fn replace_perms(&mut self, perms: Vec<Grant>) {
        self.perms = perms;
        self.generation += 1;
    }

    fn uses_pattern(&self, source: &str) -> bool {
        self.perms
            .iter()
            .any(|g| g.origin == source || g.identity == source || g.permission == source)
    }
}

/// Decides whether a message's sender may use a named permission.
///
/// Shared by every module in the runtime (wrap it in an `Arc`). All state sits
/// behind one lock, so a check never observes a half-applied grant.
#[derive(Debug)]
pub struct PermissionEngine {
    state: RwLock<EngineState>,
    patterns: PatternCache,
    store: BoxPermissionStore,
}

impl PermissionEngine {
    /// Create an engine with enforcement off, no grants, and no store path.
    pub fn new(store: BoxPermissionStore) -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
            patterns: PatternCache::new(),
            store,
        }
    }

    /// Create an engine with the enforcement flag and store path from `config`.
    pub fn with_config(config: &AuthConfig, store: BoxPermissionStore) -> Self {
        let engine = Self::new(store);
        {
            let mut state = engine.write_state();
            state.enabled = config.enabled;
            state.path = Some(config.perms_file.clone());
        }
        engine
    }

    fn read_state(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().expect("permission state lock poisoned")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().expect("permission state lock poisoned")
    }

    pub fn is_enabled(&self) -> bool {
        self.read_state().enabled
    }

    /// Turn enforcement on or off. The grant list is kept either way.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.write_state();
        if state.enabled != enabled {
            info!(enabled, "permission enforcement toggled");
        }
        state.enabled = enabled;
    }

    /// Snapshot of the grant list in insertion order.
    pub fn perms(&self) -> Vec<Grant> {
        self.read_state().perms.clone()
    }

    /// Replace the grant list wholesale, regardless of enforcement.
    pub fn set_perms(&self, perms: Vec<Grant>) {
        let mut state = self.write_state();
        state.replace_perms(perms);
        self.patterns.clear();
    }

    /// Store location used by `write_perms`.
    pub fn path(&self) -> Option<PathBuf> {
        self.read_state().path.clone()
    }

    pub fn set_path(&self, path: impl Into<PathBuf>) {
        self.write_state().path = Some(path.into());
    }

    /// Append a grant. No-op while enforcement is off.
    ///
    /// Patterns are stored as given; invalid regexes surface at check time.
    /// Returns whether the grant list changed.
    pub fn grant_permission(
        &self,
        origin: impl Into<String>,
        identity: impl Into<String>,
        permission: impl Into<String>,
    ) -> bool {
        let mut state = self.write_state();
        if !state.enabled {
            debug!("permission enforcement off, ignoring grant");
            return false;
        }
        let grant = Grant::new(origin, identity, permission);
        debug!(origin = %grant.origin, identity = %grant.identity, permission = %grant.permission, "granting permission");
        state.perms.push(grant);
        state.generation += 1;
        true
    }

    /// Remove the first grant exactly equal to the given triple.
    ///
    /// Comparison is on pattern source text. No-op while enforcement is off
    /// or when no such grant exists. Returns whether a grant was removed.
    pub fn revoke_permission(&self, origin: &str, identity: &str, permission: &str) -> bool {
        let mut state = self.write_state();
        if !state.enabled {
            debug!("permission enforcement off, ignoring revoke");
            return false;
        }
        let position = state.perms.iter().position(|g| {
            g.origin == origin && g.identity == identity && g.permission == permission
        });
        match position {
            Some(index) => {
                let removed = state.perms.remove(index);
                state.generation += 1;
                for source in [&removed.origin, &removed.identity, &removed.permission] {
                    if !state.uses_pattern(source) {
                        self.patterns.evict(source);
                    }
                }
                debug!(origin, identity, permission, "revoked permission");
                true
            }
            None => {
                debug!(origin, identity, permission, "no matching grant to revoke");
                false
            }
        }
    }

    /// Whether the sender of `msg` holds `permission`.
    ///
    /// Always `Ok(true)` while enforcement is off. Otherwise the message must
    /// carry a non-empty origin and identity, and some grant must match all
    /// three of origin, identity, and permission. Grant order does not affect
    /// the answer: a match anywhere wins over an invalid pattern elsewhere.
    pub fn has_permission<M: Authorizable + ?Sized>(
        &self,
        msg: &M,
        permission: &str,
    ) -> Result<bool, AuthError> {
        let state = self.read_state();
        if !state.enabled {
            return Ok(true);
        }

        let origin = required(msg.origin(), "origin")?;
        let identity = required(msg.identity(), "identity")?;

        let mut invalid = None;
        for grant in &state.perms {
            match self.grant_matches(grant, origin, identity, permission) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(err) => {
                    invalid.get_or_insert(err);
                }
            }
        }

        match invalid {
            Some(err) => Err(err),
            None => Ok(false),
        }
    }

    fn grant_matches(
        &self,
        grant: &Grant,
        origin: &str,
        identity: &str,
        permission: &str,
    ) -> Result<bool, AuthError> {
        Ok(self.patterns.full_match(&grant.origin, origin)?
            && self.patterns.full_match(&grant.identity, identity)?
            && self.patterns.full_match(&grant.permission, permission)?)
    }

    /// Replace the grant list with the one stored at `path`.
    ///
    /// Never fails. If the store cannot be read or parsed, enforcement is
    /// forced on and the grant list is emptied. On success the enforcement
    /// flag is left as it was. `path` becomes the target of `write_perms`.
    ///
    /// The replacement is wholesale: grants and revokes applied while the
    /// store read is in flight are discarded, and a warning is logged when
    /// that happens.
    pub async fn load_perms(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let started_at = self.read_state().generation;
        let loaded = self.store.read(path).await;

        let mut state = self.write_state();
        if state.generation != started_at {
            warn!(path = %path.display(), "grant list changed during load, those changes are discarded");
        }
        state.path = Some(path.to_path_buf());
        match loaded {
            Ok(perms) => {
                info!(path = %path.display(), grants = perms.len(), "loaded permission grants");
                state.replace_perms(perms);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not load permission grants, enforcing with none");
                state.replace_perms(Vec::new());
                state.enabled = true;
            }
        }
        self.patterns.clear();
    }

    /// Overwrite the store at the current path with the grant list.
    pub async fn write_perms(&self) -> Result<(), PermissionStoreError> {
        let (path, perms) = {
            let state = self.read_state();
            let path = state.path.clone().ok_or(PermissionStoreError::NoPath)?;
            (path, state.perms.clone())
        };
        self.store.write(&path, &perms).await?;
        debug!(path = %path.display(), grants = perms.len(), "wrote permission grants");
        Ok(())
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AuthError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(AuthError::MalformedMessage(format!("{field} is empty"))),
        None => Err(AuthError::MalformedMessage(format!("no {field} attribute"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Runtime configuration types for Halibot.
//!
//! `RuntimeConfig` represents the top-level `config.toml`: permission
//! enforcement settings and the outbound links of each configured agent.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration for a Halibot runtime.
///
/// Loaded from `~/.halibot/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Permission enforcement settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Per-agent configuration, keyed by the agent's registered name.
    #[serde(default)]
    pub agents: BTreeMap<String, AgentConfig>,
}

/// Permission enforcement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Whether permission checks are enforced at startup.
    #[serde(default)]
    pub enabled: bool,

    /// Location of the JSON permission store.
    #[serde(default = "default_perms_file")]
    pub perms_file: PathBuf,
}

fn default_perms_file() -> PathBuf {
    PathBuf::from("permissions.json")
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            perms_file: default_perms_file(),
        }
    }
}

/// Configuration consumed by an agent.
///
/// `name` selects which entry of `out.named` is merged into the agent's
/// recipient list at dispatch time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub out: OutLinks,
}

/// Outbound recipient names of an agent, in two buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutLinks {
    /// The `"default"` bucket, always used.
    #[serde(default)]
    pub default: Vec<String>,

    /// Buckets keyed by agent name; only the agent's own is used.
    #[serde(default)]
    pub named: BTreeMap<String, Vec<String>>,
}

impl AgentConfig {
    /// Recipient names for dispatch: the default bucket followed by the
    /// bucket named after `self.name`. Duplicates are kept.
    pub fn recipients(&self) -> Vec<String> {
        let mut names = self.out.default.clone();
        if let Some(own) = self.name.as_deref().and_then(|n| self.out.named.get(n)) {
            names.extend(own.iter().cloned());
        }
        names
    }
}

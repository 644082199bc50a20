//! Permission grant type.

use serde::{Deserialize, Serialize};

/// A stored triple of regex sources authorizing `permission` for every
/// message whose origin and identity match the first two patterns.
///
/// On disk a grant is a 3-element JSON array:
/// `["origin pattern", "identity pattern", "permission pattern"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String, String)", into = "(String, String, String)")]
pub struct Grant {
    pub origin: String,
    pub identity: String,
    pub permission: String,
}

impl Grant {
    pub fn new(
        origin: impl Into<String>,
        identity: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            identity: identity.into(),
            permission: permission.into(),
        }
    }
}

impl From<(String, String, String)> for Grant {
    fn from((origin, identity, permission): (String, String, String)) -> Self {
        Self {
            origin,
            identity,
            permission,
        }
    }
}

impl From<Grant> for (String, String, String) {
    fn from(grant: Grant) -> Self {
        (grant.origin, grant.identity, grant.permission)
    }
}

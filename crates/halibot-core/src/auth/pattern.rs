//! Compiled-regex cache for grant patterns.

use dashmap::DashMap;
use halibot_types::error::AuthError;
use regex::Regex;

/// Compiled grant patterns, keyed by pattern source text.
///
/// Patterns match the whole value, never a substring. Sources that fail to
/// compile are reported every time they are used and never cached. The owner
/// evicts sources that no longer appear in any grant.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: DashMap<String, Regex>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `value` matches `pattern` in its entirety.
    pub fn full_match(&self, pattern: &str, value: &str) -> Result<bool, AuthError> {
        if let Some(re) = self.compiled.get(pattern) {
            return Ok(re.is_match(value));
        }

        let re = compile_anchored(pattern)?;
        let matched = re.is_match(value);
        self.compiled.insert(pattern.to_string(), re);
        Ok(matched)
    }

    /// Drop the compiled form of `pattern`. Returns whether it was cached.
    pub fn evict(&self, pattern: &str) -> bool {
        self.compiled.remove(pattern).is_some()
    }

    pub fn clear(&self) {
        self.compiled.clear();
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

fn compile_anchored(pattern: &str) -> Result<Regex, AuthError> {
    let invalid = |err: regex::Error| AuthError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    };
    // The bare source must compile on its own so a stray `)` cannot break out
    // of the anchoring group below.
    Regex::new(pattern).map_err(invalid)?;
    Regex::new(&format!(r"\A(?:{pattern})\z")).map_err(invalid)
}

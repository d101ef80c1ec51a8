//! # Scopes
//!
//! A scope names the resources a permission applies to, e.g. `users:id:42`.
//! Scopes are colon separated: `kind:attribute:identifier`. Any trailing
//! segment may be the `*` wildcard, and `*` alone matches everything.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wildcard segment.
pub const WILDCARD: &str = "*";

/// A permission scope such as `users:id:42` or `users:*`.
///
/// # Example
///
/// ```
/// use tenancy_rbac::scopes::Scope;
///
/// let scope = Scope::new("users:id:42");
/// assert_eq!(scope.identifier_after("users:id:"), Some("42"));
/// assert!(Scope::new("users:*").covers_prefix("users:id:"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    /// Create a scope from its string form.
    pub fn new(scope: impl Into<String>) -> Self {
        Self(scope.into())
    }

    /// The scope matching everything.
    pub fn all() -> Self {
        Self(WILDCARD.to_string())
    }

    /// Get the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this scope is a wildcard covering every resource
    /// under `prefix`.
    ///
    /// For the prefix `users:id:` the covering wildcards are `*`, `users:*`
    /// and `users:id:*`.
    pub fn covers_prefix(&self, prefix: &str) -> bool {
        if self.0 == WILDCARD {
            return true;
        }
        let Some(stem) = self.0.strip_suffix(WILDCARD) else {
            return false;
        };
        stem.ends_with(':') && prefix.starts_with(stem)
    }

    /// Get the identifier following `prefix`, if this scope names a single
    /// resource under it.
    pub fn identifier_after(&self, prefix: &str) -> Option<&str> {
        self.0
            .strip_prefix(prefix)
            .filter(|id| !id.is_empty() && *id != WILDCARD)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scope {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards_cover_prefix() {
        assert!(Scope::all().covers_prefix("users:id:"));
        assert!(Scope::new("users:*").covers_prefix("users:id:"));
        assert!(Scope::new("users:id:*").covers_prefix("users:id:"));

        assert!(!Scope::new("teams:*").covers_prefix("users:id:"));
        assert!(!Scope::new("users:id:42").covers_prefix("users:id:"));
        assert!(!Scope::new("use*").covers_prefix("users:id:"));
    }

    #[test]
    fn test_identifier_after_prefix() {
        assert_eq!(Scope::new("users:id:42").identifier_after("users:id:"), Some("42"));
        assert_eq!(Scope::new("users:id:*").identifier_after("users:id:"), None);
        assert_eq!(Scope::new("users:id:").identifier_after("users:id:"), None);
        assert_eq!(Scope::new("teams:id:1").identifier_after("users:id:"), None);
    }
}

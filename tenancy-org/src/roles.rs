//! Organization roles
//!
//! This module defines the role hierarchy a membership carries within an
//! organization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a user within an organization.
///
/// Roles are hierarchical, with each role inheriting the permissions of lower roles.
/// The hierarchy is: None < Viewer < Editor < Admin
///
/// # Permission Model
///
/// - **None**: Member of the organization without any basic role
/// - **Viewer**: Read-only access to organization resources
/// - **Editor**: Can create and edit content
/// - **Admin**: Can manage the organization and its members
///
/// Every organization with members must keep at least one `Admin`.
///
/// # Examples
///
/// ```
/// use tenancy_org::OrgRole;
///
/// assert!(OrgRole::Admin > OrgRole::Editor);
/// assert_eq!(OrgRole::parse("admin"), Some(OrgRole::Admin));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrgRole {
    /// Member without a basic role
    None = 0,

    /// Read-only access to organization resources
    Viewer = 1,

    /// Can create and edit content
    Editor = 2,

    /// Can manage the organization and its members
    Admin = 3,
}

impl OrgRole {
    /// Parse role from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive)
    ///
    /// # Returns
    ///
    /// `Some(OrgRole)` if valid, `None` otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use tenancy_org::OrgRole;
    ///
    /// assert_eq!(OrgRole::parse("admin"), Some(OrgRole::Admin));
    /// assert_eq!(OrgRole::parse("VIEWER"), Some(OrgRole::Viewer));
    /// assert_eq!(OrgRole::parse("owner"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "viewer" => Some(Self::Viewer),
            "editor" => Some(Self::Editor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Get the stored representation of the role.
    ///
    /// This is the value persisted in the `org_user.role` column.
    ///
    /// # Examples
    ///
    /// ```
    /// use tenancy_org::OrgRole;
    ///
    /// assert_eq!(OrgRole::Admin.as_str(), "Admin");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Viewer => "Viewer",
            Self::Editor => "Editor",
            Self::Admin => "Admin",
        }
    }
}

impl Default for OrgRole {
    fn default() -> Self {
        Self::Viewer
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_role_hierarchy() {
        assert!(OrgRole::Admin > OrgRole::Editor);
        assert!(OrgRole::Editor > OrgRole::Viewer);
        assert!(OrgRole::Viewer > OrgRole::None);
    }

    #[test]
    fn test_org_role_parse_round_trips_stored_value() {
        for role in [OrgRole::None, OrgRole::Viewer, OrgRole::Editor, OrgRole::Admin] {
            assert_eq!(OrgRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(OrgRole::parse("owner"), None);
    }

    #[test]
    fn test_org_role_serializes_as_stored_value() {
        let json = serde_json::to_string(&OrgRole::Admin).unwrap();
        assert_eq!(json, "\"Admin\"");
    }
}

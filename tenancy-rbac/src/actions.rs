//! # Actions
//!
//! Defines the actions that can be granted on organization members.
//! Actions are identified by a `resource:verb` string such as `org.users:read`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Actions that can be performed on organization memberships.
///
/// - **OrgUsersRead**: List and view members of an organization
/// - **OrgUsersRemove**: Remove members from an organization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// List/view organization members.
    #[serde(rename = "org.users:read")]
    OrgUsersRead,

    /// Remove members from an organization.
    #[serde(rename = "org.users:remove")]
    OrgUsersRemove,
}

impl Action {
    /// Get the string representation of the action.
    ///
    /// # Returns
    ///
    /// A static string representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::OrgUsersRead => "org.users:read",
            Action::OrgUsersRemove => "org.users:remove",
        }
    }

    /// Parse action from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive)
    ///
    /// # Returns
    ///
    /// `Some(Action)` if valid, `None` otherwise
    ///
    /// # Example
    ///
    /// ```
    /// use tenancy_rbac::actions::Action;
    ///
    /// assert_eq!(Action::parse("org.users:read"), Some(Action::OrgUsersRead));
    /// assert_eq!(Action::parse("ORG.USERS:REMOVE"), Some(Action::OrgUsersRemove));
    /// assert_eq!(Action::parse("org.users"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        Self::all().into_iter().find(|action| action.as_str() == s)
    }

    /// Get all actions.
    pub fn all() -> Vec<Self> {
        vec![Action::OrgUsersRead, Action::OrgUsersRemove]
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! # Identity
//!
//! The signed-in actor on whose behalf an operation runs, with the
//! permissions it holds in each organization.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::permissions::PermissionSet;

/// A signed-in user acting within one organization.
///
/// # Example
///
/// ```
/// use tenancy_rbac::{Action, PermissionSet, SignedInUser};
///
/// let actor = SignedInUser::new(1, 5, "admin")
///     .with_permissions(5, PermissionSet::from_strings(&["org.users:read@users:*"]));
///
/// assert!(actor.current_permissions().is_some_and(|p| p.allows(Action::OrgUsersRead)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInUser {
    /// User ID of the actor
    pub user_id: i64,

    /// Organization the actor is acting in
    pub org_id: i64,

    /// Login of the actor
    pub login: String,

    /// Permissions per organization ID
    #[serde(default)]
    pub permissions: HashMap<i64, PermissionSet>,
}

impl SignedInUser {
    /// Create an actor without permissions.
    pub fn new(user_id: i64, org_id: i64, login: impl Into<String>) -> Self {
        Self {
            user_id,
            org_id,
            login: login.into(),
            permissions: HashMap::new(),
        }
    }

    /// Attach the permissions held in an organization.
    pub fn with_permissions(mut self, org_id: i64, permissions: PermissionSet) -> Self {
        self.permissions.insert(org_id, permissions);
        self
    }

    /// Permissions held in the organization the actor is acting in.
    pub fn current_permissions(&self) -> Option<&PermissionSet> {
        self.permissions.get(&self.org_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;

    #[test]
    fn test_current_permissions_follow_org() {
        let actor = SignedInUser::new(1, 5, "ann")
            .with_permissions(9, PermissionSet::from_strings(&["org.users:read@users:*"]));

        assert!(actor.current_permissions().is_none());

        let actor = SignedInUser { org_id: 9, ..actor };
        assert!(actor
            .current_permissions()
            .is_some_and(|p| p.allows(Action::OrgUsersRead)));
    }
}

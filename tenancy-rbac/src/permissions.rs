//! # Permissions
//!
//! Core permission types and sets for the RBAC system.
//! A permission grants an action on a scope.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::actions::Action;
use crate::scopes::Scope;

/// A permission is a combination of action and scope.
///
/// # Example
///
/// ```
/// use tenancy_rbac::permissions::Permission;
/// use tenancy_rbac::actions::Action;
///
/// let perm = Permission::new(Action::OrgUsersRead, "users:id:42");
/// assert_eq!(perm.to_string(), "org.users:read@users:id:42");
///
/// let parsed = Permission::from_string("org.users:read@users:*").unwrap();
/// assert_eq!(parsed.scope.as_str(), "users:*");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Permission {
    /// The action allowed.
    pub action: Action,
    /// The resources the action is allowed on.
    pub scope: Scope,
}

impl Permission {
    /// Create a new permission.
    ///
    /// # Arguments
    ///
    /// * `action` - The action allowed
    /// * `scope` - The scope the action applies to
    pub fn new(action: Action, scope: impl Into<Scope>) -> Self {
        Self {
            action,
            scope: scope.into(),
        }
    }

    /// Parse from string (`action@scope`, or a bare action meaning every
    /// resource).
    ///
    /// # Returns
    ///
    /// `Some(Permission)` if the action is known, `None` otherwise
    pub fn from_string(s: &str) -> Option<Self> {
        let (action, scope) = match s.split_once('@') {
            Some((action, scope)) => (action, Scope::new(scope)),
            None => (s, Scope::all()),
        };
        Some(Self::new(Action::parse(action)?, scope))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.action, self.scope)
    }
}

/// The permissions an identity holds, indexed by action.
///
/// # Example
///
/// ```
/// use tenancy_rbac::permissions::{Permission, PermissionSet};
/// use tenancy_rbac::actions::Action;
///
/// let mut set = PermissionSet::new();
/// set.add(Permission::new(Action::OrgUsersRead, "users:id:1"));
/// set.add(Permission::new(Action::OrgUsersRead, "users:id:2"));
///
/// assert_eq!(set.scopes(Action::OrgUsersRead).count(), 2);
/// assert!(!set.allows(Action::OrgUsersRemove));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    permissions: BTreeMap<Action, BTreeSet<Scope>>,
}

impl PermissionSet {
    /// Create a new empty permission set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a permission to the set.
    pub fn add(&mut self, permission: Permission) {
        self.permissions
            .entry(permission.action)
            .or_default()
            .insert(permission.scope);
    }

    /// Check whether the action is granted on any scope.
    pub fn allows(&self, action: Action) -> bool {
        self.permissions.contains_key(&action)
    }

    /// Iterate the scopes granted for an action.
    pub fn scopes(&self, action: Action) -> impl Iterator<Item = &Scope> {
        self.permissions.get(&action).into_iter().flatten()
    }

    /// Create from a list of permission strings, skipping unknown actions.
    ///
    /// # Example
    ///
    /// ```
    /// use tenancy_rbac::permissions::PermissionSet;
    ///
    /// let set = PermissionSet::from_strings(&["org.users:read@users:*", "org.users:remove"]);
    /// assert_eq!(set.len(), 2);
    /// ```
    pub fn from_strings(perms: &[&str]) -> Self {
        perms
            .iter()
            .filter_map(|perm| Permission::from_string(perm))
            .collect()
    }

    /// Get the number of (action, scope) pairs.
    pub fn len(&self) -> usize {
        self.permissions.values().map(BTreeSet::len).sum()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        let mut set = PermissionSet::new();
        for perm in iter {
            set.add(perm);
        }
        set
    }
}

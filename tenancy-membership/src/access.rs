//! Access-control filtering
//!
//! An [`AccessFilterProvider`] turns an actor's permissions for an action
//! into a [`Predicate`] restricting which rows the actor may see.
//! [`ScopeFilter`] is the default provider. It reads the scopes granted
//! for the action in the actor's current organization.

use std::fmt;

use tenancy_rbac::{Action, SignedInUser};

use crate::error::AccessFilterError;
use crate::predicate::{columns, Column, Predicate};

/// Builds row filters from an actor's permissions.
pub trait AccessFilterProvider: Send + Sync + fmt::Debug {
    /// Build the filter restricting `column` to the resources under
    /// `key_prefix` that `actor` may perform `action` on.
    ///
    /// # Arguments
    ///
    /// * `actor` - The actor, if known
    /// * `column` - Column holding the resource ID
    /// * `key_prefix` - Scope prefix of the resource kind, e.g. `users:id:`
    /// * `action` - The action being performed
    fn filter(
        &self,
        actor: Option<&SignedInUser>,
        column: Column,
        key_prefix: &str,
        action: Action,
    ) -> Result<Predicate, AccessFilterError>;
}

/// Scope based filter provider.
///
/// - A wildcard scope covering the prefix lets every row through.
/// - Scopes naming single resources become `column IN (ids)`.
/// - No scope at all lets nothing through.
///
/// Only columns from the accept list may be filtered.
///
/// # Example
///
/// ```
/// use tenancy_membership::access::{AccessFilterProvider, ScopeFilter};
/// use tenancy_membership::predicate::{columns, Predicate};
/// use tenancy_rbac::{Action, PermissionSet, SignedInUser};
///
/// let actor = SignedInUser::new(1, 5, "ann")
///     .with_permissions(5, PermissionSet::from_strings(&["org.users:read@users:id:7"]));
///
/// let filter = ScopeFilter::default()
///     .filter(Some(&actor), columns::ORG_USER_USER_ID, "users:id:", Action::OrgUsersRead)
///     .unwrap();
/// assert_eq!(filter, Predicate::in_list(columns::ORG_USER_USER_ID, [7_i64]));
/// ```
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    accepted_columns: Vec<Column>,
}

impl ScopeFilter {
    /// Create a provider accepting the given columns.
    pub fn new(accepted_columns: Vec<Column>) -> Self {
        Self { accepted_columns }
    }
}

impl Default for ScopeFilter {
    fn default() -> Self {
        Self::new(vec![
            columns::ORG_USER_USER_ID,
            columns::USER_ID,
            columns::ORG_ID,
        ])
    }
}

impl AccessFilterProvider for ScopeFilter {
    fn filter(
        &self,
        actor: Option<&SignedInUser>,
        column: Column,
        key_prefix: &str,
        action: Action,
    ) -> Result<Predicate, AccessFilterError> {
        if !self.accepted_columns.contains(&column) {
            return Err(AccessFilterError::ColumnNotAllowed(column.to_string()));
        }

        let permissions = actor
            .and_then(SignedInUser::current_permissions)
            .ok_or(AccessFilterError::MissingPermissions)?;

        let mut ids = Vec::new();
        for scope in permissions.scopes(action) {
            if scope.covers_prefix(key_prefix) {
                return Ok(Predicate::always());
            }
            if let Some(id) = scope.identifier_after(key_prefix) {
                let id: i64 = id
                    .parse()
                    .map_err(|_| AccessFilterError::InvalidScope(scope.to_string()))?;
                ids.push(id);
            }
        }

        if ids.is_empty() {
            return Ok(Predicate::never());
        }
        Ok(Predicate::in_list(column, ids))
    }
}

//! Error types for membership operations
//!
//! This module defines the errors surfaced by member listing, search and
//! removal, and by the collaborators they depend on.

use thiserror::Error;
use tenancy_org::{OrgId, UserId};

/// Errors raised by a [`Store`](crate::store::Store) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A statement against a relation failed
    #[error("Query on {table} failed: {message}")]
    Query {
        /// Relation the statement targeted
        table: String,
        /// Backend error message
        message: String,
    },

    /// Beginning, committing or rolling back a transaction failed
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// The store could not be reached
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while building an access-control filter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessFilterError {
    /// The column is not accepted for access filtering
    #[error("Column {0} is not allowed in access filters")]
    ColumnNotAllowed(String),

    /// The actor is missing or has no permissions in its organization
    #[error("Missing permissions")]
    MissingPermissions,

    /// A scope under the filtered prefix does not carry a numeric ID
    #[error("Invalid scope {0}: expected a numeric identifier")]
    InvalidScope(String),
}

/// Membership error types.
///
/// Callers can tell apart "nothing happened, user invalid", "nothing
/// happened, last admin" and store failures without seeing store internals.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// The user does not exist or is a service account
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// Removing the member would leave the organization without an admin
    #[error("Cannot remove last admin of organization {0}")]
    LastOrgAdmin(OrgId),

    /// The access-control filter could not be built
    #[error("Access filter error: {0}")]
    AccessFilter(#[from] AccessFilterError),

    /// The backing store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for membership operations.
pub type MembershipResult<T> = Result<T, MembershipError>;

impl MembershipError {
    /// Check if this error should be logged at error level.
    ///
    /// Not-found and invariant violations are expected outcomes.
    pub fn is_server_error(&self) -> bool {
        matches!(self, MembershipError::Store(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            MembershipError::UserNotFound(_) => 404,
            MembershipError::LastOrgAdmin(_) => 400,
            MembershipError::AccessFilter(AccessFilterError::MissingPermissions) => 403,
            MembershipError::AccessFilter(_) | MembershipError::Store(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            MembershipError::UserNotFound(_) => "USER_NOT_FOUND",
            MembershipError::LastOrgAdmin(_) => "LAST_ORG_ADMIN",
            MembershipError::AccessFilter(_) => "ACCESS_FILTER_ERROR",
            MembershipError::Store(_) => "STORE_ERROR",
        }
    }
}

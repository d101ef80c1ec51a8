//! # Tenancy RBAC (Role-Based Access Control)
//!
//! This crate provides the permission vocabulary used when listing and
//! managing organization members.
//!
//! ## Overview
//!
//! The tenancy-rbac crate handles:
//! - **Actions**: Operations on users and members (`org.users:read`, ...)
//! - **Scopes**: Resources an action applies to (`users:id:42`, `users:*`)
//! - **Permissions**: Action + Scope combinations, grouped in sets
//! - **Identity**: The signed-in actor and its per-organization permissions
//!
//! ## Architecture
//!
//! ```text
//! Permission = Action @ Scope
//!
//! Examples:
//!   "org.users:read@users:*"       - Read every member
//!   "org.users:read@users:id:42"   - Read member 42 only
//!   "org.users:remove"             - Remove any member (bare action, `*` scope)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use tenancy_rbac::{Action, Permission, PermissionSet};
//!
//! let mut set = PermissionSet::new();
//! set.add(Permission::new(Action::OrgUsersRead, "users:id:42"));
//!
//! assert!(set.allows(Action::OrgUsersRead));
//! assert!(!set.allows(Action::OrgUsersRemove));
//!
//! let scope = set.scopes(Action::OrgUsersRead).next().unwrap();
//! assert_eq!(scope.identifier_after("users:id:"), Some("42"));
//! ```

pub mod actions;
pub mod identity;
pub mod permissions;
pub mod scopes;

// Re-export main types for convenience
pub use actions::Action;
pub use identity::SignedInUser;
pub use permissions::{Permission, PermissionSet};
pub use scopes::Scope;

//! # Tenancy Membership
//!
//! Listing, searching and removing the members of an organization.
//!
//! ## Overview
//!
//! The tenancy-membership crate handles:
//! - **Listing**: Members of one organization, filtered by user, free text
//!   and the actor's access-control scopes
//! - **Search**: Paged listing with a total count over the same filter
//! - **Removal**: One transaction deleting the membership and its dependent
//!   rows, keeping an admin in the organization and the user's current
//!   organization valid
//!
//! ## Architecture
//!
//! ```text
//! OrgUserService
//!   ├─ AccessFilterProvider ─→ Predicate
//!   ├─ MemberFilter / MemberQuery ─→ Predicate ─→ SQL (Dialect)
//!   ├─ RemovalWorkflow ─→ CleanupRegistry (dashboard_acl, team_member, ...)
//!   └─ Store ─→ StoreSession / StoreTransaction (MemoryStore)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tenancy_membership::{MembershipConfig, MemoryStore, OrgUserService, RemoveOrgUserCommand};
//! use tenancy_org::{OrgRole, Organization, User};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! store.add_org(Organization::new(5, "Acme")).await;
//! store.add_user(User::new(1, "ann", "ann@example.com").with_current_org(5)).await;
//! store.add_user(User::new(2, "bob", "bob@example.com").with_current_org(5)).await;
//! store.add_member(5, 1, OrgRole::Admin).await;
//! store.add_member(5, 2, OrgRole::Viewer).await;
//!
//! let service = OrgUserService::new(Arc::new(store.clone()), MembershipConfig::default())?;
//! let outcome = service
//!     .remove_member(&RemoveOrgUserCommand::new(5, 2).delete_orphaned_user())
//!     .await?;
//!
//! assert!(outcome.user_was_deleted);
//! assert!(store.user(2).await.is_none());
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod cleanup;
pub mod config;
pub mod dialect;
pub mod error;
pub mod memory;
pub mod predicate;
pub mod query;
pub mod removal;
pub mod service;
pub mod store;

// Re-export main types for convenience
pub use access::{AccessFilterProvider, ScopeFilter};
pub use cleanup::{CleanupHandler, CleanupRegistry, TableCleanup};
pub use config::{ConfigError, MembershipConfig};
pub use dialect::Dialect;
pub use error::{AccessFilterError, MembershipError, MembershipResult, StoreError, StoreResult};
pub use memory::{DependentRow, MemoryStore};
pub use predicate::{Column, Predicate, SqlFragment, Value};
pub use query::{GetOrgUsersQuery, SearchOrgUsersQuery};
pub use removal::{RemovalWorkflow, RemoveOrgUserCommand, RemoveOrgUserOutcome};
pub use service::OrgUserService;
pub use store::{Store, StoreSession, StoreTransaction};

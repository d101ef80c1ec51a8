//! # Tenancy Organization Model
//!
//! This crate provides the multi-tenant organization domain model shared by
//! the tenancy services.
//!
//! ## Overview
//!
//! The tenancy-org crate handles:
//! - **Organizations**: Tenant entities
//! - **Users**: Accounts with a current organization
//! - **Memberships**: User-organization relationships carrying a role
//! - **Roles**: Hierarchical organization roles
//! - **Age strings**: Compact "last seen" display values
//!
//! ## Architecture
//!
//! ```text
//! User (current_org_id) ─┐
//!   └─ Membership (role) ─→ Organization
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use tenancy_org::{Membership, OrgRole, Organization, User};
//!
//! let org = Organization::new(5, "Acme Corp");
//! let user = User::new(7, "ann", "ann@example.com").with_current_org(org.id);
//! let membership = Membership::new(org.id, user.id, OrgRole::Admin);
//! assert_eq!(membership.role, OrgRole::Admin);
//! ```

pub mod age;
pub mod membership;
pub mod organization;
pub mod roles;
pub mod user;

/// Organization identifier.
pub type OrgId = i64;

/// User identifier.
pub type UserId = i64;

// Re-export main types for convenience
pub use membership::{Membership, OrgUserDto, SearchOrgUsersResult};
pub use organization::{Organization, UserOrgDto};
pub use roles::OrgRole;
pub use user::User;

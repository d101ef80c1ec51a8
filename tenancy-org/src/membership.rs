//! Membership domain models
//!
//! This module provides the membership entity that links users to
//! organizations, and the DTO returned by member listings.
//! A membership's existence is the sole authority for "user belongs to
//! organization".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::age::age_string_at;
use crate::roles::OrgRole;
use crate::{OrgId, UserId};

/// Organization membership linking a user to an organization.
///
/// Memberships are unique per (organization, user).
///
/// # Examples
///
/// ```
/// use tenancy_org::{Membership, OrgRole};
///
/// let membership = Membership::new(5, 7, OrgRole::Editor);
/// assert_eq!(membership.org_id, 5);
/// assert_eq!(membership.role, OrgRole::Editor);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    /// Organization ID
    pub org_id: OrgId,

    /// User ID
    pub user_id: UserId,

    /// Role within the organization
    pub role: OrgRole,

    /// When the user joined
    pub created_at: DateTime<Utc>,

    /// When the membership was last changed
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// Creates a new membership stamped with the current time.
    ///
    /// # Arguments
    ///
    /// * `org_id` - The organization ID
    /// * `user_id` - The user ID
    /// * `role` - The user's role in the organization
    pub fn new(org_id: OrgId, user_id: UserId, role: OrgRole) -> Self {
        let now = Utc::now();
        Self {
            org_id,
            user_id,
            role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A member of an organization joined with the member's user attributes.
///
/// `created`/`updated` are only filled by full listings; paged searches
/// leave them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgUserDto {
    /// Organization ID
    pub org_id: OrgId,

    /// User ID
    pub user_id: UserId,

    /// User email
    pub email: String,

    /// User display name
    pub name: String,

    /// User login
    pub login: String,

    /// Role within the organization
    pub role: OrgRole,

    /// Last time the user was seen
    pub last_seen_at: Option<DateTime<Utc>>,

    /// Human readable age of `last_seen_at`, e.g. `3d`
    #[serde(default)]
    pub last_seen_at_age: String,

    /// When the user was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// When the user was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl OrgUserDto {
    /// Fill `last_seen_at_age` relative to `now`.
    pub fn with_age(mut self, now: DateTime<Utc>) -> Self {
        self.last_seen_at_age = age_string_at(self.last_seen_at, now);
        self
    }

    /// Drop the user timestamps, as paged searches do.
    pub fn without_timestamps(mut self) -> Self {
        self.created = None;
        self.updated = None;
        self
    }
}

/// A page of organization members plus the number of rows matching the
/// search, independent of the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOrgUsersResult {
    /// Members on the requested page
    pub org_users: Vec<OrgUserDto>,

    /// Total number of members matching the search
    pub total_count: u64,

    /// Requested page (1-based)
    pub page: u32,

    /// Applied page size after capping, 0 when unpaged
    pub per_page: u32,
}

//! User domain model
//!
//! Users belong to organizations through memberships. Each user tracks the
//! organization it is currently working in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrgId, UserId};

/// A user account.
///
/// The `current_org_id` must reference an organization the user is a member
/// of, or be `None` when the user belongs to no organization.
///
/// # Examples
///
/// ```
/// use tenancy_org::User;
///
/// let user = User::new(7, "ann", "ann@example.com").with_current_org(5);
/// assert_eq!(user.current_org_id, Some(5));
/// assert!(!user.is_service_account);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: UserId,

    /// Unique login
    pub login: String,

    /// Email address
    pub email: String,

    /// Display name
    pub name: String,

    /// Last time the user was seen, `None` if never
    pub last_seen_at: Option<DateTime<Utc>>,

    /// When the user was created
    pub created_at: DateTime<Utc>,

    /// When the user was last updated
    pub updated_at: DateTime<Utc>,

    /// Service accounts never show up in member listings
    pub is_service_account: bool,

    /// Organization the user is currently working in
    pub current_org_id: Option<OrgId>,
}

impl User {
    /// Creates a new user with no current organization.
    ///
    /// # Arguments
    ///
    /// * `id` - The user ID
    /// * `login` - The unique login
    /// * `email` - The email address
    pub fn new(id: UserId, login: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        let login = login.into();
        Self {
            id,
            name: login.clone(),
            login,
            email: email.into(),
            last_seen_at: None,
            created_at: now,
            updated_at: now,
            is_service_account: false,
            current_org_id: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the current organization.
    pub fn with_current_org(mut self, org_id: OrgId) -> Self {
        self.current_org_id = Some(org_id);
        self
    }

    /// Set the last-seen timestamp.
    pub fn with_last_seen(mut self, at: DateTime<Utc>) -> Self {
        self.last_seen_at = Some(at);
        self
    }

    /// Mark this user as a service account.
    pub fn service_account(mut self) -> Self {
        self.is_service_account = true;
        self
    }

    /// Switch the current organization, or clear it with `None`.
    pub fn switch_organization(&mut self, org_id: Option<OrgId>) {
        self.current_org_id = org_id;
        self.updated_at = Utc::now();
    }
}

//! Organization domain models
//!
//! Organizations are the tenants of the system. Users join them through
//! memberships.

use serde::{Deserialize, Serialize};

use crate::roles::OrgRole;
use crate::OrgId;

/// An organization represents a tenant in the multi-tenant system.
///
/// # Examples
///
/// ```
/// use tenancy_org::Organization;
///
/// let org = Organization::new(5, "Acme Corp");
/// assert_eq!(org.name, "Acme Corp");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization ID
    pub id: OrgId,

    /// Human-readable name
    pub name: String,
}

impl Organization {
    /// Creates a new organization.
    ///
    /// # Arguments
    ///
    /// * `id` - The organization ID
    /// * `name` - The organization name
    pub fn new(id: OrgId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// An organization a user belongs to, seen from the user's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOrgDto {
    /// Organization ID
    pub org_id: OrgId,

    /// Organization name
    pub name: String,

    /// User's role in this organization
    pub role: OrgRole,
}

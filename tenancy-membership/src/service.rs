//! Organization member service
//!
//! [`OrgUserService`] is the entry point for listing, searching and removing
//! organization members. It composes the member filter, asks the access
//! filter provider which members the actor may see, and runs removals in a
//! single store transaction.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use tenancy_org::{OrgId, OrgUserDto, SearchOrgUsersResult, UserId};
use tenancy_rbac::{Action, SignedInUser};

use crate::access::{AccessFilterProvider, ScopeFilter};
use crate::cleanup::CleanupRegistry;
use crate::config::{ConfigError, MembershipConfig};
use crate::error::MembershipResult;
use crate::predicate::{columns, Predicate, SqlFragment};
use crate::query::{
    count_sql, page_window, GetOrgUsersQuery, MemberFilter, MemberQuery, SearchOrgUsersQuery,
    USERS_SCOPE_PREFIX,
};
use crate::removal::{RemovalWorkflow, RemoveOrgUserCommand, RemoveOrgUserOutcome};
use crate::store::Store;

/// Lists, searches and removes organization members.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tenancy_membership::{GetOrgUsersQuery, MembershipConfig, MemoryStore, OrgUserService};
/// use tenancy_org::{OrgRole, Organization, User};
/// use tenancy_rbac::{PermissionSet, SignedInUser};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// store.add_org(Organization::new(5, "Acme")).await;
/// store.add_user(User::new(1, "ann", "ann@example.com").with_current_org(5)).await;
/// store.add_member(5, 1, OrgRole::Admin).await;
///
/// let service = OrgUserService::new(Arc::new(store), MembershipConfig::default())?;
/// let actor = SignedInUser::new(1, 5, "ann")
///     .with_permissions(5, PermissionSet::from_strings(&["org.users:read@users:*"]));
///
/// let members = service.list_members(&GetOrgUsersQuery::new(5, actor)).await?;
/// assert_eq!(members.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct OrgUserService {
    store: Arc<dyn Store>,
    access: Arc<dyn AccessFilterProvider>,
    cleanup: CleanupRegistry,
    config: MembershipConfig,
}

impl OrgUserService {
    /// Create a service with the scope based access filter and the default
    /// cleanup handlers.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] of an invalid configuration.
    pub fn new(store: Arc<dyn Store>, config: MembershipConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            access: Arc::new(ScopeFilter::default()),
            cleanup: CleanupRegistry::default(),
            config,
        })
    }

    /// Replace the access filter provider.
    pub fn with_access_filter(mut self, access: Arc<dyn AccessFilterProvider>) -> Self {
        self.access = access;
        self
    }

    /// Replace the cleanup handlers.
    pub fn with_cleanup(mut self, cleanup: CleanupRegistry) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// List the members of an organization, ordered by email then login.
    ///
    /// # Arguments
    ///
    /// * `query` - Organization, optional user and text filters, limit and
    ///   the actor to filter for
    ///
    /// # Returns
    ///
    /// Members with their last-seen age filled in. Service accounts are
    /// never listed.
    ///
    /// # Errors
    ///
    /// Fails with [`MembershipError::AccessFilter`](crate::MembershipError::AccessFilter)
    /// when the access filter cannot be built, and with
    /// [`MembershipError::Store`](crate::MembershipError::Store) when the
    /// store fails. No partial result is returned.
    #[instrument(skip(self, query), fields(org_id = query.org_id))]
    pub async fn list_members(&self, query: &GetOrgUsersQuery) -> MembershipResult<Vec<OrgUserDto>> {
        let filter = self.member_filter(
            query.org_id,
            query.user_id,
            query.query.as_deref(),
            query.actor.as_ref(),
            !query.dont_enforce_access_control,
        )?;
        let member_query = MemberQuery::new(filter).limit(query.limit.map_or(0, u64::from));

        let mut session = self.store.session().await?;
        let rows = session.find_org_users(&member_query).await?;

        let now = Utc::now();
        Ok(rows.into_iter().map(|row| row.with_age(now)).collect())
    }

    /// Search the members of an organization one page at a time.
    ///
    /// Access control is always considered unless disabled in the
    /// configuration. Rows carry no created/updated timestamps. The total
    /// count is computed with the same filter as the page, in the same
    /// session. The page starts at `limit * (page - 1)`; page sizes above
    /// the configured maximum return at most that many rows, and `per_page`
    /// reports the size applied.
    #[instrument(skip(self, query), fields(org_id = query.org_id, page = query.page))]
    pub async fn search_members(&self, query: &SearchOrgUsersQuery) -> MembershipResult<SearchOrgUsersResult> {
        let filter = self.member_filter(
            query.org_id,
            None,
            query.query.as_deref(),
            query.actor.as_ref(),
            true,
        )?;
        let (limit, offset) = page_window(query.page, query.limit, self.config.max_page_size);
        let member_query = MemberQuery::new(filter.clone())
            .without_timestamps()
            .limit(limit)
            .offset(offset);

        let mut session = self.store.session().await?;
        let rows = session.find_org_users(&member_query).await?;
        let total_count = session.count_org_users(&filter).await?;

        let now = Utc::now();
        Ok(SearchOrgUsersResult {
            org_users: rows
                .into_iter()
                .map(|row| row.without_timestamps().with_age(now))
                .collect(),
            total_count,
            page: query.page,
            per_page: u32::try_from(limit).unwrap_or(query.limit),
        })
    }

    /// Render the page and count statements of a search for the configured
    /// SQL dialect.
    pub fn search_statements(&self, query: &SearchOrgUsersQuery) -> MembershipResult<(SqlFragment, SqlFragment)> {
        let filter = self.member_filter(
            query.org_id,
            None,
            query.query.as_deref(),
            query.actor.as_ref(),
            true,
        )?;
        let (limit, offset) = page_window(query.page, query.limit, self.config.max_page_size);
        let select = MemberQuery::new(filter.clone())
            .without_timestamps()
            .limit(limit)
            .offset(offset)
            .to_sql(self.config.dialect);
        Ok((select, count_sql(&filter, self.config.dialect)))
    }

    /// Remove a user from an organization.
    ///
    /// The membership, its dependent rows, the admin check and the current
    /// organization repair (or orphan deletion) happen in one transaction.
    /// Nothing is changed when an error is returned.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user does not exist or is a service account
    /// - `LastOrgAdmin` if the organization would be left without an admin
    /// - `Store` if the store fails
    #[instrument(skip(self, cmd), fields(org_id = cmd.org_id, user_id = cmd.user_id))]
    pub async fn remove_member(&self, cmd: &RemoveOrgUserCommand) -> MembershipResult<RemoveOrgUserOutcome> {
        let workflow = RemovalWorkflow::new(&self.cleanup, self.config.allow_emptying_organization);
        let mut tx = self.store.begin().await?;

        match workflow.run(tx.as_mut(), cmd).await {
            Ok(outcome) => {
                tx.commit().await?;
                info!(
                    user_was_deleted = outcome.user_was_deleted,
                    "Removed organization member"
                );
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    error!(error = %rollback, "Rollback failed");
                }
                if err.is_server_error() {
                    error!(error = %err, "Removing organization member failed");
                } else {
                    debug!(error = %err, "Organization member not removed");
                }
                Err(err)
            }
        }
    }

    fn member_filter(
        &self,
        org_id: OrgId,
        user_id: Option<UserId>,
        text: Option<&str>,
        actor: Option<&SignedInUser>,
        enforce_access_control: bool,
    ) -> MembershipResult<Predicate> {
        if actor.is_none() {
            warn!(org_id, "No signed-in user set for member filtering");
        }

        let mut filter = MemberFilter::new(org_id).user(user_id);
        if enforce_access_control && !self.config.access_control_disabled {
            let access = self.access.filter(
                actor,
                columns::ORG_USER_USER_ID,
                USERS_SCOPE_PREFIX,
                Action::OrgUsersRead,
            )?;
            debug!(?access, "Built access filter");
            filter = filter.access(access);
        }
        Ok(filter.text(text).build())
    }
}

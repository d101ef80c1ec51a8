//! Membership removal workflow
//!
//! Removing a member is one all-or-nothing state transition:
//!
//! 1. Look the user up, ignoring service accounts.
//! 2. Delete the membership and every dependent row of the pair.
//! 3. Check that the organization still has an admin.
//! 4. Repair the user's current organization, or delete the user when no
//!    membership is left and the caller asked for it.
//!
//! The workflow runs against a [`StoreTransaction`]. Committing or rolling
//! back is up to the caller.

use serde::{Deserialize, Serialize};
use tenancy_org::{OrgId, OrgRole, UserId};

use crate::cleanup::CleanupRegistry;
use crate::error::{MembershipError, MembershipResult};
use crate::predicate::{columns, tables, Predicate};
use crate::store::StoreTransaction;

/// Command to remove a user from an organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveOrgUserCommand {
    /// Organization to remove the user from
    pub org_id: OrgId,

    /// User to remove
    pub user_id: UserId,

    /// Delete the user when this was its last membership
    #[serde(default)]
    pub delete_orphaned_user: bool,
}

impl RemoveOrgUserCommand {
    /// Remove `user_id` from `org_id`, keeping the user if it is orphaned.
    pub fn new(org_id: OrgId, user_id: UserId) -> Self {
        Self {
            org_id,
            user_id,
            delete_orphaned_user: false,
        }
    }

    /// Delete the user if no membership remains.
    pub fn delete_orphaned_user(mut self) -> Self {
        self.delete_orphaned_user = true;
        self
    }
}

/// What a successful removal did beyond deleting the membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveOrgUserOutcome {
    /// The user had no membership left and was deleted
    pub user_was_deleted: bool,
}

/// The removal steps, parameterized by the cleanup handlers and the
/// emptying policy.
#[derive(Debug, Clone, Copy)]
pub struct RemovalWorkflow<'a> {
    cleanup: &'a CleanupRegistry,
    allow_emptying_organization: bool,
}

impl<'a> RemovalWorkflow<'a> {
    /// Create a workflow running `cleanup` for dependent rows.
    ///
    /// # Arguments
    ///
    /// * `cleanup` - Handlers for the dependent relations
    /// * `allow_emptying_organization` - Accept removing the last admin when
    ///   no other member remains
    pub fn new(cleanup: &'a CleanupRegistry, allow_emptying_organization: bool) -> Self {
        Self {
            cleanup,
            allow_emptying_organization,
        }
    }

    /// Run every step inside `tx`.
    ///
    /// # Errors
    ///
    /// - [`MembershipError::UserNotFound`] if the user does not exist or is a
    ///   service account
    /// - [`MembershipError::LastOrgAdmin`] if the organization would be left
    ///   without an admin
    /// - [`MembershipError::Store`] for any store failure
    ///
    /// On error the transaction holds partial changes and must be rolled
    /// back.
    pub async fn run(
        &self,
        tx: &mut dyn StoreTransaction,
        cmd: &RemoveOrgUserCommand,
    ) -> MembershipResult<RemoveOrgUserOutcome> {
        let not_service_account = Predicate::eq(columns::USER_IS_SERVICE_ACCOUNT, false);
        let user = tx
            .get_user(cmd.user_id, &not_service_account)
            .await?
            .ok_or(MembershipError::UserNotFound(cmd.user_id))?;

        let membership = Predicate::eq(columns::ORG_USER_ORG_ID, cmd.org_id)
            .and(Predicate::eq(columns::ORG_USER_USER_ID, cmd.user_id));
        let deleted = tx.delete(tables::ORG_USER, &membership).await?;
        let dependents = self
            .cleanup
            .remove_membership(tx, cmd.org_id, cmd.user_id)
            .await?;
        tracing::debug!(
            org_id = cmd.org_id,
            user_id = cmd.user_id,
            deleted,
            dependents,
            "Deleted membership"
        );

        self.ensure_admin_left(tx, cmd.org_id).await?;

        let remaining = tx.find_user_orgs(cmd.user_id).await?;
        if let Some(first) = remaining.first() {
            let current_is_valid = user
                .current_org_id
                .is_some_and(|current| remaining.iter().any(|org| org.org_id == current));
            if !current_is_valid {
                tracing::debug!(user_id = user.id, org_id = first.org_id, "Switching current organization");
                tx.set_current_org(user.id, Some(first.org_id)).await?;
            }
            return Ok(RemoveOrgUserOutcome::default());
        }

        if cmd.delete_orphaned_user {
            self.delete_user(tx, user.id).await?;
            return Ok(RemoveOrgUserOutcome {
                user_was_deleted: true,
            });
        }

        tx.set_current_org(user.id, None).await?;
        Ok(RemoveOrgUserOutcome::default())
    }

    async fn ensure_admin_left(&self, tx: &mut dyn StoreTransaction, org_id: OrgId) -> MembershipResult<()> {
        let in_org = Predicate::eq(columns::ORG_USER_ORG_ID, org_id);
        let admins = in_org
            .clone()
            .and(Predicate::eq(columns::ORG_USER_ROLE, OrgRole::Admin.as_str()));
        if tx.count(tables::ORG_USER, &admins).await? > 0 {
            return Ok(());
        }

        let members = tx.count(tables::ORG_USER, &in_org).await?;
        if members == 0 && self.allow_emptying_organization {
            return Ok(());
        }
        Err(MembershipError::LastOrgAdmin(org_id))
    }

    async fn delete_user(&self, tx: &mut dyn StoreTransaction, user_id: UserId) -> MembershipResult<()> {
        tx.delete(tables::USER, &Predicate::eq(columns::USER_ID, user_id))
            .await?;
        tx.delete(
            tables::ORG_USER,
            &Predicate::eq(columns::ORG_USER_USER_ID, user_id),
        )
        .await?;
        let dependents = self.cleanup.remove_user(tx, user_id).await?;
        tracing::debug!(user_id, dependents, "Deleted orphaned user");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{DependentRow, MemoryStore};
    use crate::store::Store;
    use tenancy_org::{Organization, User};

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_org(Organization::new(5, "Five")).await;
        store.add_org(Organization::new(7, "Seven")).await;
        store.add_org(Organization::new(9, "Nine")).await;
        store.add_user(User::new(1, "u1", "u1@example.com").with_current_org(5)).await;
        store.add_user(User::new(2, "u2", "u2@example.com").with_current_org(5)).await;
        store.add_user(User::new(3, "u3", "u3@example.com").with_current_org(7)).await;
        store.add_member(5, 1, OrgRole::Admin).await;
        store.add_member(5, 2, OrgRole::Admin).await;
        store.add_member(5, 3, OrgRole::Viewer).await;
        store.add_member(7, 3, OrgRole::Admin).await;
        store.add_member(9, 3, OrgRole::Editor).await;
        store.add_member(9, 2, OrgRole::Admin).await;
        store
    }

    async fn remove(
        store: &MemoryStore,
        cmd: RemoveOrgUserCommand,
        allow_emptying: bool,
    ) -> MembershipResult<RemoveOrgUserOutcome> {
        let cleanup = CleanupRegistry::default();
        let workflow = RemovalWorkflow::new(&cleanup, allow_emptying);
        let mut tx = store.begin().await?;
        match workflow.run(tx.as_mut(), &cmd).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    #[tokio::test]
    async fn test_remove_one_of_two_admins() {
        let store = seeded().await;
        let outcome = remove(&store, RemoveOrgUserCommand::new(5, 1), false).await.unwrap();

        assert!(!outcome.user_was_deleted);
        assert!(store.membership(5, 1).await.is_none());
        assert!(store.membership(5, 2).await.is_some());
    }

    #[tokio::test]
    async fn test_last_admin_with_members_left_is_rejected() {
        let store = seeded().await;
        remove(&store, RemoveOrgUserCommand::new(5, 1), false).await.unwrap();

        let err = remove(&store, RemoveOrgUserCommand::new(5, 2), false)
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::LastOrgAdmin(5)));
        assert!(store.membership(5, 2).await.is_some());
    }

    #[tokio::test]
    async fn test_sole_member_admin_depends_on_policy() {
        let store = MemoryStore::new();
        store.add_org(Organization::new(5, "Five")).await;
        store.add_user(User::new(1, "u1", "u1@example.com").with_current_org(5)).await;
        store.add_member(5, 1, OrgRole::Admin).await;

        let err = remove(&store, RemoveOrgUserCommand::new(5, 1), false)
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::LastOrgAdmin(5)));
        assert!(store.membership(5, 1).await.is_some());

        remove(&store, RemoveOrgUserCommand::new(5, 1), true).await.unwrap();
        assert!(store.membership(5, 1).await.is_none());
        assert_eq!(store.user(1).await.unwrap().current_org_id, None);
    }

    #[tokio::test]
    async fn test_unknown_user_and_service_account() {
        let store = seeded().await;
        store.add_user(User::new(4, "bot", "bot@example.com").service_account()).await;
        store.add_member(5, 4, OrgRole::Viewer).await;

        let err = remove(&store, RemoveOrgUserCommand::new(5, 99), false)
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::UserNotFound(99)));

        let err = remove(&store, RemoveOrgUserCommand::new(5, 4), false)
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::UserNotFound(4)));
        assert!(store.membership(5, 4).await.is_some());
    }

    #[tokio::test]
    async fn test_current_org_moves_to_lowest_remaining() {
        let store = seeded().await;
        remove(&store, RemoveOrgUserCommand::new(5, 3), false).await.unwrap();
        // Current org 7 is still a membership.
        assert_eq!(store.user(3).await.unwrap().current_org_id, Some(7));

        store.add_member(7, 1, OrgRole::Admin).await;
        remove(&store, RemoveOrgUserCommand::new(7, 3), false).await.unwrap();
        assert_eq!(store.user(3).await.unwrap().current_org_id, Some(9));
    }

    #[tokio::test]
    async fn test_orphan_is_deleted_with_its_rows() {
        let store = seeded().await;
        store.add_member(5, 2, OrgRole::Viewer).await;
        store.add_member(9, 1, OrgRole::Admin).await;
        store.add_dependent(tables::TEAM_MEMBER, DependentRow::new(5, 2, 10)).await;
        store.add_dependent(tables::DASHBOARD_ACL, DependentRow::new(7, 2, 11)).await;

        remove(&store, RemoveOrgUserCommand::new(9, 2), false).await.unwrap();
        let outcome = remove(&store, RemoveOrgUserCommand::new(5, 2).delete_orphaned_user(), false)
            .await
            .unwrap();

        assert!(outcome.user_was_deleted);
        assert!(store.user(2).await.is_none());
        assert!(store.dependents(tables::TEAM_MEMBER).await.is_empty());
        assert!(store.dependents(tables::DASHBOARD_ACL).await.is_empty());
    }

    #[tokio::test]
    async fn test_orphan_kept_without_the_flag() {
        let store = seeded().await;
        store.add_member(9, 1, OrgRole::Admin).await;
        remove(&store, RemoveOrgUserCommand::new(9, 2), false).await.unwrap();
        let outcome = remove(&store, RemoveOrgUserCommand::new(5, 2), false).await.unwrap();

        assert!(!outcome.user_was_deleted);
        let user = store.user(2).await.unwrap();
        assert_eq!(user.current_org_id, None);
    }

    #[tokio::test]
    async fn test_failure_rolls_everything_back() {
        let store = seeded().await;
        store.add_dependent(tables::DASHBOARD_ACL, DependentRow::new(5, 1, 10)).await;
        store.fail_on(tables::QUERY_HISTORY_STAR).await;

        let err = remove(&store, RemoveOrgUserCommand::new(5, 1), false)
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::Store(_)));
        assert!(store.membership(5, 1).await.is_some());
        assert_eq!(store.dependents(tables::DASHBOARD_ACL).await.len(), 1);
    }
}

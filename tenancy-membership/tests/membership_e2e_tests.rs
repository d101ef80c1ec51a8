//! End-to-End tests for organization membership.
//!
//! These tests drive [`OrgUserService`] against the in-memory store and
//! verify the observable state after each operation.
//!
//! Scenarios:
//! 1. Removing a plain member leaves the admins untouched
//! 2. Removing the only admin is rejected and changes nothing
//! 3. Removing a user's last membership with orphan cleanup deletes the user
//! 4. Removing the current organization moves it to the next membership
//! 5. Paged search returns the requested window and the full count
//! 6. Store failures, including ones during the current organization
//!    repair or the orphan deletion, roll the whole removal back
//! 7. Concurrent removals cannot remove both of the last two admins

use std::sync::Arc;

use tenancy_membership::predicate::tables;
use tenancy_membership::{
    CleanupRegistry, DependentRow, GetOrgUsersQuery, MembershipConfig, MembershipError,
    MemoryStore, OrgUserService, RemoveOrgUserCommand, SearchOrgUsersQuery, TableCleanup,
};
use tenancy_org::{OrgRole, Organization, User};
use tenancy_rbac::{PermissionSet, SignedInUser};

/// Test fixture holding a store and a service over it.
struct TestFixture {
    /// Backing store, for seeding and inspection.
    store: MemoryStore,
    /// Service under test.
    service: OrgUserService,
}

impl TestFixture {
    /// Create a fixture with organizations 5, 7 and 9.
    async fn new() -> Self {
        Self::with_config(MembershipConfig::default()).await
    }

    async fn with_config(config: MembershipConfig) -> Self {
        let store = MemoryStore::new();
        for (id, name) in [(5, "Five"), (7, "Seven"), (9, "Nine")] {
            store.add_org(Organization::new(id, name)).await;
        }
        let service = OrgUserService::new(Arc::new(store.clone()), config).unwrap();
        Self { store, service }
    }

    /// Add a user whose current organization is `current_org`.
    async fn user(&self, id: i64, login: &str, current_org: i64) {
        self.store
            .add_user(
                User::new(id, login, format!("{login}@example.com"))
                    .with_name(login.to_uppercase())
                    .with_current_org(current_org),
            )
            .await;
    }

    /// Actor allowed to read every member of `org_id`.
    fn reader(org_id: i64) -> SignedInUser {
        SignedInUser::new(1, org_id, "reader")
            .with_permissions(org_id, PermissionSet::from_strings(&["org.users:read@users:*"]))
    }

    async fn logins(&self, org_id: i64) -> Vec<String> {
        self.service
            .list_members(&GetOrgUsersQuery::new(org_id, Self::reader(org_id)))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.login)
            .collect()
    }

    /// Number of admins in `org_id`.
    async fn admins(&self, org_id: i64) -> usize {
        self.store
            .org_memberships(org_id)
            .await
            .iter()
            .filter(|m| m.role == OrgRole::Admin)
            .count()
    }
}

// ============================================================================
// Removal
// ============================================================================

#[tokio::test]
async fn test_remove_member_keeps_admins() {
    let fx = TestFixture::new().await;
    fx.user(1, "u1", 5).await;
    fx.user(2, "u2", 5).await;
    fx.user(3, "u3", 5).await;
    fx.store.add_member(5, 1, OrgRole::Admin).await;
    fx.store.add_member(5, 2, OrgRole::Admin).await;
    fx.store.add_member(5, 3, OrgRole::Viewer).await;
    fx.store.add_member(9, 3, OrgRole::Viewer).await;

    let outcome = fx
        .service
        .remove_member(&RemoveOrgUserCommand::new(5, 3))
        .await
        .unwrap();

    assert!(!outcome.user_was_deleted);
    assert!(fx.store.membership(5, 3).await.is_none());
    assert_eq!(fx.logins(5).await, vec!["u1", "u2"]);
    assert_eq!(fx.admins(5).await, 2);
}

#[tokio::test]
async fn test_remove_single_admin_is_rejected() {
    let fx = TestFixture::new().await;
    fx.user(1, "u1", 5).await;
    fx.user(3, "u3", 5).await;
    fx.store.add_member(5, 1, OrgRole::Admin).await;
    fx.store.add_member(5, 3, OrgRole::Editor).await;

    let err = fx
        .service
        .remove_member(&RemoveOrgUserCommand::new(5, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, MembershipError::LastOrgAdmin(5)));
    assert_eq!(err.status_code(), 400);
    assert!(fx.store.membership(5, 1).await.is_some());
    assert_eq!(fx.store.user(1).await.unwrap().current_org_id, Some(5));
}

#[tokio::test]
async fn test_remove_sole_member_admin_is_rejected_by_default() {
    let fx = TestFixture::new().await;
    fx.user(1, "u1", 5).await;
    fx.store.add_member(5, 1, OrgRole::Admin).await;

    let err = fx
        .service
        .remove_member(&RemoveOrgUserCommand::new(5, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::LastOrgAdmin(5)));

    let relaxed = TestFixture::with_config(MembershipConfig {
        allow_emptying_organization: true,
        ..MembershipConfig::default()
    })
    .await;
    relaxed.user(1, "u1", 5).await;
    relaxed.store.add_member(5, 1, OrgRole::Admin).await;
    relaxed
        .service
        .remove_member(&RemoveOrgUserCommand::new(5, 1))
        .await
        .unwrap();
    assert!(relaxed.store.org_memberships(5).await.is_empty());
}

#[tokio::test]
async fn test_orphaned_user_is_deleted() {
    let fx = TestFixture::new().await;
    fx.user(1, "u1", 7).await;
    fx.user(4, "u4", 7).await;
    fx.store.add_member(7, 1, OrgRole::Admin).await;
    fx.store.add_member(7, 4, OrgRole::Viewer).await;
    fx.store
        .add_dependent(tables::DASHBOARD_ACL, DependentRow::new(7, 4, 100))
        .await;
    fx.store
        .add_dependent(tables::TEAM_MEMBER, DependentRow::new(7, 4, 200))
        .await;
    fx.store
        .add_dependent(tables::QUERY_HISTORY_STAR, DependentRow::new(7, 1, 300))
        .await;

    let outcome = fx
        .service
        .remove_member(&RemoveOrgUserCommand::new(7, 4).delete_orphaned_user())
        .await
        .unwrap();

    assert!(outcome.user_was_deleted);
    assert!(fx.store.user(4).await.is_none());
    assert!(fx.store.membership(7, 4).await.is_none());
    assert!(fx.store.dependents(tables::DASHBOARD_ACL).await.is_empty());
    assert!(fx.store.dependents(tables::TEAM_MEMBER).await.is_empty());
    assert_eq!(
        fx.store.dependents(tables::QUERY_HISTORY_STAR).await,
        vec![DependentRow::new(7, 1, 300)]
    );
}

#[tokio::test]
async fn test_orphaned_user_is_kept_without_cleanup() {
    let fx = TestFixture::new().await;
    fx.user(1, "u1", 7).await;
    fx.user(4, "u4", 7).await;
    fx.store.add_member(7, 1, OrgRole::Admin).await;
    fx.store.add_member(7, 4, OrgRole::Viewer).await;

    let outcome = fx
        .service
        .remove_member(&RemoveOrgUserCommand::new(7, 4))
        .await
        .unwrap();

    assert!(!outcome.user_was_deleted);
    let user = fx.store.user(4).await.unwrap();
    assert_eq!(user.current_org_id, None);
}

#[tokio::test]
async fn test_current_org_is_repaired() {
    let fx = TestFixture::new().await;
    fx.user(1, "u1", 7).await;
    fx.user(4, "u4", 7).await;
    fx.store.add_member(7, 1, OrgRole::Admin).await;
    fx.store.add_member(7, 4, OrgRole::Editor).await;
    fx.store.add_member(9, 4, OrgRole::Viewer).await;
    fx.store.add_member(9, 1, OrgRole::Admin).await;

    fx.service
        .remove_member(&RemoveOrgUserCommand::new(7, 4).delete_orphaned_user())
        .await
        .unwrap();

    let user = fx.store.user(4).await.unwrap();
    assert_eq!(user.current_org_id, Some(9));
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let fx = TestFixture::new().await;
    let err = fx
        .service
        .remove_member(&RemoveOrgUserCommand::new(5, 42))
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::UserNotFound(42)));
    assert_eq!(err.error_code(), "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_store_failure_rolls_back() {
    let fx = TestFixture::new().await;
    fx.user(1, "u1", 5).await;
    fx.user(2, "u2", 5).await;
    fx.store.add_member(5, 1, OrgRole::Admin).await;
    fx.store.add_member(5, 2, OrgRole::Viewer).await;
    fx.store
        .add_dependent(tables::DASHBOARD_ACL, DependentRow::new(5, 2, 100))
        .await;
    fx.store.fail_on(tables::TEAM_MEMBER).await;

    let err = fx
        .service
        .remove_member(&RemoveOrgUserCommand::new(5, 2).delete_orphaned_user())
        .await
        .unwrap_err();

    assert!(err.is_server_error());
    assert!(fx.store.membership(5, 2).await.is_some());
    assert_eq!(fx.store.dependents(tables::DASHBOARD_ACL).await.len(), 1);
    assert!(fx.store.user(2).await.is_some());

    fx.store.clear_failures().await;
    let outcome = fx
        .service
        .remove_member(&RemoveOrgUserCommand::new(5, 2).delete_orphaned_user())
        .await
        .unwrap();
    assert!(outcome.user_was_deleted);
}

#[tokio::test]
async fn test_failed_current_org_repair_rolls_back() {
    let fx = TestFixture::new().await;
    fx.user(1, "u1", 5).await;
    fx.user(2, "u2", 5).await;
    fx.store.add_member(5, 1, OrgRole::Admin).await;
    fx.store.add_member(5, 2, OrgRole::Viewer).await;
    fx.store.add_member(9, 2, OrgRole::Admin).await;
    fx.store
        .add_dependent(tables::TEAM_MEMBER, DependentRow::new(5, 2, 100))
        .await;
    // The lookup reads `user`; the repair is the next `user` statement.
    fx.store.fail_after(tables::USER, 1).await;

    let err = fx
        .service
        .remove_member(&RemoveOrgUserCommand::new(5, 2))
        .await
        .unwrap_err();

    assert!(matches!(err, MembershipError::Store(_)));
    assert!(fx.store.membership(5, 2).await.is_some());
    assert_eq!(
        fx.store.dependents(tables::TEAM_MEMBER).await,
        vec![DependentRow::new(5, 2, 100)]
    );
    assert_eq!(fx.store.user(2).await.unwrap().current_org_id, Some(5));
}

#[tokio::test]
async fn test_failed_orphan_deletion_rolls_back() {
    let fx = TestFixture::new().await;
    fx.user(1, "u1", 5).await;
    fx.user(2, "u2", 5).await;
    fx.store.add_member(5, 1, OrgRole::Admin).await;
    fx.store.add_member(5, 2, OrgRole::Viewer).await;
    fx.store
        .add_dependent(tables::DASHBOARD_ACL, DependentRow::new(5, 2, 100))
        .await;
    fx.store.fail_after(tables::USER, 1).await;

    let err = fx
        .service
        .remove_member(&RemoveOrgUserCommand::new(5, 2).delete_orphaned_user())
        .await
        .unwrap_err();

    assert!(err.is_server_error());
    assert!(fx.store.user(2).await.is_some());
    assert!(fx.store.membership(5, 2).await.is_some());
    assert_eq!(fx.store.dependents(tables::DASHBOARD_ACL).await.len(), 1);
}

#[tokio::test]
async fn test_registered_cleanup_runs_on_removal() {
    let fx = TestFixture::new().await;
    let service = fx
        .service
        .clone()
        .with_cleanup(CleanupRegistry::default().with(TableCleanup::new("annotation_star")));
    fx.user(1, "u1", 5).await;
    fx.user(2, "u2", 5).await;
    fx.store.add_member(5, 1, OrgRole::Admin).await;
    fx.store.add_member(5, 2, OrgRole::Viewer).await;
    fx.store
        .add_dependent("annotation_star", DependentRow::new(5, 2, 100))
        .await;
    fx.store
        .add_dependent("annotation_star", DependentRow::new(5, 1, 101))
        .await;

    service
        .remove_member(&RemoveOrgUserCommand::new(5, 2))
        .await
        .unwrap();

    assert_eq!(
        fx.store.dependents("annotation_star").await,
        vec![DependentRow::new(5, 1, 101)]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_removals_keep_an_admin() {
    let fx = TestFixture::new().await;
    fx.user(1, "u1", 5).await;
    fx.user(2, "u2", 5).await;
    fx.user(3, "u3", 5).await;
    fx.store.add_member(5, 1, OrgRole::Admin).await;
    fx.store.add_member(5, 2, OrgRole::Admin).await;
    fx.store.add_member(5, 3, OrgRole::Viewer).await;

    let first = {
        let service = fx.service.clone();
        tokio::spawn(async move { service.remove_member(&RemoveOrgUserCommand::new(5, 1)).await })
    };
    let second = {
        let service = fx.service.clone();
        tokio::spawn(async move { service.remove_member(&RemoveOrgUserCommand::new(5, 2)).await })
    };
    let results = [first.await.unwrap(), second.await.unwrap()];

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(MembershipError::LastOrgAdmin(5)))));
    assert_eq!(fx.admins(5).await, 1);
}

// ============================================================================
// Listing and search
// ============================================================================

#[tokio::test]
async fn test_paged_search_window_and_count() {
    let fx = TestFixture::new().await;
    for i in 1..=15 {
        let id = 100 + i;
        fx.user(id, &format!("ann{i:02}"), 5).await;
        fx.store.add_member(5, id, OrgRole::Viewer).await;
    }
    for (id, login) in [(201, "bob"), (202, "carl")] {
        fx.user(id, login, 5).await;
        fx.store.add_member(5, id, OrgRole::Admin).await;
    }

    let query = SearchOrgUsersQuery {
        org_id: 5,
        query: Some("ann".to_string()),
        page: 2,
        limit: 10,
        actor: Some(TestFixture::reader(5)),
    };
    let result = fx.service.search_members(&query).await.unwrap();

    assert_eq!(result.total_count, 15);
    assert_eq!(result.page, 2);
    assert_eq!(result.per_page, 10);
    let logins: Vec<&str> = result.org_users.iter().map(|m| m.login.as_str()).collect();
    assert_eq!(logins, vec!["ann11", "ann12", "ann13", "ann14", "ann15"]);
    assert!(result
        .org_users
        .iter()
        .all(|m| m.created.is_none() && m.updated.is_none()));
}

#[tokio::test]
async fn test_page_above_max_size_keeps_requested_offset() {
    let fx = TestFixture::new().await;
    for id in 1..=2500 {
        fx.user(id, &format!("u{id:05}"), 5).await;
        fx.store.add_member(5, id, OrgRole::Viewer).await;
    }

    let query = SearchOrgUsersQuery {
        org_id: 5,
        page: 2,
        limit: 2000,
        actor: Some(TestFixture::reader(5)),
        ..SearchOrgUsersQuery::default()
    };
    let result = fx.service.search_members(&query).await.unwrap();

    assert_eq!(result.total_count, 2500);
    assert_eq!(result.org_users.len(), 500);
    assert_eq!(result.org_users[0].login, "u02001");
    assert_eq!(result.per_page, 1000);
}

#[tokio::test]
async fn test_search_text_is_case_insensitive_over_email_name_login() {
    let fx = TestFixture::new().await;
    fx.store
        .add_user(User::new(1, "first", "x@example.com").with_name("Annabel").with_current_org(5))
        .await;
    fx.store
        .add_user(User::new(2, "second", "ANN@example.com").with_current_org(5))
        .await;
    fx.store
        .add_user(User::new(3, "hannah", "y@example.com").with_current_org(5))
        .await;
    fx.store
        .add_user(User::new(4, "other", "z@example.com").with_current_org(5))
        .await;
    for id in 1..=4 {
        fx.store.add_member(5, id, OrgRole::Viewer).await;
    }

    let query = SearchOrgUsersQuery {
        org_id: 5,
        query: Some("aNn".to_string()),
        actor: Some(TestFixture::reader(5)),
        ..SearchOrgUsersQuery::default()
    };
    let result = fx.service.search_members(&query).await.unwrap();

    assert_eq!(result.total_count, 3);
    let ids: Vec<i64> = result.org_users.iter().map(|m| m.user_id).collect();
    assert_eq!(ids, vec![2, 1, 3]);
}

#[tokio::test]
async fn test_listing_is_idempotent_and_ordered() {
    let fx = TestFixture::new().await;
    fx.store
        .add_user(User::new(1, "b", "same@example.com").with_current_org(5))
        .await;
    fx.store
        .add_user(User::new(2, "a", "same@example.com").with_current_org(5))
        .await;
    fx.store
        .add_user(User::new(3, "c", "abc@example.com").with_current_org(5))
        .await;
    for id in 1..=3 {
        fx.store.add_member(5, id, OrgRole::Viewer).await;
    }

    let query = GetOrgUsersQuery::new(5, TestFixture::reader(5));
    let first = fx.service.list_members(&query).await.unwrap();
    let second = fx.service.list_members(&query).await.unwrap();

    assert_eq!(first, second);
    let logins: Vec<&str> = first.iter().map(|m| m.login.as_str()).collect();
    assert_eq!(logins, vec!["c", "a", "b"]);
}

#[tokio::test]
async fn test_search_count_matches_scoped_rows() {
    let fx = TestFixture::new().await;
    for id in 1..=6 {
        fx.user(id, &format!("user{id}"), 5).await;
        fx.store.add_member(5, id, OrgRole::Viewer).await;
    }
    let actor = SignedInUser::new(1, 5, "scoped").with_permissions(
        5,
        PermissionSet::from_strings(&["org.users:read@users:id:2", "org.users:read@users:id:4"]),
    );

    let query = SearchOrgUsersQuery {
        org_id: 5,
        page: 1,
        limit: 1,
        actor: Some(actor),
        ..SearchOrgUsersQuery::default()
    };
    let result = fx.service.search_members(&query).await.unwrap();

    assert_eq!(result.total_count, 2);
    assert_eq!(result.org_users.len(), 1);
    assert_eq!(result.org_users[0].user_id, 2);
}

#[tokio::test]
async fn test_search_without_actor_is_forbidden() {
    let fx = TestFixture::new().await;
    let query = SearchOrgUsersQuery {
        org_id: 5,
        ..SearchOrgUsersQuery::default()
    };
    let err = fx.service.search_members(&query).await.unwrap_err();
    assert_eq!(err.status_code(), 403);
}

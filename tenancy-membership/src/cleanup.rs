//! Dependent record cleanup
//!
//! Some relations hold rows per (organization, user) that lose their meaning
//! once the membership is gone. Each such relation is owned by a
//! [`CleanupHandler`]; the [`CleanupRegistry`] runs them in registration
//! order inside the removal transaction.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use tenancy_org::{OrgId, UserId};

use crate::error::StoreResult;
use crate::predicate::{columns, tables, Predicate};
use crate::store::StoreTransaction;

/// Owner of one dependent relation.
#[async_trait]
pub trait CleanupHandler: Send + Sync + fmt::Debug {
    /// Name of the relation this handler cleans.
    fn relation(&self) -> &str;

    /// Delete the rows belonging to the membership of `user_id` in `org_id`.
    async fn remove_membership(
        &self,
        tx: &mut dyn StoreTransaction,
        org_id: OrgId,
        user_id: UserId,
    ) -> StoreResult<u64>;

    /// Delete every row belonging to `user_id`, in any organization.
    async fn remove_user(&self, tx: &mut dyn StoreTransaction, user_id: UserId) -> StoreResult<u64>;
}

/// Cleans a relation keyed by `org_id` and `user_id` columns.
#[derive(Debug, Clone, Copy)]
pub struct TableCleanup {
    table: &'static str,
}

impl TableCleanup {
    /// Handler for `table`.
    pub const fn new(table: &'static str) -> Self {
        Self { table }
    }
}

#[async_trait]
impl CleanupHandler for TableCleanup {
    fn relation(&self) -> &str {
        self.table
    }

    async fn remove_membership(
        &self,
        tx: &mut dyn StoreTransaction,
        org_id: OrgId,
        user_id: UserId,
    ) -> StoreResult<u64> {
        let filter = Predicate::eq(columns::org_id_of(self.table), org_id)
            .and(Predicate::eq(columns::user_id_of(self.table), user_id));
        tx.delete(self.table, &filter).await
    }

    async fn remove_user(&self, tx: &mut dyn StoreTransaction, user_id: UserId) -> StoreResult<u64> {
        let filter = Predicate::eq(columns::user_id_of(self.table), user_id);
        tx.delete(self.table, &filter).await
    }
}

/// Ordered list of cleanup handlers.
///
/// The default registry cleans `dashboard_acl`, `team_member` and
/// `query_history_star`.
///
/// # Example
///
/// ```
/// use tenancy_membership::cleanup::{CleanupRegistry, TableCleanup};
///
/// let registry = CleanupRegistry::default().with(TableCleanup::new("annotation_star"));
/// assert_eq!(
///     registry.relations(),
///     vec!["dashboard_acl", "team_member", "query_history_star", "annotation_star"]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CleanupRegistry {
    handlers: Vec<Arc<dyn CleanupHandler>>,
}

impl CleanupRegistry {
    /// Registry without handlers.
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Append a handler.
    pub fn register(&mut self, handler: Arc<dyn CleanupHandler>) {
        self.handlers.push(handler);
    }

    /// Append a handler, builder style.
    pub fn with(mut self, handler: impl CleanupHandler + 'static) -> Self {
        self.register(Arc::new(handler));
        self
    }

    /// Relations cleaned, in order.
    pub fn relations(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.relation()).collect()
    }

    /// Run every handler for one membership. Stops at the first failure.
    pub async fn remove_membership(
        &self,
        tx: &mut dyn StoreTransaction,
        org_id: OrgId,
        user_id: UserId,
    ) -> StoreResult<u64> {
        let mut removed = 0;
        for handler in &self.handlers {
            let count = handler.remove_membership(tx, org_id, user_id).await?;
            tracing::debug!(relation = handler.relation(), org_id, user_id, count, "Removed dependent rows");
            removed += count;
        }
        Ok(removed)
    }

    /// Run every handler for a user being deleted. Stops at the first
    /// failure.
    pub async fn remove_user(&self, tx: &mut dyn StoreTransaction, user_id: UserId) -> StoreResult<u64> {
        let mut removed = 0;
        for handler in &self.handlers {
            let count = handler.remove_user(tx, user_id).await?;
            tracing::debug!(relation = handler.relation(), user_id, count, "Removed dependent rows of user");
            removed += count;
        }
        Ok(removed)
    }
}

impl Default for CleanupRegistry {
    fn default() -> Self {
        Self::empty()
            .with(TableCleanup::new(tables::DASHBOARD_ACL))
            .with(TableCleanup::new(tables::TEAM_MEMBER))
            .with(TableCleanup::new(tables::QUERY_HISTORY_STAR))
    }
}

//! Relational store abstraction
//!
//! The membership core does not own its storage engine. It talks to a
//! [`Store`] that hands out read sessions and all-or-nothing transactions.
//! [`MemoryStore`](crate::memory::MemoryStore) is the in-process
//! implementation used for tests and embedding.

use async_trait::async_trait;
use tenancy_org::{OrgId, OrgUserDto, User, UserId, UserOrgDto};

use crate::error::StoreResult;
use crate::predicate::Predicate;
use crate::query::MemberQuery;

/// Row-level operations available inside a session or transaction.
///
/// Predicates passed to [`count`](StoreSession::count) and
/// [`delete`](StoreSession::delete) only reference columns of `table`.
#[async_trait]
pub trait StoreSession: Send {
    /// Find members (`org_user` joined with `user`) matching the query,
    /// sorted and windowed as it requests.
    async fn find_org_users(&mut self, query: &MemberQuery) -> StoreResult<Vec<OrgUserDto>>;

    /// Count members (`org_user` joined with `user`) matching the filter.
    async fn count_org_users(&mut self, filter: &Predicate) -> StoreResult<u64>;

    /// Fetch a user by ID if it also matches `filter`.
    async fn get_user(&mut self, user_id: UserId, filter: &Predicate) -> StoreResult<Option<User>>;

    /// Count rows of `table` matching the filter.
    async fn count(&mut self, table: &str, filter: &Predicate) -> StoreResult<u64>;

    /// Delete rows of `table` matching the filter, returning how many went.
    async fn delete(&mut self, table: &str, filter: &Predicate) -> StoreResult<u64>;

    /// Organizations the user is a member of, with the user's role in each,
    /// ordered by ascending organization ID.
    async fn find_user_orgs(&mut self, user_id: UserId) -> StoreResult<Vec<UserOrgDto>>;

    /// Point the user's current organization at `org_id`, or clear it.
    async fn set_current_org(&mut self, user_id: UserId, org_id: Option<OrgId>) -> StoreResult<()>;
}

/// A transaction. Nothing it does is visible to others until
/// [`commit`](StoreTransaction::commit); dropping it without committing
/// rolls back.
#[async_trait]
pub trait StoreTransaction: StoreSession {
    /// Make every change of this transaction visible atomically.
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discard every change of this transaction.
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Transactional relational store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a session for reads.
    async fn session(&self) -> StoreResult<Box<dyn StoreSession>>;

    /// Begin a transaction.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}

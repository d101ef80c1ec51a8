//! In-memory store
//!
//! Suitable for tests and single-process embedding. Reads see committed
//! data only. Write transactions are serialized: a transaction holds the
//! writer lock for its whole lifetime and works on a private copy that
//! replaces the committed tables on commit.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use tenancy_org::{
    Membership, OrgId, OrgRole, OrgUserDto, Organization, User, UserId, UserOrgDto,
};

use crate::error::{StoreError, StoreResult};
use crate::predicate::{compare_rows, tables, Column, Predicate, Row, Value};
use crate::query::MemberQuery;
use crate::store::{Store, StoreSession, StoreTransaction};

/// A row of a dependent relation, keyed by (organization, user).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentRow {
    /// Organization ID
    pub org_id: OrgId,
    /// User ID
    pub user_id: UserId,
    /// ID of the referenced item (dashboard, team, saved query)
    pub item_id: i64,
}

impl DependentRow {
    /// Create a dependent row.
    pub fn new(org_id: OrgId, user_id: UserId, item_id: i64) -> Self {
        Self {
            org_id,
            user_id,
            item_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    orgs: BTreeMap<OrgId, Organization>,
    org_users: BTreeMap<(OrgId, UserId), Membership>,
    dependents: BTreeMap<String, Vec<DependentRow>>,
}

/// In-memory [`Store`].
///
/// Cloning is cheap and clones share the same data. A session reads from
/// the snapshot taken when it was opened, so consecutive reads in one
/// session agree with each other.
///
/// # Example
///
/// ```
/// use tenancy_membership::memory::MemoryStore;
/// use tenancy_org::{OrgRole, Organization, User};
///
/// # async fn example() {
/// let store = MemoryStore::new();
/// store.add_org(Organization::new(5, "Acme")).await;
/// store.add_user(User::new(1, "ann", "ann@example.com").with_current_org(5)).await;
/// store.add_member(5, 1, OrgRole::Admin).await;
///
/// assert!(store.membership(5, 1).await.is_some());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    committed: Arc<RwLock<Arc<Tables>>>,
    writer: Arc<Mutex<()>>,
    /// Statements left to succeed per table before failing
    failures: Arc<Mutex<HashMap<String, usize>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn seed(&self, apply: impl FnOnce(&mut Tables)) {
        let _writer = self.writer.lock().await;
        let mut committed = self.committed.write().await;
        apply(Arc::make_mut(&mut *committed));
    }

    /// Insert or replace an organization.
    pub async fn add_org(&self, org: Organization) {
        self.seed(|db| {
            db.orgs.insert(org.id, org);
        })
        .await;
    }

    /// Insert or replace a user.
    pub async fn add_user(&self, user: User) {
        self.seed(|db| {
            db.users.insert(user.id, user);
        })
        .await;
    }

    /// Insert or replace the membership of `user_id` in `org_id`.
    pub async fn add_member(&self, org_id: OrgId, user_id: UserId, role: OrgRole) {
        self.seed(|db| {
            db.org_users
                .insert((org_id, user_id), Membership::new(org_id, user_id, role));
        })
        .await;
    }

    /// Insert a row into a dependent relation.
    pub async fn add_dependent(&self, table: &str, row: DependentRow) {
        self.seed(|db| {
            db.dependents.entry(table.to_string()).or_default().push(row);
        })
        .await;
    }

    /// Committed state of a user.
    pub async fn user(&self, user_id: UserId) -> Option<User> {
        self.committed.read().await.users.get(&user_id).cloned()
    }

    /// Committed membership of `user_id` in `org_id`.
    pub async fn membership(&self, org_id: OrgId, user_id: UserId) -> Option<Membership> {
        self.committed
            .read()
            .await
            .org_users
            .get(&(org_id, user_id))
            .cloned()
    }

    /// Committed memberships of an organization, by user ID.
    pub async fn org_memberships(&self, org_id: OrgId) -> Vec<Membership> {
        self.committed
            .read()
            .await
            .org_users
            .values()
            .filter(|m| m.org_id == org_id)
            .cloned()
            .collect()
    }

    /// Committed rows of a dependent relation.
    pub async fn dependents(&self, table: &str) -> Vec<DependentRow> {
        self.committed
            .read()
            .await
            .dependents
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every later statement against `table` fail.
    pub async fn fail_on(&self, table: &str) {
        self.fail_after(table, 0).await;
    }

    /// Let the next `successes` statements against `table` run, then fail
    /// every later one.
    pub async fn fail_after(&self, table: &str, successes: usize) {
        self.failures
            .lock()
            .await
            .insert(table.to_string(), successes);
    }

    /// Stop failing statements.
    pub async fn clear_failures(&self) {
        self.failures.lock().await.clear();
    }

    async fn check(&self, table: &str) -> StoreResult<()> {
        let mut failures = self.failures.lock().await;
        match failures.get_mut(table) {
            Some(left) if *left == 0 => Err(StoreError::Query {
                table: table.to_string(),
                message: "injected failure".to_string(),
            }),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Apply an autocommit write and return the new committed snapshot.
    async fn autocommit<T>(&self, apply: impl FnOnce(&mut Tables) -> T) -> (T, Arc<Tables>) {
        let _writer = self.writer.lock().await;
        let mut committed = self.committed.write().await;
        let result = apply(Arc::make_mut(&mut *committed));
        (result, Arc::clone(&*committed))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn session(&self) -> StoreResult<Box<dyn StoreSession>> {
        let snapshot = Arc::clone(&*self.committed.read().await);
        Ok(Box::new(MemorySession {
            store: self.clone(),
            snapshot,
        }))
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = self.writer.clone().lock_owned().await;
        let working = Tables::clone(&**self.committed.read().await);
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            working,
            _guard: guard,
        }))
    }
}

/// Autocommit session. Reads see the snapshot taken at open time, moved
/// forward by the session's own writes.
struct MemorySession {
    store: MemoryStore,
    snapshot: Arc<Tables>,
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn find_org_users(&mut self, query: &MemberQuery) -> StoreResult<Vec<OrgUserDto>> {
        self.store.check(tables::ORG_USER).await?;
        Ok(find_org_users(&self.snapshot, query))
    }

    async fn count_org_users(&mut self, filter: &Predicate) -> StoreResult<u64> {
        self.store.check(tables::ORG_USER).await?;
        Ok(count_org_users(&self.snapshot, filter))
    }

    async fn get_user(&mut self, user_id: UserId, filter: &Predicate) -> StoreResult<Option<User>> {
        self.store.check(tables::USER).await?;
        Ok(get_user(&self.snapshot, user_id, filter))
    }

    async fn count(&mut self, table: &str, filter: &Predicate) -> StoreResult<u64> {
        self.store.check(table).await?;
        Ok(count(&self.snapshot, table, filter))
    }

    async fn delete(&mut self, table: &str, filter: &Predicate) -> StoreResult<u64> {
        self.store.check(table).await?;
        let (removed, snapshot) = self.store.autocommit(|db| delete(db, table, filter)).await;
        self.snapshot = snapshot;
        Ok(removed)
    }

    async fn find_user_orgs(&mut self, user_id: UserId) -> StoreResult<Vec<UserOrgDto>> {
        self.store.check(tables::ORG_USER).await?;
        Ok(find_user_orgs(&self.snapshot, user_id))
    }

    async fn set_current_org(&mut self, user_id: UserId, org_id: Option<OrgId>) -> StoreResult<()> {
        self.store.check(tables::USER).await?;
        let ((), snapshot) = self
            .store
            .autocommit(|db| set_current_org(db, user_id, org_id))
            .await;
        self.snapshot = snapshot;
        Ok(())
    }
}

/// Transaction over a private copy of the tables.
struct MemoryTransaction {
    store: MemoryStore,
    working: Tables,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl StoreSession for MemoryTransaction {
    async fn find_org_users(&mut self, query: &MemberQuery) -> StoreResult<Vec<OrgUserDto>> {
        self.store.check(tables::ORG_USER).await?;
        Ok(find_org_users(&self.working, query))
    }

    async fn count_org_users(&mut self, filter: &Predicate) -> StoreResult<u64> {
        self.store.check(tables::ORG_USER).await?;
        Ok(count_org_users(&self.working, filter))
    }

    async fn get_user(&mut self, user_id: UserId, filter: &Predicate) -> StoreResult<Option<User>> {
        self.store.check(tables::USER).await?;
        Ok(get_user(&self.working, user_id, filter))
    }

    async fn count(&mut self, table: &str, filter: &Predicate) -> StoreResult<u64> {
        self.store.check(table).await?;
        Ok(count(&self.working, table, filter))
    }

    async fn delete(&mut self, table: &str, filter: &Predicate) -> StoreResult<u64> {
        self.store.check(table).await?;
        Ok(delete(&mut self.working, table, filter))
    }

    async fn find_user_orgs(&mut self, user_id: UserId) -> StoreResult<Vec<UserOrgDto>> {
        self.store.check(tables::ORG_USER).await?;
        Ok(find_user_orgs(&self.working, user_id))
    }

    async fn set_current_org(&mut self, user_id: UserId, org_id: Option<OrgId>) -> StoreResult<()> {
        self.store.check(tables::USER).await?;
        set_current_org(&mut self.working, user_id, org_id);
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction { store, working, _guard } = *self;
        *store.committed.write().await = Arc::new(working);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

// ============================================================================
// Row views
// ============================================================================

struct MembershipRow<'a>(&'a Membership);

impl Row for MembershipRow<'_> {
    fn value(&self, column: Column) -> Option<Value> {
        if column.table != tables::ORG_USER {
            return None;
        }
        match column.name {
            "org_id" => Some(Value::Int(self.0.org_id)),
            "user_id" => Some(Value::Int(self.0.user_id)),
            "role" => Some(Value::from(self.0.role.as_str())),
            _ => None,
        }
    }
}

struct UserRow<'a>(&'a User);

impl Row for UserRow<'_> {
    fn value(&self, column: Column) -> Option<Value> {
        if column.table != tables::USER {
            return None;
        }
        let user = self.0;
        match column.name {
            "id" => Some(Value::Int(user.id)),
            "email" => Some(Value::from(user.email.as_str())),
            "name" => Some(Value::from(user.name.as_str())),
            "login" => Some(Value::from(user.login.as_str())),
            "is_service_account" => Some(Value::Bool(user.is_service_account)),
            "org_id" => user.current_org_id.map(Value::Int),
            _ => None,
        }
    }
}

struct MemberRow<'a> {
    membership: &'a Membership,
    user: &'a User,
}

impl Row for MemberRow<'_> {
    fn value(&self, column: Column) -> Option<Value> {
        MembershipRow(self.membership)
            .value(column)
            .or_else(|| UserRow(self.user).value(column))
    }
}

struct OrgRow<'a>(&'a Organization);

impl Row for OrgRow<'_> {
    fn value(&self, column: Column) -> Option<Value> {
        if column.table != tables::ORG {
            return None;
        }
        match column.name {
            "id" => Some(Value::Int(self.0.id)),
            "name" => Some(Value::from(self.0.name.as_str())),
            _ => None,
        }
    }
}

struct DependentView<'a> {
    table: &'a str,
    row: &'a DependentRow,
}

impl Row for DependentView<'_> {
    fn value(&self, column: Column) -> Option<Value> {
        if column.table != self.table {
            return None;
        }
        match column.name {
            "org_id" => Some(Value::Int(self.row.org_id)),
            "user_id" => Some(Value::Int(self.row.user_id)),
            "item_id" => Some(Value::Int(self.row.item_id)),
            _ => None,
        }
    }
}

// ============================================================================
// Table operations
// ============================================================================

fn members<'a>(db: &'a Tables, filter: &'a Predicate) -> impl Iterator<Item = MemberRow<'a>> {
    db.org_users.values().filter_map(move |membership| {
        let user = db.users.get(&membership.user_id)?;
        let row = MemberRow { membership, user };
        filter.matches(&row).then_some(row)
    })
}

fn find_org_users(db: &Tables, query: &MemberQuery) -> Vec<OrgUserDto> {
    let mut rows: Vec<MemberRow<'_>> = members(db, &query.filter).collect();
    rows.sort_by(|a, b| compare_rows(a, b, &query.order_by));

    let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
    let limit = query
        .limit
        .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

    rows.into_iter()
        .skip(offset)
        .take(limit)
        .map(|row| OrgUserDto {
            org_id: row.membership.org_id,
            user_id: row.user.id,
            email: row.user.email.clone(),
            name: row.user.name.clone(),
            login: row.user.login.clone(),
            role: row.membership.role,
            last_seen_at: row.user.last_seen_at,
            last_seen_at_age: String::new(),
            created: query.include_timestamps.then_some(row.user.created_at),
            updated: query.include_timestamps.then_some(row.user.updated_at),
        })
        .collect()
}

fn count_org_users(db: &Tables, filter: &Predicate) -> u64 {
    members(db, filter).count() as u64
}

fn get_user(db: &Tables, user_id: UserId, filter: &Predicate) -> Option<User> {
    db.users
        .get(&user_id)
        .filter(|user| filter.matches(&UserRow(user)))
        .cloned()
}

fn count(db: &Tables, table: &str, filter: &Predicate) -> u64 {
    let matched = match table {
        tables::ORG_USER => db
            .org_users
            .values()
            .filter(|m| filter.matches(&MembershipRow(m)))
            .count(),
        tables::USER => db
            .users
            .values()
            .filter(|u| filter.matches(&UserRow(u)))
            .count(),
        tables::ORG => db
            .orgs
            .values()
            .filter(|o| filter.matches(&OrgRow(o)))
            .count(),
        _ => db.dependents.get(table).map_or(0, |rows| {
            rows.iter()
                .filter(|row| filter.matches(&DependentView { table, row }))
                .count()
        }),
    };
    matched as u64
}

fn delete(db: &mut Tables, table: &str, filter: &Predicate) -> u64 {
    let before = count(db, table, filter);
    match table {
        tables::ORG_USER => db
            .org_users
            .retain(|_, m| !filter.matches(&MembershipRow(m))),
        tables::USER => db.users.retain(|_, u| !filter.matches(&UserRow(u))),
        tables::ORG => db.orgs.retain(|_, o| !filter.matches(&OrgRow(o))),
        _ => {
            if let Some(rows) = db.dependents.get_mut(table) {
                rows.retain(|row| !filter.matches(&DependentView { table, row }));
            }
        }
    }
    before
}

fn find_user_orgs(db: &Tables, user_id: UserId) -> Vec<UserOrgDto> {
    db.org_users
        .values()
        .filter(|m| m.user_id == user_id)
        .filter_map(|m| {
            let org = db.orgs.get(&m.org_id)?;
            Some(UserOrgDto {
                org_id: org.id,
                name: org.name.clone(),
                role: m.role,
            })
        })
        .collect()
}

fn set_current_org(db: &mut Tables, user_id: UserId, org_id: Option<OrgId>) {
    if let Some(user) = db.users.get_mut(&user_id) {
        user.switch_organization(org_id);
    }
}

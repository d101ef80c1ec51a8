//! Membership query building
//!
//! Member listings always look at `org_user` joined with `user`, restricted
//! to one organization and excluding service accounts. On top of that a
//! listing may narrow to one user, apply an access-control filter and match
//! free text against email, name or login. Results are ordered by email,
//! then login.

use serde::{Deserialize, Serialize};
use tenancy_org::{OrgId, UserId};
use tenancy_rbac::SignedInUser;

use crate::dialect::Dialect;
use crate::predicate::{columns, tables, Column, Predicate, SqlFragment};

/// Scope prefix for user resources in access-control scopes.
pub const USERS_SCOPE_PREFIX: &str = "users:id:";

/// Ordering of every member listing.
pub const MEMBER_ORDER: [Column; 2] = [columns::USER_EMAIL, columns::USER_LOGIN];

/// Query for [`list_members`](crate::service::OrgUserService::list_members).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetOrgUsersQuery {
    /// Organization to list
    pub org_id: OrgId,

    /// Restrict to one user; `None` or `0` lists everyone
    pub user_id: Option<UserId>,

    /// Free text matched against email, name or login
    pub query: Option<String>,

    /// Maximum number of rows, `None` or `0` for all
    pub limit: Option<u32>,

    /// Skip the access-control filter
    #[serde(default)]
    pub dont_enforce_access_control: bool,

    /// Actor the listing runs for
    pub actor: Option<SignedInUser>,
}

impl GetOrgUsersQuery {
    /// List every member of an organization on behalf of `actor`.
    pub fn new(org_id: OrgId, actor: SignedInUser) -> Self {
        Self {
            org_id,
            actor: Some(actor),
            ..Self::default()
        }
    }
}

/// Query for [`search_members`](crate::service::OrgUserService::search_members).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOrgUsersQuery {
    /// Organization to search
    pub org_id: OrgId,

    /// Free text matched against email, name or login
    pub query: Option<String>,

    /// 1-based page number
    pub page: u32,

    /// Page size, `0` for unpaged
    pub limit: u32,

    /// Actor the search runs for
    pub actor: Option<SignedInUser>,
}

/// Assembles the member filter one condition at a time.
///
/// # Example
///
/// ```
/// use tenancy_membership::query::MemberFilter;
/// use tenancy_membership::dialect::Dialect;
///
/// let filter = MemberFilter::new(5).user(Some(7)).text(Some("ann")).build();
/// let sql = filter.to_sql(Dialect::Sqlite);
///
/// assert_eq!(
///     sql.sql,
///     "(org_user.org_id = ? AND `user`.is_service_account = 0 AND org_user.user_id = ? \
///      AND (`user`.email LIKE ? OR `user`.name LIKE ? OR `user`.login LIKE ?))"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MemberFilter {
    conditions: Vec<Predicate>,
}

impl MemberFilter {
    /// Members of `org_id` that are not service accounts.
    pub fn new(org_id: OrgId) -> Self {
        Self {
            conditions: vec![
                Predicate::eq(columns::ORG_USER_ORG_ID, org_id),
                Predicate::eq(columns::USER_IS_SERVICE_ACCOUNT, false),
            ],
        }
    }

    /// Restrict to one user. `None` and `0` leave the filter unchanged.
    pub fn user(mut self, user_id: Option<UserId>) -> Self {
        if let Some(user_id) = user_id.filter(|id| *id != 0) {
            self.conditions
                .push(Predicate::eq(columns::ORG_USER_USER_ID, user_id));
        }
        self
    }

    /// Add an access-control filter.
    pub fn access(mut self, filter: Predicate) -> Self {
        self.conditions.push(filter);
        self
    }

    /// Match free text against email, name or login. Empty text adds
    /// nothing.
    pub fn text(mut self, query: Option<&str>) -> Self {
        if let Some(text) = query.filter(|q| !q.is_empty()) {
            self.conditions.push(Predicate::any([
                Predicate::contains(columns::USER_EMAIL, text),
                Predicate::contains(columns::USER_NAME, text),
                Predicate::contains(columns::USER_LOGIN, text),
            ]));
        }
        self
    }

    /// The conjunction of every condition added so far.
    pub fn build(self) -> Predicate {
        Predicate::all(self.conditions)
    }
}

/// A member listing: filter, ordering and window.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberQuery {
    /// Rows to return
    pub filter: Predicate,
    /// Sort columns, ascending
    pub order_by: Vec<Column>,
    /// Maximum rows, `None` for all
    pub limit: Option<u64>,
    /// Rows to skip
    pub offset: u64,
    /// Whether to fill the user's created/updated timestamps
    pub include_timestamps: bool,
}

impl MemberQuery {
    /// Unwindowed listing of `filter` in member order.
    pub fn new(filter: Predicate) -> Self {
        Self {
            filter,
            order_by: MEMBER_ORDER.to_vec(),
            limit: None,
            offset: 0,
            include_timestamps: true,
        }
    }

    /// Return at most `limit` rows. `0` means no limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    /// Skip `offset` rows.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Leave created/updated out of the rows.
    pub fn without_timestamps(mut self) -> Self {
        self.include_timestamps = false;
        self
    }

    /// Render the `SELECT` statement for a SQL backend.
    pub fn to_sql(&self, dialect: Dialect) -> SqlFragment {
        let mut selected = vec![
            columns::ORG_USER_ORG_ID,
            columns::ORG_USER_USER_ID,
            columns::USER_EMAIL,
            columns::USER_NAME,
            columns::USER_LOGIN,
            columns::ORG_USER_ROLE,
            columns::USER_LAST_SEEN_AT,
        ];
        if self.include_timestamps {
            selected.extend([columns::USER_CREATED, columns::USER_UPDATED]);
        }
        let selected: Vec<String> = selected.into_iter().map(|c| dialect.column(c)).collect();
        let order: Vec<String> = self
            .order_by
            .iter()
            .map(|c| format!("{} ASC", dialect.column(*c)))
            .collect();

        let condition = self.filter.to_sql(dialect);
        let mut sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {}",
            selected.join(", "),
            member_join(dialect),
            condition.sql,
            order.join(", ")
        );
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit} OFFSET {}", self.offset));
        }

        SqlFragment {
            sql,
            args: condition.args,
        }
    }
}

/// Render the `COUNT` statement matching `filter`, for a SQL backend.
pub fn count_sql(filter: &Predicate, dialect: Dialect) -> SqlFragment {
    let condition = filter.to_sql(dialect);
    SqlFragment {
        sql: format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            member_join(dialect),
            condition.sql
        ),
        args: condition.args,
    }
}

fn member_join(dialect: Dialect) -> String {
    format!(
        "{} INNER JOIN {} ON {} = {}",
        tables::ORG_USER,
        dialect.quote(tables::USER),
        dialect.column(columns::ORG_USER_USER_ID),
        dialect.column(columns::USER_ID)
    )
}

/// Translate a 1-based page and page size into (limit, offset).
///
/// A page size of `0` means unpaged. Pages below 1 are treated as 1. The
/// offset always follows the requested page size; only the number of rows
/// returned is capped at `max_page_size`.
///
/// # Examples
///
/// ```
/// use tenancy_membership::query::page_window;
///
/// assert_eq!(page_window(2, 10, 1000), (10, 10));
/// assert_eq!(page_window(0, 10, 1000), (10, 0));
/// assert_eq!(page_window(3, 0, 1000), (0, 0));
/// assert_eq!(page_window(2, 2000, 1000), (1000, 2000));
/// ```
pub fn page_window(page: u32, per_page: u32, max_page_size: u32) -> (u64, u64) {
    if per_page == 0 {
        return (0, 0);
    }
    let requested = u64::from(per_page);
    let page = u64::from(page.max(1));
    (requested.min(u64::from(max_page_size)), requested * (page - 1))
}

//! Structured row predicates
//!
//! Filters are composed as a tree of [`Predicate`]s instead of SQL strings.
//! A predicate can be evaluated directly against a [`Row`] (the in-memory
//! store does this) or rendered to parameterized SQL for a
//! [`Dialect`](crate::dialect::Dialect).

use std::cmp::Ordering;
use std::fmt;

use crate::dialect::Dialect;

/// A table-qualified column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    /// Table (relation) name
    pub table: &'static str,
    /// Column name
    pub name: &'static str,
}

impl Column {
    /// Create a column reference.
    pub const fn new(table: &'static str, name: &'static str) -> Self {
        Self { table, name }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}

/// Relation names touched by the membership core.
pub mod tables {
    /// Organization memberships
    pub const ORG_USER: &str = "org_user";
    /// User accounts
    pub const USER: &str = "user";
    /// Organizations
    pub const ORG: &str = "org";
    /// Per-user dashboard permission entries
    pub const DASHBOARD_ACL: &str = "dashboard_acl";
    /// Team memberships
    pub const TEAM_MEMBER: &str = "team_member";
    /// Starred saved queries
    pub const QUERY_HISTORY_STAR: &str = "query_history_star";
}

/// Columns referenced by the membership queries.
pub mod columns {
    use super::{tables, Column};

    pub const ORG_USER_ORG_ID: Column = Column::new(tables::ORG_USER, "org_id");
    pub const ORG_USER_USER_ID: Column = Column::new(tables::ORG_USER, "user_id");
    pub const ORG_USER_ROLE: Column = Column::new(tables::ORG_USER, "role");

    pub const USER_ID: Column = Column::new(tables::USER, "id");
    pub const USER_EMAIL: Column = Column::new(tables::USER, "email");
    pub const USER_NAME: Column = Column::new(tables::USER, "name");
    pub const USER_LOGIN: Column = Column::new(tables::USER, "login");
    pub const USER_IS_SERVICE_ACCOUNT: Column = Column::new(tables::USER, "is_service_account");
    pub const USER_LAST_SEEN_AT: Column = Column::new(tables::USER, "last_seen_at");
    pub const USER_CREATED: Column = Column::new(tables::USER, "created");
    pub const USER_UPDATED: Column = Column::new(tables::USER, "updated");

    pub const ORG_ID: Column = Column::new(tables::ORG, "id");

    /// `org_id` column of a dependent relation.
    pub const fn org_id_of(table: &'static str) -> Column {
        Column::new(table, "org_id")
    }

    /// `user_id` column of a dependent relation.
    pub const fn user_id_of(table: &'static str) -> Column {
        Column::new(table, "user_id")
    }
}

/// A bound value.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Anything a predicate can be evaluated against.
pub trait Row {
    /// Value of `column`, or `None` when the row has no such column or the
    /// value is NULL.
    fn value(&self, column: Column) -> Option<Value>;
}

/// A boolean filter over rows.
///
/// # Example
///
/// ```
/// use tenancy_membership::predicate::{columns, Predicate};
///
/// let filter = Predicate::eq(columns::ORG_USER_ORG_ID, 5)
///     .and(Predicate::any([
///         Predicate::contains(columns::USER_EMAIL, "ann"),
///         Predicate::contains(columns::USER_LOGIN, "ann"),
///     ]));
/// assert!(matches!(filter, Predicate::And(ref parts) if parts.len() == 2));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Constant true or false
    Literal(bool),
    /// `column = value`
    Eq(Column, Value),
    /// `column IN (values)`; an empty list matches nothing
    In(Column, Vec<Value>),
    /// Case-insensitive pattern match with `%` and `_` wildcards
    Like(Column, String),
    /// Every part holds; empty is true
    And(Vec<Predicate>),
    /// Some part holds; empty is false
    Or(Vec<Predicate>),
    /// Negation
    Not(Box<Predicate>),
}

impl Predicate {
    /// Predicate matching every row.
    pub fn always() -> Self {
        Predicate::Literal(true)
    }

    /// Predicate matching no row.
    pub fn never() -> Self {
        Predicate::Literal(false)
    }

    /// `column = value`
    pub fn eq(column: Column, value: impl Into<Value>) -> Self {
        Predicate::Eq(column, value.into())
    }

    /// `column IN (values)`
    pub fn in_list<V: Into<Value>>(column: Column, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In(column, values.into_iter().map(Into::into).collect())
    }

    /// Case-insensitive substring match, i.e. `LIKE '%text%'`.
    pub fn contains(column: Column, text: &str) -> Self {
        Predicate::Like(column, format!("%{text}%"))
    }

    /// Conjunction of all parts.
    pub fn all(parts: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(parts.into_iter().collect())
    }

    /// Disjunction of all parts.
    pub fn any(parts: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(parts.into_iter().collect())
    }

    /// Negate this predicate.
    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Conjoin with another predicate, flattening nested conjunctions.
    pub fn and(self, other: Predicate) -> Self {
        let mut parts = match self {
            Predicate::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Predicate::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Predicate::And(parts)
    }

    /// Evaluate against a row.
    pub fn matches(&self, row: &dyn Row) -> bool {
        match self {
            Predicate::Literal(b) => *b,
            Predicate::Eq(column, value) => row.value(*column).as_ref() == Some(value),
            Predicate::In(column, values) => row
                .value(*column)
                .is_some_and(|v| values.contains(&v)),
            Predicate::Like(column, pattern) => match row.value(*column) {
                Some(Value::Text(text)) => like_matches(pattern, &text),
                _ => false,
            },
            Predicate::And(parts) => parts.iter().all(|p| p.matches(row)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(row)),
            Predicate::Not(inner) => !inner.matches(row),
        }
    }

    /// Render as a parameterized SQL condition using `?` placeholders.
    ///
    /// # Example
    ///
    /// ```
    /// use tenancy_membership::dialect::Dialect;
    /// use tenancy_membership::predicate::{columns, Predicate, Value};
    ///
    /// let filter = Predicate::eq(columns::ORG_USER_ORG_ID, 5)
    ///     .and(Predicate::eq(columns::USER_IS_SERVICE_ACCOUNT, false));
    /// let sql = filter.to_sql(Dialect::Postgres);
    ///
    /// assert_eq!(sql.sql, r#"(org_user.org_id = ? AND "user".is_service_account = false)"#);
    /// assert_eq!(sql.args, vec![Value::Int(5)]);
    /// ```
    pub fn to_sql(&self, dialect: Dialect) -> SqlFragment {
        let mut args = Vec::new();
        let sql = self.render(dialect, &mut args);
        SqlFragment { sql, args }
    }

    fn render(&self, dialect: Dialect, args: &mut Vec<Value>) -> String {
        match self {
            Predicate::Literal(true) => "1 = 1".to_string(),
            Predicate::Literal(false) => "1 = 0".to_string(),
            Predicate::Eq(column, Value::Bool(b)) => {
                format!("{} = {}", dialect.column(*column), dialect.boolean_str(*b))
            }
            Predicate::Eq(column, value) => {
                args.push(value.clone());
                format!("{} = ?", dialect.column(*column))
            }
            Predicate::In(_, values) if values.is_empty() => "1 = 0".to_string(),
            Predicate::In(column, values) => {
                args.extend(values.iter().cloned());
                let placeholders = vec!["?"; values.len()].join(", ");
                format!("{} IN ({})", dialect.column(*column), placeholders)
            }
            Predicate::Like(column, pattern) => {
                args.push(Value::Text(pattern.clone()));
                format!("{} {} ?", dialect.column(*column), dialect.like_str())
            }
            Predicate::And(parts) => join_parts(parts, " AND ", "1 = 1", dialect, args),
            Predicate::Or(parts) => join_parts(parts, " OR ", "1 = 0", dialect, args),
            Predicate::Not(inner) => format!("NOT ({})", inner.render(dialect, args)),
        }
    }
}

fn join_parts(
    parts: &[Predicate],
    separator: &str,
    empty: &str,
    dialect: Dialect,
    args: &mut Vec<Value>,
) -> String {
    if parts.is_empty() {
        return empty.to_string();
    }
    let rendered: Vec<String> = parts.iter().map(|p| p.render(dialect, args)).collect();
    format!("({})", rendered.join(separator))
}

/// A SQL condition with its bound arguments, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Compare two rows on the given columns, in order. Missing values sort
/// first.
pub fn compare_rows(a: &dyn Row, b: &dyn Row, order_by: &[Column]) -> Ordering {
    for column in order_by {
        let ordering = a
            .value(*column)
            .partial_cmp(&b.value(*column))
            .unwrap_or(Ordering::Equal);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Case-insensitive SQL `LIKE` matching. `%` matches any run of
/// characters, `_` exactly one.
pub fn like_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();

    // matched[j]: pattern[..i] matches text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;

    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= matched[j];
                    next[j] = seen;
                }
            }
            '_' => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1];
                }
            }
            c => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && text[j - 1] == *c;
                }
            }
        }
        matched = next;
    }

    matched[text.len()]
}

//! SQL dialect differences
//!
//! Only what the membership queries need: identifier quoting, boolean
//! literals and the case-insensitive `LIKE` operator.

use serde::{Deserialize, Serialize};

use crate::predicate::Column;

/// Identifiers that have to be quoted when used as table names.
const RESERVED: &[&str] = &["user", "order", "group"];

/// SQL dialect of the backing store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// SQLite 3
    #[default]
    Sqlite,
    /// PostgreSQL
    Postgres,
    /// MySQL / MariaDB
    Mysql,
}

impl Dialect {
    /// Parse a dialect name (case-insensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use tenancy_membership::dialect::Dialect;
    ///
    /// assert_eq!(Dialect::parse("postgres"), Some(Dialect::Postgres));
    /// assert_eq!(Dialect::parse("sqlite3"), Some(Dialect::Sqlite));
    /// assert_eq!(Dialect::parse("oracle"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "postgres" | "postgresql" => Some(Self::Postgres),
            "mysql" | "mariadb" => Some(Self::Mysql),
            _ => None,
        }
    }

    /// Quote an identifier.
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Self::Postgres => format!("\"{ident}\""),
            Self::Sqlite | Self::Mysql => format!("`{ident}`"),
        }
    }

    /// Quote an identifier only when it is a reserved word.
    pub fn quote_if_reserved(&self, ident: &str) -> String {
        if RESERVED.contains(&ident) {
            self.quote(ident)
        } else {
            ident.to_string()
        }
    }

    /// Render a table-qualified column.
    pub fn column(&self, column: Column) -> String {
        format!("{}.{}", self.quote_if_reserved(column.table), column.name)
    }

    /// Boolean literal.
    pub fn boolean_str(&self, value: bool) -> &'static str {
        match (self, value) {
            (Self::Postgres, true) => "true",
            (Self::Postgres, false) => "false",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    /// Case-insensitive pattern match operator.
    pub fn like_str(&self) -> &'static str {
        match self {
            Self::Postgres => "ILIKE",
            Self::Sqlite | Self::Mysql => "LIKE",
        }
    }
}

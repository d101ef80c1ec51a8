//! Membership configuration.
//!
//! Configuration is loaded from environment variables with defaults that
//! enforce access control and protect the last admin of an organization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dialect::Dialect;

/// Default cap on the page size of member searches.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1000;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Configuration of the membership service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipConfig {
    /// Skip access-control filters on every listing.
    pub access_control_disabled: bool,

    /// Allow removing the last admin when nobody else is left in the
    /// organization.
    pub allow_emptying_organization: bool,

    /// SQL dialect used when rendering queries.
    pub dialect: Dialect,

    /// Most rows a search page returns. Larger requests keep their offset.
    pub max_page_size: u32,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            access_control_disabled: false,
            allow_emptying_organization: false,
            dialect: Dialect::default(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl MembershipConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TENANCY_ACCESS_CONTROL_DISABLED`: Skip access filters (default: false)
    /// - `TENANCY_ALLOW_EMPTYING_ORGANIZATION`: Allow removing the sole remaining
    ///   admin (default: false)
    /// - `TENANCY_SQL_DIALECT`: `sqlite`, `postgres` or `mysql` (default: sqlite)
    /// - `TENANCY_MAX_PAGE_SIZE`: Search page size cap (default: 1000)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unknown dialect or an
    /// invalid page size cap.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let default = Self::default();

        let dialect = match lookup("TENANCY_SQL_DIALECT") {
            Some(value) => Dialect::parse(&value).ok_or_else(|| ConfigError::InvalidValue {
                key: "TENANCY_SQL_DIALECT".to_string(),
                message: format!("unknown dialect '{value}'"),
            })?,
            None => default.dialect,
        };

        let max_page_size = match lookup("TENANCY_MAX_PAGE_SIZE") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "TENANCY_MAX_PAGE_SIZE".to_string(),
                message: format!("'{value}' is not a page size"),
            })?,
            None => default.max_page_size,
        };

        let config = Self {
            access_control_disabled: lookup("TENANCY_ACCESS_CONTROL_DISABLED")
                .map(|s| flag(&s))
                .unwrap_or(default.access_control_disabled),
            allow_emptying_organization: lookup("TENANCY_ALLOW_EMPTYING_ORGANIZATION")
                .map(|s| flag(&s))
                .unwrap_or(default.allow_emptying_organization),
            dialect,
            max_page_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the service cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_page_size".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

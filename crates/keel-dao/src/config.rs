//! Accessor configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings applied when an accessor is created.
///
/// Every field has a default, so hosts can deserialize a partial document:
///
/// ```
/// use keel_dao::AccessorConfig;
///
/// let config: AccessorConfig = serde_json::from_str(r#"{"sql_root": "sql"}"#).unwrap();
/// assert!(config.database_enabled);
/// assert_eq!(config.sql_root.as_deref(), Some(std::path::Path::new("sql")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessorConfig {
    /// When false, every terminal operation fails before reaching the driver.
    pub database_enabled: bool,
    /// Log rendered statements at INFO instead of DEBUG.
    pub debug_sql: bool,
    /// Directory holding named `.sql` resources.
    pub sql_root: Option<PathBuf>,
    /// Database selected when the accessor is connected.
    pub default_database: Option<String>,
}

impl Default for AccessorConfig {
    fn default() -> Self {
        Self {
            database_enabled: true,
            debug_sql: false,
            sql_root: None,
            default_database: None,
        }
    }
}

impl AccessorConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables database access.
    #[must_use]
    pub fn database_enabled(mut self, enabled: bool) -> Self {
        self.database_enabled = enabled;
        self
    }

    /// Logs rendered statements at INFO.
    #[must_use]
    pub fn debug_sql(mut self, enabled: bool) -> Self {
        self.debug_sql = enabled;
        self
    }

    /// Sets the SQL resource directory.
    #[must_use]
    pub fn sql_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sql_root = Some(root.into());
        self
    }

    /// Sets the database selected on connect.
    #[must_use]
    pub fn default_database(mut self, name: impl Into<String>) -> Self {
        self.default_database = Some(name.into());
        self
    }
}

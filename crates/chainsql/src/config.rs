//! Builder configuration.

use serde::Deserialize;

use crate::dialect::Dialect;
use crate::error::OrmResult;

/// Configuration shared by every chain started from a [`Db`](crate::Db).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Prepended to every table identifier.
    pub table_prefix: String,
    /// SQL dialect used by the fragment compiler and the alter sub-engine.
    /// `None` lets the client decide.
    pub dialect: Option<Dialect>,
    /// Whether SELECT results are cached for the lifetime of the `Db`.
    pub cache_enabled: bool,
}

impl DbConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the environment.
    ///
    /// - `CHAINSQL_TABLE_PREFIX`: table prefix (default empty)
    /// - `CHAINSQL_DIALECT`: `mysql` or `postgres` (default: the client's own)
    /// - `CHAINSQL_CACHE`: `1`, `true` or `on` enables the result cache
    pub fn from_env() -> OrmResult<Self> {
        let mut config = Self::default();
        if let Ok(prefix) = std::env::var("CHAINSQL_TABLE_PREFIX") {
            config.table_prefix = prefix;
        }
        if let Ok(dialect) = std::env::var("CHAINSQL_DIALECT") {
            config.dialect = Some(dialect.parse()?);
        }
        if let Ok(cache) = std::env::var("CHAINSQL_CACHE") {
            config.cache_enabled = matches!(
                cache.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "on"
            );
        }
        Ok(config)
    }

    /// Set the table prefix.
    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Set the SQL dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Enable the SELECT result cache.
    pub fn with_cache(mut self) -> Self {
        self.cache_enabled = true;
        self
    }

    /// Disable the SELECT result cache.
    pub fn no_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_setters() {
        let config = DbConfig::new()
            .table_prefix("app_")
            .dialect(Dialect::Postgres)
            .with_cache();
        assert_eq!(config.table_prefix, "app_");
        assert_eq!(config.dialect, Some(Dialect::Postgres));
        assert!(config.cache_enabled);
        assert!(!config.no_cache().cache_enabled);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: DbConfig = serde_json::from_str(r#"{"dialect": "postgresql"}"#).unwrap();
        assert_eq!(config.dialect, Some(Dialect::Postgres));
        assert_eq!(config.table_prefix, "");
        assert!(!config.cache_enabled);

        let config: DbConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.dialect, None);
    }
}

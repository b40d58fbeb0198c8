///
/// # Connection Configuration
///
/// `SqliteConfig` describes how a `SqliteSession` opens its database. It is
/// usually read from a TOML file; every field has a default, so an empty
/// file opens a private in-memory database.
///
/// ## Example
///
/// ```toml
/// path = "data/app.db"
/// read_only = true
/// busy_timeout_ms = 2000
///
/// [pragmas]
/// foreign_keys = "ON"
/// cache_size = "-8000"
/// ```
///
/// Pragmas run in file order right after the connection opens. Names must be
/// plain identifiers; values are passed through unquoted.
///

use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::SqliteFault;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub path: Option<PathBuf>,
    pub read_only: bool,
    pub create_if_missing: bool,
    pub busy_timeout_ms: u64,
    pub pragmas: IndexMap<String, String>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: None,
            read_only: false,
            create_if_missing: true,
            busy_timeout_ms: 5000,
            pragmas: IndexMap::new(),
        }
    }
}

impl SqliteConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SqliteFault> {
        let config: SqliteConfig =
            toml::from_str(content).map_err(|e| SqliteFault::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, SqliteFault> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), SqliteFault> {
        if self.read_only && self.path.is_none() {
            return Err(SqliteFault::InvalidConfig(
                "read_only requires a database path".to_string(),
            ));
        }
        for (name, value) in &self.pragmas {
            let valid = !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(SqliteFault::InvalidConfig(format!(
                    "invalid pragma name '{}'",
                    name
                )));
            }
            if !is_pragma_value(value) {
                return Err(SqliteFault::InvalidConfig(format!(
                    "invalid value '{}' for pragma '{}'",
                    value, name
                )));
            }
        }
        Ok(())
    }

    pub fn open_flags(&self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.read_only {
            base | OpenFlags::SQLITE_OPEN_READ_ONLY
        } else if self.create_if_missing {
            base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        } else {
            base | OpenFlags::SQLITE_OPEN_READ_WRITE
        }
    }

    pub fn connect(&self) -> Result<Connection, SqliteFault> {
        self.validate()?;
        let conn = match &self.path {
            Some(path) => Connection::open_with_flags(path, self.open_flags())?,
            None => Connection::open_in_memory_with_flags(self.open_flags())?,
        };
        conn.busy_timeout(Duration::from_millis(self.busy_timeout_ms))?;
        for (name, value) in &self.pragmas {
            conn.pragma_update(None, name, value)?;
        }
        debug!(
            path = ?self.path,
            read_only = self.read_only,
            pragmas = self.pragmas.len(),
            "sqlite connection opened"
        );
        Ok(conn)
    }
}

/// A keyword or a signed number. Anything else could smuggle SQL.
fn is_pragma_value(value: &str) -> bool {
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    let keyword = !value.is_empty()
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    let number = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.');
    keyword || number
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_in_memory_default() {
        let config = SqliteConfig::from_toml_str("").unwrap();
        assert_eq!(config, SqliteConfig::in_memory());
        assert!(config.path.is_none());
        assert!(config.create_if_missing);
        assert_eq!(config.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_parse_full_config() {
        let config = SqliteConfig::from_toml_str(
            r#"
path = "data/app.db"
read_only = true
busy_timeout_ms = 250

[pragmas]
foreign_keys = "ON"
cache_size = "-8000"
"#,
        )
        .unwrap();

        assert_eq!(config.path, Some(PathBuf::from("data/app.db")));
        assert!(config.read_only);
        assert_eq!(config.busy_timeout_ms, 250);
        let names: Vec<&str> = config.pragmas.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["foreign_keys", "cache_size"], "Pragmas keep file order");
        assert!(config.open_flags().contains(OpenFlags::SQLITE_OPEN_READ_ONLY));
    }

    #[test]
    fn test_read_only_memory_rejected() {
        let err = SqliteConfig::from_toml_str("read_only = true").unwrap_err();
        assert!(err.to_string().contains("read_only requires"));
    }

    #[test]
    fn test_pragma_name_must_be_identifier() {
        let err = SqliteConfig::from_toml_str(
            r#"
[pragmas]
"foreign_keys; DROP TABLE t" = "ON"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid pragma name"));
    }

    #[test]
    fn test_pragma_value_must_be_keyword_or_number() {
        let err = SqliteConfig::from_toml_str(
            r#"
[pragmas]
foreign_keys = "ON; DROP TABLE victim"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid value"), "Got: {}", err);

        let mut config = SqliteConfig::in_memory();
        config.pragmas.insert("user_version".to_string(), "1; DROP TABLE victim".to_string());
        assert!(config.connect().is_err(), "connect must validate too");

        assert!(is_pragma_value("WAL"));
        assert!(is_pragma_value("-8000"));
        assert!(is_pragma_value("+1.5"));
        assert!(!is_pragma_value(""));
        assert!(!is_pragma_value("-"));
        assert!(!is_pragma_value("'x'"));
    }

    #[test]
    fn test_connect_applies_numeric_pragma() {
        let mut config = SqliteConfig::in_memory();
        config.pragmas.insert("user_version".to_string(), "7".to_string());
        let conn = config.connect().unwrap();
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 7);
    }

    #[test]
    fn test_unknown_field_type_is_invalid_config() {
        let err = SqliteConfig::from_toml_str("busy_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, SqliteFault::InvalidConfig(_)));
    }

    #[test]
    fn test_connect_applies_pragmas() {
        let mut config = SqliteConfig::in_memory();
        config.pragmas.insert("foreign_keys".to_string(), "ON".to_string());
        let conn = config.connect().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}

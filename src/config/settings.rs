//! Application settings loaded from `config.toml`.
//!
//! Every key is optional. A missing file yields the defaults, so a fresh
//! checkout runs without any configuration at all.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database URL; `DATABASE_URL` in the environment takes precedence
    pub database_url: Option<String>,
    /// Recompute every ledger on startup when stored balances have drifted
    pub repair_on_start: bool,
    /// Built-in categories seeded on first start
    pub categories: Vec<CategoryConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            repair_on_start: true,
            categories: default_categories(),
        }
    }
}

/// Configuration for a single default category
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CategoryConfig {
    /// Display name of the category
    pub name: String,
    /// Hex color
    #[serde(default = "default_color")]
    pub color: String,
}

impl CategoryConfig {
    fn new(name: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
        }
    }
}

/// Color given to categories created without one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#6366f1";

fn default_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_string()
}

/// The categories every new installation starts with.
#[must_use]
pub fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig::new("Grocery", "#10b981"),
        CategoryConfig::new("Electricity", "#f59e0b"),
        CategoryConfig::new("Rent", "#3b82f6"),
        CategoryConfig::new("Salary", "#8b5cf6"),
        CategoryConfig::new("Transport", "#ec4899"),
        CategoryConfig::new("Maintenance", "#14b8a6"),
        CategoryConfig::new("Stock Purchase", "#6366f1"),
        CategoryConfig::new("Personal Expense", "#ef4444"),
    ]
}

/// Loads the configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No config file at {:?}, using defaults", path);
        return Ok(AppConfig::default());
    }

    debug!("Loading configuration from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path:?}: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {path:?}: {e}"),
    })
}

/// Loads the configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<AppConfig> {
    load_config("config.toml")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r##"
            database_url = "sqlite::memory:"
            repair_on_start = false

            [[categories]]
            name = "Fuel"
            color = "#000000"

            [[categories]]
            name = "Tea"
        "##;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert!(!config.repair_on_start);
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[0], CategoryConfig::new("Fuel", "#000000"));
        assert_eq!(config.categories[1].color, DEFAULT_CATEGORY_COLOR);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.database_url.is_none());
        assert!(config.repair_on_start);
        assert_eq!(config.categories, default_categories());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config("does/not/exist.toml").unwrap();
        assert_eq!(config.categories.len(), 8);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let path = std::env::temp_dir().join("khata_ledger_invalid_config.toml");
        std::fs::write(&path, "repair_on_start = \"sometimes\"").unwrap();
        let result = load_config(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}

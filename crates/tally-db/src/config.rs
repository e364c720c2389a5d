//! # Tally Configuration
//!
//! Configuration for the storage layer and the pricing policy of new carts.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DATABASE_PATH=/var/lib/tally/carts.db                        │
//! │     TALLY_MAX_CONNECTIONS=8                                            │
//! │     TALLY_TAX_MODE=inclusive                                           │
//! │                                                                         │
//! │  2. TOML Config File (path given by the caller)                        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     tally.db, 5 connections, tax-exclusive pricing, no rates           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "tally.db"
//! max_connections = 5
//!
//! [pricing]
//! tax_mode = "exclusive"  # exclusive | inclusive
//!
//! [tax.rates]             # class = basis points
//! standard = 2000
//! reduced = 500
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use tally_core::{RateTable, TaxMode, TaxRate};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("tally.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// `[pricing]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Whether catalog prices already include tax.
    #[serde(default, deserialize_with = "deserialize_tax_mode")]
    pub tax_mode: TaxMode,
}

/// Accepts every spelling `TaxMode::from_str` does, not just the
/// serialized one.
fn deserialize_tax_mode<'de, D>(deserializer: D) -> Result<TaxMode, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// `[tax]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSettings {
    /// Tax class → rate in basis points.
    #[serde(default)]
    pub rates: BTreeMap<String, u32>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub tax: TaxSettings,
}

impl TallyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from the given file (if it exists), applies
    /// environment overrides and validates the result.
    pub fn load(config_path: Option<&Path>) -> DbResult<Self> {
        let mut config = match config_path {
            Some(path) if path.exists() => {
                info!(?path, "Loading config from file");
                Self::from_file(path)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Like [`TallyConfig::load`], falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<&Path>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML file without overrides or validation.
    pub fn from_file(path: &Path) -> DbResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DbError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    /// Parses TOML text without overrides or validation.
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        toml::from_str(contents).map_err(|e| DbError::config(e.to_string()))
    }

    pub fn to_toml(&self) -> DbResult<String> {
        toml::to_string_pretty(self).map_err(|e| DbError::config(e.to_string()))
    }

    /// Checks value ranges.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::config("database.path must not be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::config(
                "database.max_connections must be greater than 0",
            ));
        }

        for (class, bps) in &self.tax.rates {
            if class.trim().is_empty() {
                return Err(DbError::config("tax class names must not be empty"));
            }
            if *bps > 10_000 {
                return Err(DbError::config(format!(
                    "tax rate for '{class}' must be at most 10000 bps, got {bps}"
                )));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key → value source.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TALLY_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("TALLY_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring non-numeric TALLY_MAX_CONNECTIONS"),
            }
        }

        if let Some(mode) = lookup("TALLY_TAX_MODE") {
            match mode.parse::<TaxMode>() {
                Ok(parsed) => {
                    debug!(mode = %parsed, "Overriding tax mode from environment");
                    self.pricing.tax_mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown tax mode in environment"),
            }
        }
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn tax_mode(&self) -> TaxMode {
        self.pricing.tax_mode
    }

    /// Builds the rate table for the configured pricing mode.
    pub fn rate_table(&self) -> DbResult<RateTable> {
        let mut table = RateTable::new(self.pricing.tax_mode);
        for (class, bps) in &self.tax.rates {
            table
                .set_rate(class.as_str(), TaxRate::from_bps(*bps))
                .map_err(|e| DbError::config(e.to_string()))?;
        }
        Ok(table)
    }

    /// Builds the pool configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tally_core::{Money, ProductId, ProductSnapshot, TaxClassId, TaxLookup};

    const SAMPLE: &str = r#"
[database]
path = "/var/lib/tally/carts.db"
max_connections = 8

[pricing]
tax_mode = "Included"

[tax.rates]
standard = 2000
reduced = 500
"#;

    #[test]
    fn test_default_config() {
        let config = TallyConfig::default();
        assert_eq!(config.database.path, PathBuf::from("tally.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.tax_mode(), TaxMode::Exclusive);
        assert!(config.tax.rates.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = TallyConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/var/lib/tally/carts.db"));
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.tax_mode(), TaxMode::Inclusive);
        assert_eq!(config.tax.rates.get("standard"), Some(&2000));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = TallyConfig::from_toml("[pricing]\ntax_mode = \"inclusive\"\n").unwrap();
        assert_eq!(config.database, DatabaseSettings::default());
        assert_eq!(config.tax_mode(), TaxMode::Inclusive);
    }

    #[test]
    fn test_rejects_unknown_tax_mode() {
        let err = TallyConfig::from_toml("[pricing]\ntax_mode = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = TallyConfig::from_toml(SAMPLE).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(TallyConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_validation() {
        let mut config = TallyConfig::default();

        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 1;
        config.tax.rates.insert("silly".to_string(), 10_001);
        assert!(config.validate().is_err());

        config.tax.rates.insert("silly".to_string(), 10_000);
        assert!(config.validate().is_ok());

        config.database.path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_DATABASE_PATH", "/tmp/override.db"),
            ("TALLY_MAX_CONNECTIONS", "not-a-number"),
            ("TALLY_TAX_MODE", "inclusive"),
        ]
        .into_iter()
        .collect();

        let mut config = TallyConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/override.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.tax_mode(), TaxMode::Inclusive);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = TallyConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database.max_connections, 8);

        let broken = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(broken.path(), "[database\npath = ").unwrap();
        assert!(matches!(
            TallyConfig::from_file(broken.path()),
            Err(DbError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TallyConfig::load_or_default(Some(dir.path().join("absent.toml").as_path()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rate_table_and_db_config() {
        let config = TallyConfig::from_toml(SAMPLE).unwrap();

        let table = config.rate_table().unwrap();
        assert_eq!(table.basis(), TaxMode::Inclusive);
        assert_eq!(table.rate(&TaxClassId::new("reduced")), Some(TaxRate::from_bps(500)));

        let gross = ProductSnapshot::purchasable(ProductId::new(1), "Lamp", Money::from_cents(1200))
            .with_tax_class("standard");
        assert_eq!(table.unit_tax(&gross), Money::from_cents(200));

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/var/lib/tally/carts.db"));
        assert_eq!(db.max_connections, 8);
    }
}

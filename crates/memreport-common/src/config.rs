//! Memreport Configuration

use crate::profile::SizingProfile;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rows read per column when sampling value lengths
pub const DEFAULT_SAMPLE_SIZE: u64 = 500_000;

/// Table filter value that selects every table
pub const ALL_TABLES: &str = "ALL";

/// Rendering of a finished report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Toml,
}

/// What to do when a single table cannot be estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Record the failure and continue with the next table
    #[default]
    Skip,
    /// Stop the run at the first failed table
    Abort,
}

/// Declared lengths for sources whose schema carries none (CSV, Parquet)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthDefaults {
    /// VARCHAR length in characters
    pub varchar: u64,
    /// VARBINARY length in bytes
    pub varbinary: u64,
    /// `table.column` -> declared length
    pub overrides: HashMap<String, u64>,
}

impl Default for LengthDefaults {
    fn default() -> Self {
        Self {
            varchar: 256,
            varbinary: 1024,
            overrides: HashMap::new(),
        }
    }
}

impl LengthDefaults {
    pub fn lookup(&self, table: &str, column: &str) -> Option<u64> {
        self.overrides.get(&format!("{table}.{column}")).copied()
    }
}

/// Report run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// `ALL` or a single table name
    pub table: String,

    /// Row cap for length sampling
    pub sample_size: u64,

    pub include_indexes: bool,

    pub skip_export_tables: bool,

    /// Treat unknown column types as a per-table error instead of a warning
    pub strict_types: bool,

    pub on_error: ErrorPolicy,

    /// Tables estimated concurrently
    pub max_concurrent_tables: usize,

    pub format: OutputFormat,

    pub lengths: LengthDefaults,

    pub profile: SizingProfile,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            table: ALL_TABLES.to_string(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            include_indexes: true,
            skip_export_tables: true,
            strict_types: false,
            on_error: ErrorPolicy::Skip,
            max_concurrent_tables: 4,
            format: OutputFormat::Text,
            lengths: LengthDefaults::default(),
            profile: SizingProfile::default(),
        }
    }
}

impl ReportConfig {
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::MemReportError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::MemReportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), crate::MemReportError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), crate::MemReportError> {
        if self.max_concurrent_tables == 0 {
            return Err(crate::MemReportError::Config(
                "max_concurrent_tables must be at least 1".to_string(),
            ));
        }
        self.profile.validate()
    }

    pub fn selects_all(&self) -> bool {
        self.table.eq_ignore_ascii_case(ALL_TABLES)
    }

    /// Whether `table` is selected by the table filter
    pub fn selects(&self, table: &str) -> bool {
        self.selects_all() || self.table.to_ascii_uppercase() == table.to_ascii_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_filter() {
        let mut config = ReportConfig::default();
        assert!(config.selects("orders"));

        config.table = "orders".to_string();
        assert!(config.selects("ORDERS"));
        assert!(!config.selects("customers"));
    }

    #[test]
    fn test_round_trip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memreport.toml");

        let config = ReportConfig {
            sample_size: 1000,
            on_error: ErrorPolicy::Abort,
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = ReportConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.sample_size, 1000);
        assert_eq!(loaded.on_error, ErrorPolicy::Abort);
        assert_eq!(loaded.profile, SizingProfile::default());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = ReportConfig {
            max_concurrent_tables: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_length_override_lookup() {
        let mut lengths = LengthDefaults::default();
        lengths.overrides.insert("orders.note".to_string(), 40);
        assert_eq!(lengths.lookup("orders", "note"), Some(40));
        assert_eq!(lengths.lookup("orders", "id"), None);
    }
}

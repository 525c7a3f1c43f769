//! Memreport error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemReportError {
    #[error("Unknown column type '{type_name}' for column {column}")]
    UnknownType { column: String, type_name: String },

    #[error("Requested {requested} bytes exceeds the largest block size ({ceiling} bytes)")]
    BlockSizeOverflow { requested: u64, ceiling: u64 },

    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    #[error("Missing row count for table {0}")]
    MissingRowCount(String),

    #[error("Missing statistics for table {0}")]
    MissingStats(String),

    #[error("Invalid sizing profile: {0}")]
    InvalidProfile(String),

    #[error("Sampling error: {0}")]
    Sampling(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl MemReportError {
    /// Shorthand for an overflow raised by a checked operation.
    pub fn overflow(what: impl std::fmt::Display) -> Self {
        Self::ArithmeticOverflow(what.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MemReportError>;

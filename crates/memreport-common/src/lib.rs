//! Memreport Common - Shared types, errors, sizing profile and configuration

pub mod config;
pub mod error;
pub mod profile;
pub mod types;

pub use config::{ErrorPolicy, LengthDefaults, OutputFormat, ReportConfig};
pub use error::{MemReportError, Result};
pub use profile::{SizingProfile, TypeWidths};
pub use types::{
    as_gb, as_mb, ColumnSpec, ColumnType, EstimateWarning, LengthSample, Partitioning, RowCounts,
    SizeEstimate, TableKind, TableMeta,
};

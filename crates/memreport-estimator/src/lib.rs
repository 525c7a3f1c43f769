//! Memreport Estimator - Per-column, per-table and database memory estimates
//!
//! Pure computation over already-resolved inputs: no I/O, no shared state.

pub mod column;
pub mod formula;
pub mod report;
pub mod table;

pub use column::{
    declared_byte_length, estimate_column, weighted_mean_cost, ColumnEstimate, ColumnStorage,
    EstimateOptions,
};
pub use formula::{fixed_width, round_to_block_size, variable_field_cost};
pub use report::{compute_database_report, DatabaseSummary, ReportModel, TableFailure};
pub use table::{
    compute_table_report, index_bytes, index_total, stats_derived_bytes, total_bytes,
    StatsDerivedBytes, TableAggregator, TableInput, TableReport,
};

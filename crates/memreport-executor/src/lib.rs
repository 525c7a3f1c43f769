//! Memreport Executor - DataFusion-backed data source for CSV and Parquet files

pub mod convert;
pub mod engine;

pub use convert::{
    column_spec_for, column_type_for, longest_value, widen_to_fit, BufferUsage, LengthCollector,
};
pub use engine::{detect_csv_delimiter, DataFusionSource, RegisteredTableSource};

//! Data source traits
//!
//! The estimator never performs I/O itself. Everything it needs comes from
//! these providers, already resolved.

use crate::stats::{IndexSizes, TableStats};
use async_trait::async_trait;
use memreport_common::{ColumnSpec, LengthSample, Result, TableMeta};
use std::collections::HashMap;

/// Schema provider trait
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// List tables in catalog order
    async fn tables(&self) -> Result<Vec<TableMeta>>;

    /// Columns of a table in declaration order
    async fn columns(&self, table: &str) -> Result<Vec<ColumnSpec>>;
}

/// Logical row count provider
#[async_trait]
pub trait RowCountProvider: Send + Sync {
    /// Rows visible to a query, independent of replication
    async fn logical_row_count(&self, table: &str) -> Result<u64>;
}

/// Length distribution sampler
#[async_trait]
pub trait Sampler: Send + Sync {
    /// Distinct observed byte length -> count, over at most `cap` rows
    async fn sample_lengths(&self, table: &str, column: &str, cap: u64)
        -> Result<Vec<LengthSample>>;
}

/// Storage statistics provider
///
/// Rows sharing a table name (one per partition or replica) are folded
/// additively before they are returned.
#[async_trait]
pub trait StatisticsProvider: Send + Sync {
    /// Folded statistics for `tables`; tables without statistics are absent
    async fn table_statistics(&self, tables: &[String]) -> Result<HashMap<String, TableStats>>;

    async fn index_statistics(&self) -> Result<HashMap<String, IndexSizes>>;
}

/// Everything a report run reads from
pub trait DataSource: SchemaProvider + RowCountProvider + Sampler + StatisticsProvider {}

impl<T> DataSource for T where T: SchemaProvider + RowCountProvider + Sampler + StatisticsProvider {}

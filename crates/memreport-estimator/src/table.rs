//! Table aggregation
//!
//! Folds a table's column estimates into a per-row estimate and combines
//! it with row counts, storage statistics and index sizes.

use crate::column::{estimate_column, ColumnEstimate, EstimateOptions};
use memreport_catalog::{IndexSizes, TableStats};
use memreport_common::{
    ColumnSpec, EstimateWarning, LengthSample, MemReportError, Partitioning, Result, RowCounts,
    SizeEstimate, SizingProfile, TableKind, TableMeta,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const KB: u64 = 1024;

/// Everything the estimator needs for one table, already resolved by the
/// data providers
#[derive(Debug, Clone)]
pub struct TableInput {
    pub meta: TableMeta,
    /// Columns in declaration order
    pub columns: Vec<ColumnSpec>,
    pub row_counts: RowCounts,
    pub stats: TableStats,
    /// `None` when index statistics were not collected
    pub indexes: Option<IndexSizes>,
    /// Column name -> sampled length distribution
    pub samples: HashMap<String, Vec<LengthSample>>,
}

/// Cross-check figures taken straight from the storage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsDerivedBytes {
    /// (tuple data + string data) KB, in bytes
    pub reported: u64,
    /// (tuple allocated + string data) KB, in bytes
    pub allocated: u64,
}

/// Report for one table, built once and never mutated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub name: String,
    pub kind: TableKind,
    pub partitioning: Partitioning,
    pub columns: Vec<ColumnEstimate>,
    pub per_row: SizeEstimate,
    pub row_counts: RowCounts,
    /// `per_row * logical rows`
    pub logical_total: SizeEstimate,
    /// `per_row * physical rows`
    pub physical_total: SizeEstimate,
    pub stats: TableStats,
    pub stats_bytes: StatsDerivedBytes,
    /// Index name -> bytes
    pub indexes: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_total: Option<u64>,
    pub warnings: Vec<EstimateWarning>,
}

/// Sums column estimates for one table
pub struct TableAggregator<'a> {
    columns: &'a [ColumnEstimate],
}

impl<'a> TableAggregator<'a> {
    pub fn new(columns: &'a [ColumnEstimate]) -> Self {
        Self { columns }
    }

    /// Element-wise sum of every column estimate, in column order
    pub fn row_estimate(&self) -> Result<SizeEstimate> {
        self.columns
            .iter()
            .try_fold(SizeEstimate::default(), |acc, col| {
                acc.checked_add(&col.estimate)
            })
            .ok_or_else(|| MemReportError::overflow("per-row estimate"))
    }
}

/// Scale a per-row estimate by a row count.
pub fn total_bytes(row: &SizeEstimate, row_count: u64) -> Result<SizeEstimate> {
    row.checked_mul(row_count)
        .ok_or_else(|| MemReportError::overflow(format!("row estimate times {row_count} rows")))
}

/// Storage-reported memory in bytes, as reported and as allocated.
pub fn stats_derived_bytes(stats: &TableStats) -> Result<StatsDerivedBytes> {
    let to_bytes = |a: u64, b: u64| a.checked_add(b).and_then(|kb| kb.checked_mul(KB));
    Ok(StatsDerivedBytes {
        reported: to_bytes(stats.tuple_data_kb, stats.string_data_kb)
            .ok_or_else(|| MemReportError::overflow("reported tuple bytes"))?,
        allocated: to_bytes(stats.tuple_allocated_kb, stats.string_data_kb)
            .ok_or_else(|| MemReportError::overflow("allocated tuple bytes"))?,
    })
}

/// Index sizes in bytes, keyed by index name.
pub fn index_bytes(indexes: &IndexSizes) -> Result<BTreeMap<String, u64>> {
    indexes
        .iter()
        .map(|(name, kb)| {
            kb.checked_mul(KB)
                .map(|bytes| (name.clone(), bytes))
                .ok_or_else(|| MemReportError::overflow(format!("size of index {name}")))
        })
        .collect()
}

/// Sum of all index sizes; `None` when the table has no indexes.
pub fn index_total(indexes: &BTreeMap<String, u64>) -> Result<Option<u64>> {
    if indexes.is_empty() {
        return Ok(None);
    }
    indexes
        .values()
        .try_fold(0u64, |acc, bytes| acc.checked_add(*bytes))
        .map(Some)
        .ok_or_else(|| MemReportError::overflow("index total"))
}

/// Estimate every column of a table and fold the results into a report.
pub fn compute_table_report(
    profile: &SizingProfile,
    input: &TableInput,
    options: EstimateOptions,
) -> Result<TableReport> {
    let columns = input
        .columns
        .iter()
        .map(|column| {
            let samples = input
                .samples
                .get(&column.name)
                .map(Vec::as_slice)
                .unwrap_or_default();
            estimate_column(profile, column, samples, input.row_counts.logical, options)
        })
        .collect::<Result<Vec<_>>>()?;

    let per_row = TableAggregator::new(&columns).row_estimate()?;
    let logical_total = total_bytes(&per_row, input.row_counts.logical)?;
    let physical_total = total_bytes(&per_row, input.row_counts.physical)?;
    let stats_bytes = stats_derived_bytes(&input.stats)?;
    let indexes = match &input.indexes {
        Some(sizes) => index_bytes(sizes)?,
        None => BTreeMap::new(),
    };
    let index_total = index_total(&indexes)?;
    let warnings = columns.iter().filter_map(ColumnEstimate::warning).collect();

    Ok(TableReport {
        name: input.meta.name.clone(),
        kind: input.meta.kind.clone(),
        partitioning: input.meta.partitioning,
        columns,
        per_row,
        row_counts: input.row_counts,
        logical_total,
        physical_total,
        stats: input.stats,
        stats_bytes,
        indexes,
        index_total,
        warnings,
    })
}

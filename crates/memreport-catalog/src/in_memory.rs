//! In-memory data source implementation

use crate::stats::{fold_index_rows, fold_table_rows, IndexSizes, IndexStatsRow, TableStats, TableStatsRow};
use crate::traits::{RowCountProvider, Sampler, SchemaProvider, StatisticsProvider};
use async_trait::async_trait;
use dashmap::DashMap;
use memreport_common::{ColumnSpec, LengthSample, MemReportError, Result, TableMeta};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Everything recorded about one table
#[derive(Debug, Clone)]
struct InMemoryTable {
    meta: TableMeta,
    columns: Vec<ColumnSpec>,
    logical_rows: Option<u64>,
    samples: HashMap<String, Vec<LengthSample>>,
}

/// In-memory data source, fed directly or from a snapshot file
pub struct InMemoryCatalog {
    tables: DashMap<String, InMemoryTable>,
    /// Table names in creation order
    order: RwLock<Vec<String>>,
    table_rows: RwLock<Vec<TableStatsRow>>,
    index_rows: RwLock<Vec<IndexStatsRow>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            order: RwLock::new(Vec::new()),
            table_rows: RwLock::new(Vec::new()),
            index_rows: RwLock::new(Vec::new()),
        }
    }

    pub fn create_table(&self, meta: TableMeta, columns: Vec<ColumnSpec>) -> Result<()> {
        if self.tables.contains_key(&meta.name) {
            return Err(MemReportError::AlreadyExists(format!("table '{}'", meta.name)));
        }
        let name = meta.name.clone();
        self.tables.insert(
            name.clone(),
            InMemoryTable {
                meta,
                columns,
                logical_rows: None,
                samples: HashMap::new(),
            },
        );
        self.order.write().push(name);
        Ok(())
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(MemReportError::NotFound(format!("table '{}'", name)));
        }
        self.order.write().retain(|t| t != name);
        self.table_rows.write().retain(|r| r.table != name);
        self.index_rows.write().retain(|r| r.table != name);
        Ok(())
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn set_logical_row_count(&self, table: &str, rows: u64) -> Result<()> {
        let mut entry = self
            .tables
            .get_mut(table)
            .ok_or_else(|| MemReportError::NotFound(format!("table '{}'", table)))?;
        entry.logical_rows = Some(rows);
        Ok(())
    }

    pub fn set_samples(&self, table: &str, column: &str, samples: Vec<LengthSample>) -> Result<()> {
        let mut entry = self
            .tables
            .get_mut(table)
            .ok_or_else(|| MemReportError::NotFound(format!("table '{}'", table)))?;
        if !entry.columns.iter().any(|c| c.name == column) {
            return Err(MemReportError::NotFound(format!("column '{}.{}'", table, column)));
        }
        entry.samples.insert(column.to_string(), samples);
        Ok(())
    }

    /// Record one per-partition table statistics row
    pub fn add_table_stats_row(&self, row: TableStatsRow) {
        self.table_rows.write().push(row);
    }

    /// Record one per-partition index statistics row
    pub fn add_index_stats_row(&self, row: IndexStatsRow) {
        self.index_rows.write().push(row);
    }

    pub(crate) fn table_stats_rows(&self) -> Vec<TableStatsRow> {
        self.table_rows.read().clone()
    }

    pub(crate) fn index_stats_rows(&self) -> Vec<IndexStatsRow> {
        self.index_rows.read().clone()
    }

    pub(crate) fn recorded_row_count(&self, table: &str) -> Option<u64> {
        self.tables.get(table).and_then(|t| t.logical_rows)
    }

    pub(crate) fn recorded_samples(&self, table: &str) -> Vec<(String, Vec<LengthSample>)> {
        let Some(entry) = self.tables.get(table) else {
            return vec![];
        };
        // column order keeps snapshots stable
        entry
            .columns
            .iter()
            .filter_map(|c| entry.samples.get(&c.name).map(|s| (c.name.clone(), s.clone())))
            .collect()
    }

    fn table_entry(&self, name: &str) -> Result<InMemoryTable> {
        self.tables
            .get(name)
            .map(|t| t.value().clone())
            .ok_or_else(|| MemReportError::NotFound(format!("table '{}'", name)))
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep at most `cap` sampled rows, in recorded order.
fn cap_samples(samples: &[LengthSample], cap: u64) -> Vec<LengthSample> {
    let mut remaining = cap;
    let mut capped = Vec::with_capacity(samples.len());
    for sample in samples {
        if remaining == 0 {
            break;
        }
        let count = sample.count.min(remaining);
        remaining -= count;
        capped.push(LengthSample {
            length: sample.length,
            count,
        });
    }
    capped
}

#[async_trait]
impl SchemaProvider for InMemoryCatalog {
    async fn tables(&self) -> Result<Vec<TableMeta>> {
        let order = self.order.read().clone();
        Ok(order
            .iter()
            .filter_map(|name| self.tables.get(name).map(|t| t.meta.clone()))
            .collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnSpec>> {
        Ok(self.table_entry(table)?.columns)
    }
}

#[async_trait]
impl RowCountProvider for InMemoryCatalog {
    async fn logical_row_count(&self, table: &str) -> Result<u64> {
        self.table_entry(table)?
            .logical_rows
            .ok_or_else(|| MemReportError::MissingRowCount(table.to_string()))
    }
}

#[async_trait]
impl Sampler for InMemoryCatalog {
    async fn sample_lengths(&self, table: &str, column: &str, cap: u64) -> Result<Vec<LengthSample>> {
        let entry = self.table_entry(table)?;
        Ok(entry
            .samples
            .get(column)
            .map(|s| cap_samples(s, cap))
            .unwrap_or_default())
    }
}

#[async_trait]
impl StatisticsProvider for InMemoryCatalog {
    async fn table_statistics(&self, tables: &[String]) -> Result<HashMap<String, TableStats>> {
        let rows = self.table_rows.read();
        fold_table_rows(rows.iter().filter(|r| tables.contains(&r.table)))
    }

    async fn index_statistics(&self) -> Result<HashMap<String, IndexSizes>> {
        fold_index_rows(self.index_rows.read().iter())
    }
}

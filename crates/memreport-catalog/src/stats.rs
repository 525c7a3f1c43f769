//! Storage statistics reported per partition and folded per table

use memreport_common::{MemReportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Tuple storage figures for one table, summed over partitions and replicas.
/// Memory figures are in KB as reported by the storage engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    /// Stored tuples, counting every replica
    pub tuple_count: u64,
    pub tuple_allocated_kb: u64,
    pub tuple_data_kb: u64,
    pub string_data_kb: u64,
}

impl TableStats {
    pub fn checked_merge(&self, other: &TableStats) -> Option<TableStats> {
        Some(TableStats {
            tuple_count: self.tuple_count.checked_add(other.tuple_count)?,
            tuple_allocated_kb: self.tuple_allocated_kb.checked_add(other.tuple_allocated_kb)?,
            tuple_data_kb: self.tuple_data_kb.checked_add(other.tuple_data_kb)?,
            string_data_kb: self.string_data_kb.checked_add(other.string_data_kb)?,
        })
    }
}

/// One table statistics row, as emitted once per partition or replica
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStatsRow {
    pub table: String,
    #[serde(default)]
    pub partition_id: u32,
    pub tuple_count: u64,
    #[serde(default)]
    pub tuple_allocated_kb: u64,
    #[serde(default)]
    pub tuple_data_kb: u64,
    #[serde(default)]
    pub string_data_kb: u64,
}

impl TableStatsRow {
    pub fn stats(&self) -> TableStats {
        TableStats {
            tuple_count: self.tuple_count,
            tuple_allocated_kb: self.tuple_allocated_kb,
            tuple_data_kb: self.tuple_data_kb,
            string_data_kb: self.string_data_kb,
        }
    }
}

/// One index statistics row, as emitted once per partition or replica
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatsRow {
    pub index: String,
    pub table: String,
    #[serde(default)]
    pub partition_id: u32,
    pub memory_kb: u64,
}

/// Index name -> memory KB for one table, in name order
pub type IndexSizes = BTreeMap<String, u64>;

/// Fold per-partition table rows by table name, summing every figure.
pub fn fold_table_rows<'a>(
    rows: impl IntoIterator<Item = &'a TableStatsRow>,
) -> Result<HashMap<String, TableStats>> {
    let mut folded: HashMap<String, TableStats> = HashMap::new();
    for row in rows {
        let entry = folded.entry(row.table.clone()).or_default();
        *entry = entry.checked_merge(&row.stats()).ok_or_else(|| {
            MemReportError::overflow(format!("table statistics for {}", row.table))
        })?;
    }
    Ok(folded)
}

/// Fold per-partition index rows by table and index name, summing sizes.
pub fn fold_index_rows<'a>(
    rows: impl IntoIterator<Item = &'a IndexStatsRow>,
) -> Result<HashMap<String, IndexSizes>> {
    let mut folded: HashMap<String, IndexSizes> = HashMap::new();
    for row in rows {
        let kb = folded
            .entry(row.table.clone())
            .or_default()
            .entry(row.index.clone())
            .or_insert(0);
        *kb = kb.checked_add(row.memory_kb).ok_or_else(|| {
            MemReportError::overflow(format!("index statistics for {}.{}", row.table, row.index))
        })?;
    }
    Ok(folded)
}

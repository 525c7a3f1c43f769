//! Database snapshot file
//!
//! A snapshot captures what the data providers returned for one database:
//! table metadata, columns, logical row counts, sampled length
//! distributions and the raw per-partition statistics rows. Loading it into
//! an [`InMemoryCatalog`] reproduces a report offline.

use crate::in_memory::InMemoryCatalog;
use crate::stats::{IndexStatsRow, TableStatsRow};
use memreport_common::{ColumnSpec, LengthSample, Partitioning, Result, TableKind, TableMeta};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    #[serde(default)]
    pub tables: Vec<TableSnapshot>,

    #[serde(default)]
    pub table_stats: Vec<TableStatsRow>,

    #[serde(default)]
    pub index_stats: Vec<IndexStatsRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,

    #[serde(default = "default_kind")]
    pub kind: TableKind,

    /// Replicated unless stated otherwise
    #[serde(default)]
    pub partitioning: Partitioning,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_rows: Option<u64>,

    #[serde(default)]
    pub columns: Vec<ColumnSpec>,

    #[serde(default)]
    pub samples: Vec<ColumnSamples>,
}

fn default_kind() -> TableKind {
    TableKind::Table
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSamples {
    pub column: String,
    pub lengths: Vec<LengthSample>,
}

impl TableSnapshot {
    pub fn meta(&self) -> TableMeta {
        TableMeta::new(self.name.clone(), self.kind.clone(), self.partitioning)
    }
}

impl DatabaseSnapshot {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build an in-memory source holding exactly this snapshot
    pub fn into_catalog(self) -> Result<InMemoryCatalog> {
        let catalog = InMemoryCatalog::new();
        for table in self.tables {
            let meta = table.meta();
            catalog.create_table(meta, table.columns)?;
            if let Some(rows) = table.logical_rows {
                catalog.set_logical_row_count(&table.name, rows)?;
            }
            for samples in table.samples {
                catalog.set_samples(&table.name, &samples.column, samples.lengths)?;
            }
        }
        for row in self.table_stats {
            catalog.add_table_stats_row(row);
        }
        for row in self.index_stats {
            catalog.add_index_stats_row(row);
        }
        tracing::debug!("Loaded snapshot with {} tables", catalog.table_count());
        Ok(catalog)
    }
}

impl InMemoryCatalog {
    /// Capture the current contents as a snapshot
    pub async fn snapshot(&self) -> Result<DatabaseSnapshot> {
        use crate::traits::SchemaProvider;

        let mut tables = Vec::new();
        for meta in self.tables().await? {
            let columns = self.columns(&meta.name).await?;
            let samples = self
                .recorded_samples(&meta.name)
                .into_iter()
                .map(|(column, lengths)| ColumnSamples { column, lengths })
                .collect();
            tables.push(TableSnapshot {
                logical_rows: self.recorded_row_count(&meta.name),
                name: meta.name,
                kind: meta.kind,
                partitioning: meta.partitioning,
                columns,
                samples,
            });
        }
        Ok(DatabaseSnapshot {
            tables,
            table_stats: self.table_stats_rows(),
            index_stats: self.index_stats_rows(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{RowCountProvider, Sampler, SchemaProvider, StatisticsProvider};
    use memreport_common::ColumnType;

    const SNAPSHOT: &str = r#"
[[tables]]
name = "ORDERS"
kind = "TABLE"
partitioning = "partitioned"
logical_rows = 1000

[[tables.columns]]
name = "ID"
type = "BIGINT"
length = 8

[[tables.columns]]
name = "NOTE"
type = "VARCHAR"
length = 100
nullable = true

[[tables.samples]]
column = "NOTE"
lengths = [{ length = 10, count = 900 }, { count = 100 }]

[[tables]]
name = "AUDIT"
kind = "EXPORT"

[[table_stats]]
table = "ORDERS"
partition_id = 0
tuple_count = 600
tuple_allocated_kb = 64
tuple_data_kb = 40
string_data_kb = 20

[[table_stats]]
table = "ORDERS"
partition_id = 1
tuple_count = 400
tuple_allocated_kb = 64
tuple_data_kb = 30
string_data_kb = 10

[[index_stats]]
index = "PK_ORDERS"
table = "ORDERS"
memory_kb = 12
"#;

    #[tokio::test]
    async fn test_load_snapshot() {
        let snapshot: DatabaseSnapshot = toml::from_str(SNAPSHOT).unwrap();
        let catalog = snapshot.into_catalog().unwrap();

        let tables = catalog.tables().await.unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].partitioning, Partitioning::Partitioned);
        assert_eq!(tables[1].kind, TableKind::Export);
        assert_eq!(tables[1].partitioning, Partitioning::Replicated);

        let columns = catalog.columns("ORDERS").await.unwrap();
        assert_eq!(columns[1].column_type, ColumnType::Varchar);
        assert!(columns[1].nullable);
        assert!(!columns[0].nullable);

        assert_eq!(catalog.logical_row_count("ORDERS").await.unwrap(), 1000);

        let samples = catalog.sample_lengths("ORDERS", "NOTE", 500_000).await.unwrap();
        assert_eq!(samples, vec![LengthSample::new(10, 900), LengthSample::null(100)]);

        let stats = catalog
            .table_statistics(&["ORDERS".to_string()])
            .await
            .unwrap();
        let orders = stats.get("ORDERS").unwrap();
        assert_eq!(orders.tuple_count, 1000);
        assert_eq!(orders.tuple_data_kb, 70);
        assert_eq!(orders.tuple_allocated_kb, 128);

        let indexes = catalog.index_statistics().await.unwrap();
        assert_eq!(indexes.get("ORDERS").unwrap().get("PK_ORDERS"), Some(&12));
    }

    #[tokio::test]
    async fn test_snapshot_file_round_trip() {
        let snapshot: DatabaseSnapshot = toml::from_str(SNAPSHOT).unwrap();
        let catalog = snapshot.clone().into_catalog().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.toml");
        catalog.snapshot().await.unwrap().save_to_file(&path).unwrap();

        let reloaded = DatabaseSnapshot::load_from_file(&path).unwrap();
        assert_eq!(reloaded.tables.len(), snapshot.tables.len());
        assert_eq!(reloaded.tables[0].columns, snapshot.tables[0].columns);
        assert_eq!(reloaded.tables[0].samples, snapshot.tables[0].samples);
        assert_eq!(reloaded.tables[0].logical_rows, Some(1000));
        assert_eq!(reloaded.table_stats, snapshot.table_stats);
        assert_eq!(reloaded.index_stats, snapshot.index_stats);
    }
}

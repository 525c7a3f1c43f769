//! DataFusion-backed data source
//!
//! Serves schema, row counts, length samples and buffer statistics for CSV
//! and Parquet files registered on a DataFusion session. Such files carry no
//! partitioning, replication or index information, so every table is
//! reported as REPLICATED with physical rows equal to logical rows and no
//! indexes.
//!
//! Both `columns` and `table_statistics` stream a full scan of the table
//! (string columns only for the former). Batches are dropped as they are
//! measured.

use crate::convert::{
    column_spec_for, has_assumed_length, longest_value, widen_to_fit, BufferUsage,
    LengthCollector,
};
use async_trait::async_trait;
use datafusion::prelude::*;
use futures::StreamExt;
use memreport_catalog::{
    IndexSizes, RowCountProvider, Sampler, SchemaProvider, StatisticsProvider, TableStats,
};
use memreport_common::{
    ColumnSpec, LengthDefaults, LengthSample, MemReportError, Partitioning, Result, TableKind,
    TableMeta,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where a registered table reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisteredTableSource {
    Csv { path: PathBuf, delimiter: u8 },
    Parquet { path: PathBuf },
}

#[derive(Debug, Clone)]
struct RegisteredTable {
    name: String,
    source: RegisteredTableSource,
}

pub struct DataFusionSource {
    ctx: SessionContext,
    /// Registration order doubles as catalog order
    tables: RwLock<Vec<RegisteredTable>>,
    lengths: LengthDefaults,
}

impl DataFusionSource {
    pub fn new(lengths: LengthDefaults) -> Self {
        let config = SessionConfig::new()
            .with_information_schema(true)
            .set_bool("datafusion.sql_parser.enable_ident_normalization", true);
        Self {
            ctx: SessionContext::new_with_config(config),
            tables: RwLock::new(Vec::new()),
            lengths,
        }
    }

    pub async fn register_csv(&self, table_name: &str, path: &Path) -> Result<()> {
        self.check_unregistered(table_name)?;
        let delimiter = detect_csv_delimiter(path);
        let location = path_str(path)?;
        // match the file itself, e.g. `.dat` or `.tbl` dumps
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        self.ctx
            .register_csv(
                table_name,
                location,
                CsvReadOptions::new()
                    .has_header(true)
                    .delimiter(delimiter)
                    .file_extension(&extension),
            )
            .await
            .map_err(|e| {
                MemReportError::Execution(format!("Failed to register CSV {table_name}: {e}"))
            })?;

        tracing::info!(
            "Registered CSV table '{}' from {:?} (delimiter={:?})",
            table_name,
            path,
            delimiter as char
        );
        self.tables.write().push(RegisteredTable {
            name: table_name.to_string(),
            source: RegisteredTableSource::Csv {
                path: path.to_path_buf(),
                delimiter,
            },
        });
        Ok(())
    }

    pub async fn register_parquet(&self, table_name: &str, path: &Path) -> Result<()> {
        self.check_unregistered(table_name)?;
        let location = path_str(path)?;
        self.ctx
            .register_parquet(table_name, location, ParquetReadOptions::default())
            .await
            .map_err(|e| {
                MemReportError::Execution(format!("Failed to register parquet {table_name}: {e}"))
            })?;

        tracing::info!("Registered Parquet table '{}' from {:?}", table_name, path);
        self.tables.write().push(RegisteredTable {
            name: table_name.to_string(),
            source: RegisteredTableSource::Parquet {
                path: path.to_path_buf(),
            },
        });
        Ok(())
    }

    pub fn registered_source(&self, table_name: &str) -> Option<RegisteredTableSource> {
        self.lookup(table_name).ok().map(|t| t.source)
    }

    fn check_unregistered(&self, table_name: &str) -> Result<()> {
        if self.lookup(table_name).is_ok() {
            return Err(MemReportError::AlreadyExists(format!("table {table_name}")));
        }
        Ok(())
    }

    fn lookup(&self, table_name: &str) -> Result<RegisteredTable> {
        self.tables
            .read()
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(table_name))
            .cloned()
            .ok_or_else(|| MemReportError::NotFound(format!("table {table_name}")))
    }

    async fn frame(&self, table_name: &str) -> Result<DataFrame> {
        let table = self.lookup(table_name)?;
        self.ctx
            .table(table.name.as_str())
            .await
            .map_err(|e| MemReportError::Execution(format!("Failed to open {table_name}: {e}")))
    }
}

impl Default for DataFusionSource {
    fn default() -> Self {
        Self::new(LengthDefaults::default())
    }
}

#[async_trait]
impl SchemaProvider for DataFusionSource {
    async fn tables(&self) -> Result<Vec<TableMeta>> {
        Ok(self
            .tables
            .read()
            .iter()
            .map(|t| TableMeta::new(t.name.clone(), TableKind::Table, Partitioning::Replicated))
            .collect())
    }

    /// Declared lengths of string and binary columns are raised to the
    /// longest value stored in them.
    async fn columns(&self, table: &str) -> Result<Vec<ColumnSpec>> {
        let df = self.frame(table).await?;
        let schema = df.schema().as_arrow().clone();
        let mut columns: Vec<ColumnSpec> = schema
            .fields()
            .iter()
            .map(|field| column_spec_for(table, field, &self.lengths))
            .collect();

        let measured: Vec<usize> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| has_assumed_length(field))
            .map(|(i, _)| i)
            .collect();
        if measured.is_empty() {
            return Ok(columns);
        }

        let names: Vec<&str> = measured.iter().map(|&i| schema.field(i).name().as_str()).collect();
        let mut longest = vec![0u64; measured.len()];
        let mut stream = df.select_columns(&names)?.execute_stream().await?;
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for (slot, array) in longest.iter_mut().zip(batch.columns()) {
                if let Some(len) = longest_value(array.as_ref())? {
                    *slot = (*slot).max(len);
                }
            }
        }
        for (&i, len) in measured.iter().zip(longest) {
            widen_to_fit(table, &mut columns[i], len);
        }
        Ok(columns)
    }
}

#[async_trait]
impl RowCountProvider for DataFusionSource {
    async fn logical_row_count(&self, table: &str) -> Result<u64> {
        let rows = self.frame(table).await?.count().await?;
        Ok(rows as u64)
    }
}

#[async_trait]
impl Sampler for DataFusionSource {
    async fn sample_lengths(
        &self,
        table: &str,
        column: &str,
        cap: u64,
    ) -> Result<Vec<LengthSample>> {
        if cap == 0 {
            return Ok(Vec::new());
        }
        let fetch = usize::try_from(cap).unwrap_or(usize::MAX);
        let batches = self
            .frame(table)
            .await?
            .select_columns(&[column])
            .and_then(|df| df.limit(0, Some(fetch)))
            .map_err(|e| MemReportError::Sampling(format!("{table}.{column}: {e}")))?
            .collect()
            .await
            .map_err(|e| MemReportError::Sampling(format!("{table}.{column}: {e}")))?;

        let mut collector = LengthCollector::new();
        for batch in &batches {
            collector.observe(batch.column(0).as_ref())?;
        }
        let samples = collector.finish();
        tracing::debug!(
            "Sampled {} distinct lengths for {}.{}",
            samples.len(),
            table,
            column
        );
        Ok(samples)
    }
}

#[async_trait]
impl StatisticsProvider for DataFusionSource {
    /// Scans each requested table and measures its Arrow buffers
    async fn table_statistics(&self, tables: &[String]) -> Result<HashMap<String, TableStats>> {
        let mut stats = HashMap::with_capacity(tables.len());
        for requested in tables {
            let Ok(table) = self.lookup(requested) else {
                continue;
            };
            let mut usage = BufferUsage::default();
            let mut stream = self.frame(&table.name).await?.execute_stream().await?;
            while let Some(batch) = stream.next().await {
                usage.observe(&batch?);
            }
            tracing::debug!("Scanned {} rows of {}", usage.rows, table.name);
            stats.insert(
                table.name,
                TableStats {
                    tuple_count: usage.rows,
                    tuple_allocated_kb: usage.tuple_allocated_bytes.div_ceil(1024),
                    tuple_data_kb: usage.tuple_bytes.div_ceil(1024),
                    string_data_kb: usage.string_bytes.div_ceil(1024),
                },
            );
        }
        Ok(stats)
    }

    async fn index_statistics(&self) -> Result<HashMap<String, IndexSizes>> {
        Ok(HashMap::new())
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| MemReportError::InvalidArgument(format!("non UTF-8 path {path:?}")))
}

/// Pick `|` when the header line has more pipes than commas
pub fn detect_csv_delimiter(path: &Path) -> u8 {
    if let Ok(content) = std::fs::read_to_string(path) {
        if let Some(first_line) = content.lines().next() {
            let pipes = first_line.matches('|').count();
            let commas = first_line.matches(',').count();
            if pipes > commas {
                return b'|';
            }
        }
    }
    b','
}

#[cfg(test)]
mod tests {
    use super::*;
    use memreport_common::ColumnType;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_detect_csv_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let pipes = write_csv(&dir, "a.csv", "id|name|note\n1|x|y\n");
        let commas = write_csv(&dir, "b.csv", "id,name\n1,x\n");
        assert_eq!(detect_csv_delimiter(&pipes), b'|');
        assert_eq!(detect_csv_delimiter(&commas), b',');
        assert_eq!(detect_csv_delimiter(&dir.path().join("missing.csv")), b',');
    }

    #[tokio::test]
    async fn test_csv_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "people.csv",
            "id,name\n1,alice\n2,bob\n3,alice\n4,\n",
        );
        let source = DataFusionSource::default();
        source.register_csv("people", &path).await.unwrap();

        assert!(matches!(
            source.registered_source("people"),
            Some(RegisteredTableSource::Csv { delimiter: b',', .. })
        ));
        assert!(matches!(
            source.register_csv("people", &path).await,
            Err(MemReportError::AlreadyExists(_))
        ));

        let tables = source.tables().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].partitioning, Partitioning::Replicated);

        let columns = source.columns("people").await.unwrap();
        assert_eq!(columns[0].column_type, ColumnType::BigInt);
        assert_eq!(columns[1].column_type, ColumnType::Varchar);
        assert_eq!(columns[1].length, 256);

        assert_eq!(source.logical_row_count("people").await.unwrap(), 4);

        let samples = source.sample_lengths("people", "name", 10).await.unwrap();
        let total: u64 = samples.iter().map(|s| s.count).sum();
        assert_eq!(total, 4);
        assert!(samples.contains(&LengthSample::new(5, 2)));
        assert!(samples.contains(&LengthSample::new(3, 1)));

        let capped = source.sample_lengths("people", "name", 2).await.unwrap();
        assert_eq!(capped.iter().map(|s| s.count).sum::<u64>(), 2);
        assert!(source
            .sample_lengths("people", "name", 0)
            .await
            .unwrap()
            .is_empty());

        let stats = source
            .table_statistics(&["people".to_string()])
            .await
            .unwrap();
        assert_eq!(stats["people"].tuple_count, 4);
        assert!(stats["people"].string_data_kb >= 1);
        assert!(source.index_statistics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_declared_length_fits_longest_value() {
        let dir = tempfile::tempdir().unwrap();
        let long = "x".repeat(3000);
        let path = write_csv(&dir, "docs.csv", &format!("id,body\n1,{long}\n2,{long}\n3,short\n"));
        let source = DataFusionSource::default();
        source.register_csv("docs", &path).await.unwrap();

        let columns = source.columns("docs").await.unwrap();
        assert_eq!(columns[1].column_type, ColumnType::Varchar);
        assert_eq!(columns[1].length, 3000);
        assert_eq!(columns[0].length, 8);
    }

    #[tokio::test]
    async fn test_statistics_only_for_requested_tables() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(&dir, "a.csv", "id\n1\n2\n");
        let b = write_csv(&dir, "b.csv", "id\n1\n");
        let source = DataFusionSource::default();
        source.register_csv("a", &a).await.unwrap();
        source.register_csv("b", &b).await.unwrap();

        let stats = source
            .table_statistics(&["b".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats["b"].tuple_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let source = DataFusionSource::default();
        assert!(matches!(
            source.logical_row_count("nope").await,
            Err(MemReportError::NotFound(_))
        ));
        assert!(matches!(
            source.columns("nope").await,
            Err(MemReportError::NotFound(_))
        ));
    }
}

//! Report coordinator - drives one report run over a data source

use futures::stream::{self, StreamExt};
use memreport_catalog::{
    ColumnSamples, DataSource, DatabaseSnapshot, IndexSizes, IndexStatsRow, TableSnapshot,
    TableStats, TableStatsRow,
};
use memreport_common::{
    ColumnSpec, ErrorPolicy, MemReportError, ReportConfig, Result, RowCounts, SizingProfile,
    TableKind, TableMeta,
};
use memreport_estimator::{
    compute_table_report, declared_byte_length, EstimateOptions, ReportModel, TableInput,
    TableReport,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Runs a memory report: selects tables, resolves every collaborator input
/// for each one and folds the per-table results into a [`ReportModel`].
pub struct ReportCoordinator {
    source: Arc<dyn DataSource>,
    config: ReportConfig,
}

impl ReportCoordinator {
    pub fn new(source: Arc<dyn DataSource>, config: ReportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { source, config })
    }

    /// Tables covered by this run, in catalog order.
    ///
    /// A named filter that matches nothing is an error rather than an empty
    /// report.
    pub async fn select_tables(&self) -> Result<Vec<TableMeta>> {
        let mut selected = Vec::new();
        for meta in self.source.tables().await? {
            if !self.config.selects(&meta.name) {
                continue;
            }
            if self.config.skip_export_tables && meta.kind == TableKind::Export {
                tracing::info!("Skipping export table {}", meta.name);
                continue;
            }
            selected.push(meta);
        }
        if selected.is_empty() && !self.config.selects_all() {
            return Err(MemReportError::NotFound(format!(
                "table {}",
                self.config.table
            )));
        }
        Ok(selected)
    }

    pub async fn run(&self) -> Result<ReportModel> {
        let tables = self.select_tables().await?;
        tracing::info!("Estimating memory for {} tables", tables.len());

        let table_stats = self.source.table_statistics(&table_names(&tables)).await?;
        let index_stats = if self.config.include_indexes {
            Some(self.source.index_statistics().await?)
        } else {
            None
        };

        let mut results = stream::iter(tables)
            .map(|meta| {
                let table_stats = &table_stats;
                let index_stats = index_stats.as_ref();
                async move {
                    let name = meta.name.clone();
                    let result = self.estimate_table(meta, table_stats, index_stats).await;
                    (name, result)
                }
            })
            .buffered(self.config.max_concurrent_tables);

        let mut model = ReportModel::new(self.config.profile.version.clone());
        while let Some((name, result)) = results.next().await {
            match result {
                Ok(report) => model.push(report),
                Err(e) => match self.config.on_error {
                    ErrorPolicy::Skip => {
                        tracing::warn!("Skipping table {}: {}", name, e);
                        model.push_failure(name, &e);
                    }
                    ErrorPolicy::Abort => {
                        tracing::warn!("Aborting report at table {}: {}", name, e);
                        return Err(e);
                    }
                },
            }
        }

        tracing::info!(
            "Report finished: {} tables, {} failures",
            model.tables().len(),
            model.failures().len()
        );
        Ok(model)
    }

    /// Capture what the data source returns for the selected tables, so the
    /// same report can be reproduced offline from a snapshot file.
    ///
    /// Statistics are stored already folded, as a single partition row.
    pub async fn capture_snapshot(&self) -> Result<DatabaseSnapshot> {
        let tables = self.select_tables().await?;
        let table_stats = self.source.table_statistics(&table_names(&tables)).await?;
        let index_stats = if self.config.include_indexes {
            self.source.index_statistics().await?
        } else {
            HashMap::new()
        };

        let mut snapshot = DatabaseSnapshot::default();
        for meta in tables {
            let columns = self.source.columns(&meta.name).await?;
            let logical = self.source.logical_row_count(&meta.name).await?;
            let mut samples = Vec::new();
            for column in &columns {
                if logical == 0 || !needs_sampling(&self.config.profile, column)? {
                    continue;
                }
                let lengths = self
                    .source
                    .sample_lengths(&meta.name, &column.name, self.config.sample_size)
                    .await?;
                samples.push(ColumnSamples {
                    column: column.name.clone(),
                    lengths,
                });
            }

            if let Some(stats) = table_stats.get(&meta.name) {
                snapshot.table_stats.push(TableStatsRow {
                    table: meta.name.clone(),
                    partition_id: 0,
                    tuple_count: stats.tuple_count,
                    tuple_allocated_kb: stats.tuple_allocated_kb,
                    tuple_data_kb: stats.tuple_data_kb,
                    string_data_kb: stats.string_data_kb,
                });
            }
            for (index, memory_kb) in index_stats.get(&meta.name).into_iter().flatten() {
                snapshot.index_stats.push(IndexStatsRow {
                    index: index.clone(),
                    table: meta.name.clone(),
                    partition_id: 0,
                    memory_kb: *memory_kb,
                });
            }
            snapshot.tables.push(TableSnapshot {
                name: meta.name,
                kind: meta.kind,
                partitioning: meta.partitioning,
                logical_rows: Some(logical),
                columns,
                samples,
            });
        }
        tracing::info!("Captured snapshot of {} tables", snapshot.tables.len());
        Ok(snapshot)
    }

    async fn estimate_table(
        &self,
        meta: TableMeta,
        table_stats: &HashMap<String, TableStats>,
        index_stats: Option<&HashMap<String, IndexSizes>>,
    ) -> Result<TableReport> {
        let stats = table_stats
            .get(&meta.name)
            .copied()
            .ok_or_else(|| MemReportError::MissingStats(meta.name.clone()))?;
        let columns = self.source.columns(&meta.name).await?;
        let logical = self.source.logical_row_count(&meta.name).await?;

        let mut samples = HashMap::new();
        if logical > 0 {
            for column in &columns {
                if !needs_sampling(&self.config.profile, column)? {
                    continue;
                }
                let lengths = self
                    .source
                    .sample_lengths(&meta.name, &column.name, self.config.sample_size)
                    .await?;
                samples.insert(column.name.clone(), lengths);
            }
        }

        let indexes = index_stats.map(|all| all.get(&meta.name).cloned().unwrap_or_default());
        let input = TableInput {
            row_counts: RowCounts::new(logical, stats.tuple_count),
            meta,
            columns,
            stats,
            indexes,
            samples,
        };
        let options = EstimateOptions {
            strict_types: self.config.strict_types,
        };
        let report = compute_table_report(&self.config.profile, &input, options)?;
        tracing::debug!(
            "Table {}: {} columns, {} bytes per row (actual)",
            report.name,
            report.columns.len(),
            report.per_row.actual
        );
        Ok(report)
    }
}

fn table_names(tables: &[TableMeta]) -> Vec<String> {
    tables.iter().map(|t| t.name.clone()).collect()
}

/// Whether a column is stored out-of-line and so needs a length sample
pub fn needs_sampling(profile: &SizingProfile, column: &ColumnSpec) -> Result<bool> {
    if !column.column_type.is_variable() {
        return Ok(false);
    }
    Ok(declared_byte_length(profile, column)? >= profile.inline_threshold)
}

//! Database-wide report model
//!
//! Collects finished [`TableReport`]s in visit order, plus the tables that
//! could not be estimated. The presentation stage reads this model; it never
//! feeds back into it.

use crate::table::TableReport;
use memreport_common::{MemReportError, Result, SizeEstimate};
use serde::{Deserialize, Serialize};

/// A table that could not be estimated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFailure {
    pub table: String,
    pub error: String,
}

/// Totals across every reported table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub tables: usize,
    pub failures: usize,
    pub warnings: usize,
    pub logical_total: SizeEstimate,
    pub physical_total: SizeEstimate,
    pub stats_reported_bytes: u64,
    pub stats_allocated_bytes: u64,
    pub index_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportModel {
    /// Sizing profile the estimates were computed with
    pub profile_version: String,
    tables: Vec<TableReport>,
    failures: Vec<TableFailure>,
}

impl ReportModel {
    pub fn new(profile_version: impl Into<String>) -> Self {
        Self {
            profile_version: profile_version.into(),
            tables: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Append a finished table report
    pub fn push(&mut self, report: TableReport) {
        self.tables.push(report);
    }

    pub fn push_failure(&mut self, table: impl Into<String>, error: &MemReportError) {
        self.failures.push(TableFailure {
            table: table.into(),
            error: error.to_string(),
        });
    }

    pub fn tables(&self) -> &[TableReport] {
        &self.tables
    }

    pub fn failures(&self) -> &[TableFailure] {
        &self.failures
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn summary(&self) -> Result<DatabaseSummary> {
        let overflow = |what: &str| MemReportError::overflow(format!("database {what}"));
        let mut summary = DatabaseSummary {
            tables: self.tables.len(),
            failures: self.failures.len(),
            ..Default::default()
        };
        for table in &self.tables {
            summary.warnings += table.warnings.len();
            summary.logical_total = summary
                .logical_total
                .checked_add(&table.logical_total)
                .ok_or_else(|| overflow("logical total"))?;
            summary.physical_total = summary
                .physical_total
                .checked_add(&table.physical_total)
                .ok_or_else(|| overflow("physical total"))?;
            summary.stats_reported_bytes = summary
                .stats_reported_bytes
                .checked_add(table.stats_bytes.reported)
                .ok_or_else(|| overflow("reported bytes"))?;
            summary.stats_allocated_bytes = summary
                .stats_allocated_bytes
                .checked_add(table.stats_bytes.allocated)
                .ok_or_else(|| overflow("allocated bytes"))?;
            summary.index_bytes = summary
                .index_bytes
                .checked_add(table.index_total.unwrap_or(0))
                .ok_or_else(|| overflow("index bytes"))?;
        }
        Ok(summary)
    }
}

/// Fold finished table reports, in the order given, into a report model.
pub fn compute_database_report(
    profile_version: impl Into<String>,
    reports: impl IntoIterator<Item = TableReport>,
) -> ReportModel {
    let mut model = ReportModel::new(profile_version);
    for report in reports {
        model.push(report);
    }
    model
}

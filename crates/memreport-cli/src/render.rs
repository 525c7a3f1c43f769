//! Report presentation
//!
//! Turns a finished [`ReportModel`] into text, JSON or TOML. Nothing here
//! feeds back into the estimates.

use memreport_common::{as_mb, OutputFormat, Result, SizeEstimate};
use memreport_estimator::{DatabaseSummary, ReportModel, TableFailure, TableReport};
use serde::Serialize;
use std::fmt;

const WIDTH: usize = 100;

pub fn render(model: &ReportModel, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(TextReport::new(model)?.to_string()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&Rendered::new(model)?)?),
        OutputFormat::Toml => Ok(toml::to_string_pretty(&Rendered::new(model)?)?),
    }
}

/// Serialized form of a report: the model plus its summary
#[derive(Serialize)]
struct Rendered<'a> {
    profile_version: &'a str,
    summary: DatabaseSummary,
    tables: &'a [TableReport],
    failures: &'a [TableFailure],
}

impl<'a> Rendered<'a> {
    fn new(model: &'a ReportModel) -> Result<Self> {
        Ok(Self {
            profile_version: &model.profile_version,
            summary: model.summary()?,
            tables: model.tables(),
            failures: model.failures(),
        })
    }
}

/// Fixed-width text layout, one block per table followed by a summary
pub struct TextReport<'a> {
    model: &'a ReportModel,
    summary: DatabaseSummary,
}

impl<'a> TextReport<'a> {
    pub fn new(model: &'a ReportModel) -> Result<Self> {
        Ok(Self {
            model,
            summary: model.summary()?,
        })
    }
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in self.model.tables() {
            write_table(f, table)?;
        }
        if !self.model.failures().is_empty() {
            writeln!(f)?;
            writeln!(f, "FAILED TABLES")?;
            writeln!(f, "{}", "=".repeat(WIDTH))?;
            for failure in self.model.failures() {
                writeln!(f, "  {}: {}", failure.table, failure.error)?;
            }
        }
        write_summary(f, &self.model.profile_version, &self.summary)
    }
}

fn column_row(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    kind: &str,
    cells: [&dyn fmt::Display; 3],
) -> fmt::Result {
    writeln!(
        f,
        "  {:<30}  {:<15}  {:>15} {:>15} {:>15}",
        name, kind, cells[0], cells[1], cells[2]
    )
}

fn total_header(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
        f,
        "  {:<30}  {:>15}  {:>15} {:>15} {:>15}",
        "Total Size", "Row Count", "(MB) Min", "Actual", "Max"
    )?;
    writeln!(
        f,
        "  {:<30}  {:>15}  {:>15} {:>15} {:>15}",
        "----------", "---------", "---", "------", "---"
    )
}

fn total_row(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    rows: &str,
    total: &SizeEstimate,
) -> fmt::Result {
    writeln!(
        f,
        "  {:<30}  {:>15}  {:>15.2} {:>15.2} {:>15.2}",
        label,
        rows,
        as_mb(total.min),
        as_mb(total.actual),
        as_mb(total.max)
    )
}

fn mb_line(f: &mut fmt::Formatter<'_>, label: &str, bytes: u64) -> fmt::Result {
    writeln!(f, "  {:<60}     {:>15.2}", label, as_mb(bytes))
}

fn write_table(f: &mut fmt::Formatter<'_>, table: &TableReport) -> fmt::Result {
    writeln!(f)?;
    writeln!(
        f,
        "{}: {} ({})",
        table.kind,
        table.name,
        table.partitioning.label()
    )?;
    writeln!(f, "{}", "=".repeat(WIDTH))?;
    column_row(f, "Column Name", "Datatype", [&"(bytes) Min", &"Actual", &"Max"])?;
    column_row(f, "-----------", "--------", [&"---", &"------", &"---"])?;
    for column in &table.columns {
        let e = &column.estimate;
        column_row(
            f,
            &column.column.name,
            &column.column.display_type(),
            [&e.min, &e.actual, &e.max],
        )?;
    }
    writeln!(f, "{}", "-".repeat(WIDTH))?;
    let row = &table.per_row;
    column_row(f, "Per Row", "", [&row.min, &row.actual, &row.max])?;
    writeln!(f)?;

    total_header(f)?;
    total_row(f, "Logical", &table.row_counts.logical.to_string(), &table.logical_total)?;
    total_row(f, "Physical", &table.row_counts.physical.to_string(), &table.physical_total)?;
    writeln!(f)?;
    mb_line(f, "@Statistics", table.stats_bytes.reported)?;
    mb_line(f, "@Statistics (allocated)", table.stats_bytes.allocated)?;
    writeln!(f)?;

    if let Some(total) = table.index_total {
        writeln!(f, "INDEXES (bytes):")?;
        for (name, bytes) in &table.indexes {
            writeln!(f, "  {name}: {bytes}")?;
        }
        writeln!(f, "  TOTAL: {total}")?;
    }
    for warning in &table.warnings {
        writeln!(f, "WARNING: {warning}")?;
    }
    Ok(())
}

fn write_summary(
    f: &mut fmt::Formatter<'_>,
    profile: &str,
    summary: &DatabaseSummary,
) -> fmt::Result {
    writeln!(f)?;
    writeln!(
        f,
        "DATABASE: {} tables, {} failed, {} warnings (profile {})",
        summary.tables, summary.failures, summary.warnings, profile
    )?;
    writeln!(f, "{}", "=".repeat(WIDTH))?;
    total_header(f)?;
    total_row(f, "Logical", "", &summary.logical_total)?;
    total_row(f, "Physical", "", &summary.physical_total)?;
    writeln!(f)?;
    mb_line(f, "@Statistics", summary.stats_reported_bytes)?;
    mb_line(f, "@Statistics (allocated)", summary.stats_allocated_bytes)?;
    mb_line(f, "Indexes", summary.index_bytes)
}

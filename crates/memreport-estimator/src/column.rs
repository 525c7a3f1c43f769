//! Column estimation
//!
//! Turns one column's type, declared length, nullability and sampled length
//! distribution into a per-row `{min, actual, max}` byte cost.

use crate::formula::{fixed_width, variable_field_cost};
use memreport_common::{
    ColumnSpec, ColumnType, EstimateWarning, LengthSample, MemReportError, Result, SizeEstimate,
    SizingProfile,
};
use serde::{Deserialize, Serialize};

/// Where a column's bytes live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnStorage {
    /// Fixed-width numeric or temporal type
    Fixed,
    /// Short VARCHAR/VARBINARY kept inside the tuple
    Inline,
    /// VARCHAR/VARBINARY kept in the out-of-line pool
    OutOfLine,
    /// Type missing from the sizing tables, sized as zero
    Unknown,
}

/// Estimate for one column of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEstimate {
    pub column: ColumnSpec,
    pub storage: ColumnStorage,
    pub estimate: SizeEstimate,
    /// Rows the `actual` figure was averaged over; 0 when it fell back to `min`
    pub sampled_rows: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<EstimateWarning>,
}

impl ColumnEstimate {
    pub fn warning(&self) -> Option<EstimateWarning> {
        self.warning.clone()
    }
}

/// Options that change how a column is estimated
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateOptions {
    /// Reject unknown types instead of sizing them as zero
    pub strict_types: bool,
}

/// Declared length in bytes; VARCHAR lengths are characters at worst-case width.
pub fn declared_byte_length(profile: &SizingProfile, column: &ColumnSpec) -> Result<u64> {
    match column.column_type {
        ColumnType::Varchar => column
            .length
            .checked_mul(profile.varchar_bytes_per_char)
            .ok_or_else(|| MemReportError::overflow(format!("byte length of {}", column.name))),
        _ => Ok(column.length),
    }
}

/// Estimate one column.
///
/// `samples` is only read for out-of-line columns. When the table has no
/// rows or the sample is empty, `actual` falls back to `min`.
pub fn estimate_column(
    profile: &SizingProfile,
    column: &ColumnSpec,
    samples: &[LengthSample],
    logical_rows: u64,
    options: EstimateOptions,
) -> Result<ColumnEstimate> {
    if let Some(width) = fixed_width(profile, &column.column_type) {
        return Ok(ColumnEstimate {
            column: column.clone(),
            storage: ColumnStorage::Fixed,
            estimate: SizeEstimate::uniform(width),
            sampled_rows: 0,
            warning: None,
        });
    }

    if !column.column_type.is_variable() {
        if options.strict_types {
            return Err(MemReportError::UnknownType {
                column: column.name.clone(),
                type_name: column.column_type.to_string(),
            });
        }
        tracing::warn!(
            "Column {} has unknown type {}, sizing it as 0 bytes",
            column.name,
            column.column_type
        );
        return Ok(ColumnEstimate {
            column: column.clone(),
            storage: ColumnStorage::Unknown,
            estimate: SizeEstimate::default(),
            sampled_rows: 0,
            warning: Some(EstimateWarning::UnknownType {
                column: column.name.clone(),
                type_name: column.column_type.to_string(),
            }),
        });
    }

    let byte_length = declared_byte_length(profile, column)?;
    if byte_length < profile.inline_threshold {
        // inline payload plus a length byte
        let inline = byte_length
            .checked_add(1)
            .ok_or_else(|| MemReportError::overflow(format!("inline size of {}", column.name)))?;
        return Ok(ColumnEstimate {
            column: column.clone(),
            storage: ColumnStorage::Inline,
            estimate: SizeEstimate::uniform(inline),
            sampled_rows: 0,
            warning: None,
        });
    }

    let min = variable_field_cost(profile, if column.nullable { None } else { Some(0) })?;
    let max = variable_field_cost(profile, Some(byte_length))?;

    let (actual, sampled_rows) = match weighted_mean_cost(profile, samples)? {
        Some((mean, rows)) if logical_rows > 0 => (mean, rows),
        _ => (min, 0),
    };

    let longest = samples
        .iter()
        .filter(|s| s.count > 0)
        .filter_map(|s| s.length)
        .max();
    let warning = match longest {
        Some(observed) if sampled_rows > 0 && observed > byte_length => {
            tracing::warn!(
                "Column {} has a sampled value of {} bytes, over its declared {} bytes",
                column.name,
                observed,
                byte_length
            );
            Some(EstimateWarning::SampleExceedsDeclared {
                column: column.name.clone(),
                observed,
                declared: byte_length,
            })
        }
        _ => None,
    };

    tracing::debug!(
        "Column {} ({}): min={} actual={} max={} over {} sampled rows",
        column.name,
        column.display_type(),
        min,
        actual,
        max,
        sampled_rows
    );

    Ok(ColumnEstimate {
        column: column.clone(),
        storage: ColumnStorage::OutOfLine,
        estimate: SizeEstimate::new(min, actual, max),
        sampled_rows,
        warning,
    })
}

/// `sum(cost(length) * count) / sum(count)` with truncating division, and
/// the row total. `None` when the samples cover no rows.
pub fn weighted_mean_cost(
    profile: &SizingProfile,
    samples: &[LengthSample],
) -> Result<Option<(u64, u64)>> {
    let mut total_bytes: u64 = 0;
    let mut total_rows: u64 = 0;
    for sample in samples {
        let cost = variable_field_cost(profile, sample.length)?;
        total_bytes = cost
            .checked_mul(sample.count)
            .and_then(|bytes| total_bytes.checked_add(bytes))
            .ok_or_else(|| MemReportError::overflow("sampled variable bytes"))?;
        total_rows = total_rows
            .checked_add(sample.count)
            .ok_or_else(|| MemReportError::overflow("sampled row count"))?;
    }
    if total_rows == 0 {
        return Ok(None);
    }
    Ok(Some((total_bytes / total_rows, total_rows)))
}

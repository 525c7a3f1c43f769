//! Size formulas
//!
//! Pure functions over a [`SizingProfile`]: allocator block rounding, the
//! cost of one out-of-line variable-length value, and the fixed type width
//! lookup.

use memreport_common::{ColumnType, MemReportError, Result, SizingProfile};

/// Smallest block size in the profile table that is `>= n`.
///
/// A request above the largest block is a [`MemReportError::BlockSizeOverflow`]:
/// clamping would silently understate the estimate.
pub fn round_to_block_size(profile: &SizingProfile, n: u64) -> Result<u64> {
    let idx = profile.block_sizes.partition_point(|&size| size < n);
    profile
        .block_sizes
        .get(idx)
        .copied()
        .ok_or(MemReportError::BlockSizeOverflow {
            requested: n,
            ceiling: profile.block_ceiling(),
        })
}

/// Bytes taken by one variable-length value stored out-of-line.
///
/// `None` is a null value: only the inline pointer is paid. Otherwise the
/// pool allocation (payload + pool header, rounded to a block) plus the
/// reference object plus the inline pointer.
pub fn variable_field_cost(profile: &SizingProfile, length: Option<u64>) -> Result<u64> {
    let Some(length) = length else {
        return Ok(profile.inline_pointer);
    };

    let requested = length
        .checked_add(profile.pool_overhead)
        .ok_or_else(|| MemReportError::overflow(format!("pool allocation for {length} bytes")))?;
    round_to_block_size(profile, requested)?
        .checked_add(profile.ref_object_overhead)
        .and_then(|bytes| bytes.checked_add(profile.inline_pointer))
        .ok_or_else(|| MemReportError::overflow(format!("variable field cost for {length} bytes")))
}

/// Fixed width of a non-variable type, `None` for VARCHAR/VARBINARY and
/// unknown types.
pub fn fixed_width(profile: &SizingProfile, column_type: &ColumnType) -> Option<u64> {
    let widths = &profile.type_widths;
    match column_type {
        ColumnType::TinyInt => Some(widths.tinyint),
        ColumnType::SmallInt => Some(widths.smallint),
        ColumnType::Integer => Some(widths.integer),
        ColumnType::BigInt => Some(widths.bigint),
        ColumnType::Float => Some(widths.float),
        ColumnType::Timestamp => Some(widths.timestamp),
        ColumnType::Decimal => Some(widths.decimal),
        ColumnType::Varchar | ColumnType::Varbinary | ColumnType::Other(_) => None,
    }
}

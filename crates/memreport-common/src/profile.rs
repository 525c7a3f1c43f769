//! Sizing profile: the storage layout constants the estimator works from
//!
//! A profile bundles the allocator block-size table, the out-of-line pool
//! overheads and the fixed type widths of one target storage engine. The
//! built-in `v1` profile matches an engine whose variable-length pool uses
//! an 8-byte reverse pointer plus a 4-byte length header per allocation and
//! a 16-byte reference object per value.

use crate::{MemReportError, Result};
use serde::{Deserialize, Serialize};

/// Allocator block sizes of the `v1` profile, ascending
pub const BLOCK_SIZES_V1: &[u64] = &[
    1, 2, 4, 6, 8, 12, 16, 24, 32, 48, 64, 96, 128, 192, 256, 384, 512, 768, 1024, 1536, 2048,
    3072, 4096, 6144, 8192, 12288, 16384, 24576, 32768, 49152, 65536, 98304, 131072, 196608,
    262144, 393216, 524288, 786432, 1048576,
];

/// Pointer stored inline in the tuple for an out-of-line value
pub const INLINE_POINTER: u64 = 8;
/// Reference object kept per out-of-line value (two 8-byte fields)
pub const REF_OBJECT_OVERHEAD: u64 = 8 + 8;
/// Pool allocation header: reverse pointer + length
pub const POOL_OVERHEAD: u64 = 8 + 4;
/// Variable-length values shorter than this (in bytes) are stored inline
pub const INLINE_THRESHOLD: u64 = 64;
/// Worst-case bytes per VARCHAR character
pub const VARCHAR_BYTES_PER_CHAR: u64 = 4;

pub const PROFILE_V1: &str = "v1";

/// Fixed byte widths per column type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeWidths {
    pub tinyint: u64,
    pub smallint: u64,
    pub integer: u64,
    pub bigint: u64,
    pub float: u64,
    pub timestamp: u64,
    pub decimal: u64,
}

impl Default for TypeWidths {
    fn default() -> Self {
        Self {
            tinyint: 1,
            smallint: 2,
            integer: 4,
            bigint: 8,
            float: 8,
            timestamp: 8,
            decimal: 16,
        }
    }
}

/// Storage layout constants for one target engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingProfile {
    /// Label recorded in every report built from this profile
    pub version: String,

    /// Allocator block sizes, strictly ascending
    pub block_sizes: Vec<u64>,

    pub inline_pointer: u64,
    pub ref_object_overhead: u64,
    pub pool_overhead: u64,

    /// Declared byte length at which VARCHAR/VARBINARY move out-of-line
    pub inline_threshold: u64,

    pub varchar_bytes_per_char: u64,

    pub type_widths: TypeWidths,
}

impl Default for SizingProfile {
    fn default() -> Self {
        Self {
            version: PROFILE_V1.to_string(),
            block_sizes: BLOCK_SIZES_V1.to_vec(),
            inline_pointer: INLINE_POINTER,
            ref_object_overhead: REF_OBJECT_OVERHEAD,
            pool_overhead: POOL_OVERHEAD,
            inline_threshold: INLINE_THRESHOLD,
            varchar_bytes_per_char: VARCHAR_BYTES_PER_CHAR,
            type_widths: TypeWidths::default(),
        }
    }
}

impl SizingProfile {
    /// Check the block table is usable for rounding
    pub fn validate(&self) -> Result<()> {
        if self.block_sizes.is_empty() {
            return Err(MemReportError::InvalidProfile(format!(
                "profile '{}' has an empty block size table",
                self.version
            )));
        }
        if let Some(pair) = self.block_sizes.windows(2).find(|w| w[0] >= w[1]) {
            return Err(MemReportError::InvalidProfile(format!(
                "profile '{}' block sizes must be strictly ascending ({} >= {})",
                self.version, pair[0], pair[1]
            )));
        }
        if self.inline_threshold == 0 {
            return Err(MemReportError::InvalidProfile(format!(
                "profile '{}' inline_threshold must be positive",
                self.version
            )));
        }
        Ok(())
    }

    /// Largest allocation the block table can serve
    pub fn block_ceiling(&self) -> u64 {
        self.block_sizes.last().copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_valid() {
        let profile = SizingProfile::default();
        profile.validate().unwrap();
        assert_eq!(profile.block_ceiling(), 1_048_576);
        assert_eq!(profile.pool_overhead, 12);
        assert_eq!(profile.ref_object_overhead, 16);
    }

    #[test]
    fn test_rejects_unsorted_blocks() {
        let profile = SizingProfile {
            block_sizes: vec![1, 4, 2],
            ..Default::default()
        };
        assert!(matches!(
            profile.validate(),
            Err(MemReportError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_rejects_empty_blocks() {
        let profile = SizingProfile {
            block_sizes: vec![],
            ..Default::default()
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_partial_profile_from_toml() {
        let profile: SizingProfile = toml::from_str(
            r#"
            version = "custom"
            inline_pointer = 16
            "#,
        )
        .unwrap();
        assert_eq!(profile.version, "custom");
        assert_eq!(profile.inline_pointer, 16);
        assert_eq!(profile.block_sizes, BLOCK_SIZES_V1);
        assert_eq!(profile.type_widths.decimal, 16);
    }
}

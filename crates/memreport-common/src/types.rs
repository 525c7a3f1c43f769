//! Memreport Core Types

use serde::{Deserialize, Serialize};

/// Logical column type as reported by schema metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Timestamp,
    Decimal,
    Varchar,
    Varbinary,
    /// Any type name the sizing tables do not know about
    Other(String),
}

impl ColumnType {
    /// Parse a catalog type name. Matching is case-insensitive.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "TINYINT" => Self::TinyInt,
            "SMALLINT" => Self::SmallInt,
            "INTEGER" => Self::Integer,
            "BIGINT" => Self::BigInt,
            "FLOAT" => Self::Float,
            "TIMESTAMP" => Self::Timestamp,
            "DECIMAL" => Self::Decimal,
            "VARCHAR" => Self::Varchar,
            "VARBINARY" => Self::Varbinary,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Float => "FLOAT",
            Self::Timestamp => "TIMESTAMP",
            Self::Decimal => "DECIMAL",
            Self::Varchar => "VARCHAR",
            Self::Varbinary => "VARBINARY",
            Self::Other(name) => name,
        }
    }

    /// VARCHAR and VARBINARY may be stored out-of-line
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Varchar | Self::Varbinary)
    }
}

impl From<String> for ColumnType {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<ColumnType> for String {
    fn from(ty: ColumnType) -> Self {
        ty.name().to_string()
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Column metadata from the schema provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Declared length: characters for VARCHAR, bytes otherwise
    #[serde(default)]
    pub length: u64,

    #[serde(default)]
    pub nullable: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType, length: u64, nullable: bool) -> Self {
        Self {
            name: name.into(),
            column_type,
            length,
            nullable,
        }
    }

    /// Type name as shown in reports, e.g. `VARCHAR(100)`
    pub fn display_type(&self) -> String {
        if self.column_type.is_variable() {
            format!("{}({})", self.column_type, self.length)
        } else {
            self.column_type.to_string()
        }
    }
}

/// One entry of a sampled length distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LengthSample {
    /// Observed payload length in bytes. `None` for a sampled null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    pub count: u64,
}

impl LengthSample {
    pub fn new(length: u64, count: u64) -> Self {
        Self {
            length: Some(length),
            count,
        }
    }

    pub fn null(count: u64) -> Self {
        Self {
            length: None,
            count,
        }
    }
}

/// Per-row byte cost bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeEstimate {
    pub min: u64,
    pub actual: u64,
    pub max: u64,
}

impl SizeEstimate {
    pub fn new(min: u64, actual: u64, max: u64) -> Self {
        Self { min, actual, max }
    }

    /// Same value for min, actual and max
    pub fn uniform(bytes: u64) -> Self {
        Self::new(bytes, bytes, bytes)
    }

    pub fn checked_add(&self, other: &SizeEstimate) -> Option<SizeEstimate> {
        Some(Self {
            min: self.min.checked_add(other.min)?,
            actual: self.actual.checked_add(other.actual)?,
            max: self.max.checked_add(other.max)?,
        })
    }

    pub fn checked_mul(&self, factor: u64) -> Option<SizeEstimate> {
        Some(Self {
            min: self.min.checked_mul(factor)?,
            actual: self.actual.checked_mul(factor)?,
            max: self.max.checked_mul(factor)?,
        })
    }
}

/// Table kind as reported by the catalog (TABLE, VIEW, EXPORT, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TableKind {
    Table,
    View,
    Export,
    Other(String),
}

impl TableKind {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "TABLE" => Self::Table,
            "VIEW" => Self::View,
            "EXPORT" => Self::Export,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::Export => "EXPORT",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for TableKind {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<TableKind> for String {
    fn from(kind: TableKind) -> Self {
        kind.name().to_string()
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a table's rows are spread across the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partitioning {
    Partitioned,
    #[default]
    Replicated,
}

impl Partitioning {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Partitioned => "PARTITIONED",
            Self::Replicated => "REPLICATED",
        }
    }
}

/// Table metadata from the schema provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,

    #[serde(default = "default_table_kind")]
    pub kind: TableKind,

    #[serde(default)]
    pub partitioning: Partitioning,
}

fn default_table_kind() -> TableKind {
    TableKind::Table
}

impl TableMeta {
    pub fn new(name: impl Into<String>, kind: TableKind, partitioning: Partitioning) -> Self {
        Self {
            name: name.into(),
            kind,
            partitioning,
        }
    }
}

/// Logical and physical (replica-summed) row counts for one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounts {
    pub logical: u64,
    pub physical: u64,
}

impl RowCounts {
    pub fn new(logical: u64, physical: u64) -> Self {
        Self { logical, physical }
    }
}

/// Non-fatal findings attached to a table report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimateWarning {
    /// Column type missing from the sizing tables; counted as zero bytes
    UnknownType { column: String, type_name: String },
    /// A sampled value is longer than the declared byte length, so `actual`
    /// may exceed `max`
    SampleExceedsDeclared {
        column: String,
        observed: u64,
        declared: u64,
    },
}

impl std::fmt::Display for EstimateWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownType { column, type_name } => {
                write!(f, "column {column}: unknown type {type_name}, sized as 0 bytes")
            }
            Self::SampleExceedsDeclared {
                column,
                observed,
                declared,
            } => write!(
                f,
                "column {column}: sampled value of {observed} bytes exceeds declared {declared} bytes"
            ),
        }
    }
}

/// Bytes to megabytes, as shown in reports
pub fn as_mb(bytes: u64) -> f64 {
    bytes as f64 / 1_048_576.0
}

/// Bytes to gigabytes
pub fn as_gb(bytes: u64) -> f64 {
    bytes as f64 / 1_073_741_824.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_parse_is_case_insensitive() {
        assert_eq!(ColumnType::parse("varchar"), ColumnType::Varchar);
        assert_eq!(ColumnType::parse(" BigInt "), ColumnType::BigInt);
        assert_eq!(
            ColumnType::parse("geography"),
            ColumnType::Other("GEOGRAPHY".to_string())
        );
    }

    #[test]
    fn test_display_type() {
        let col = ColumnSpec::new("name", ColumnType::Varchar, 100, true);
        assert_eq!(col.display_type(), "VARCHAR(100)");

        let col = ColumnSpec::new("id", ColumnType::Integer, 4, false);
        assert_eq!(col.display_type(), "INTEGER");
    }

    #[test]
    fn test_size_estimate_checked_ops() {
        let a = SizeEstimate::new(1, 2, 3);
        let b = SizeEstimate::uniform(10);
        assert_eq!(a.checked_add(&b), Some(SizeEstimate::new(11, 12, 13)));
        assert_eq!(a.checked_mul(1000), Some(SizeEstimate::new(1000, 2000, 3000)));
        assert_eq!(SizeEstimate::uniform(u64::MAX).checked_add(&a), None);
        assert_eq!(SizeEstimate::uniform(u64::MAX).checked_mul(2), None);
    }

    #[test]
    fn test_partitioning_defaults_to_replicated() {
        let meta: TableMeta = toml::from_str(r#"name = "T""#).unwrap();
        assert_eq!(meta.partitioning.label(), "REPLICATED");
        assert_eq!(meta.kind, TableKind::Table);
        assert_eq!(Partitioning::Partitioned.label(), "PARTITIONED");
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(as_mb(1_048_576), 1.0);
        assert_eq!(as_gb(2 * 1_073_741_824), 2.0);
    }

    #[test]
    fn test_column_spec_toml() {
        let col: ColumnSpec = toml::from_str(
            r#"
            name = "payload"
            type = "varbinary"
            length = 2048
            nullable = true
            "#,
        )
        .unwrap();
        assert_eq!(col.column_type, ColumnType::Varbinary);
        assert_eq!(col.length, 2048);
        assert!(col.nullable);
    }
}

//! Memreport Catalog - Schema, row-count, sampling and statistics sources

pub mod in_memory;
pub mod snapshot;
pub mod stats;
pub mod traits;

pub use in_memory::InMemoryCatalog;
pub use snapshot::{ColumnSamples, DatabaseSnapshot, TableSnapshot};
pub use stats::{
    fold_index_rows, fold_table_rows, IndexSizes, IndexStatsRow, TableStats, TableStatsRow,
};
pub use traits::{DataSource, RowCountProvider, Sampler, SchemaProvider, StatisticsProvider};

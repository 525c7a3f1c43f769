//! Test: Parquet tables through the DataFusion source
//!
//! 1. Write a small Parquet file with DataFusion
//! 2. Register it and read schema, row count and length samples back

use std::sync::Arc;

use arrow_array::{BinaryArray, Int32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::prelude::SessionContext;
use memreport_catalog::{RowCountProvider, Sampler, SchemaProvider, StatisticsProvider};
use memreport_common::{ColumnType, LengthDefaults, LengthSample};
use memreport_executor::{DataFusionSource, RegisteredTableSource};

async fn write_parquet(path: &std::path::Path) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("title", DataType::Utf8, true),
        Field::new("payload", DataType::Binary, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int32Array::from(vec![1, 2, 3, 4, 5])),
            Arc::new(StringArray::from(vec![
                Some("a"),
                Some("bb"),
                Some("bb"),
                None,
                Some("dddd"),
            ])),
            Arc::new(BinaryArray::from(vec![
                Some(&b"xyz"[..]),
                Some(&b"xyz"[..]),
                None,
                None,
                Some(&b""[..]),
            ])),
        ],
    )
    .unwrap();

    let ctx = SessionContext::new();
    ctx.read_batch(batch)
        .unwrap()
        .write_parquet(
            path.to_str().unwrap(),
            DataFrameWriteOptions::new().with_single_file_output(true),
            None,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_parquet_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docs.parquet");
    write_parquet(&path).await;

    let mut lengths = LengthDefaults::default();
    lengths.overrides.insert("docs.title".to_string(), 40);
    let source = DataFusionSource::new(lengths);
    source.register_parquet("docs", &path).await.unwrap();
    assert!(matches!(
        source.registered_source("docs"),
        Some(RegisteredTableSource::Parquet { .. })
    ));

    let columns = source.columns("docs").await.unwrap();
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[0].column_type, ColumnType::Integer);
    assert_eq!(columns[0].length, 4);
    assert_eq!(columns[1].column_type, ColumnType::Varchar);
    assert_eq!(columns[1].length, 40);
    assert_eq!(columns[2].column_type, ColumnType::Varbinary);
    assert_eq!(columns[2].length, 1024);

    assert_eq!(source.logical_row_count("docs").await.unwrap(), 5);

    let titles = source.sample_lengths("docs", "title", 100).await.unwrap();
    assert_eq!(
        titles,
        vec![
            LengthSample::null(1),
            LengthSample::new(1, 1),
            LengthSample::new(2, 2),
            LengthSample::new(4, 1),
        ]
    );

    let payloads = source.sample_lengths("docs", "payload", 100).await.unwrap();
    assert_eq!(
        payloads,
        vec![
            LengthSample::null(2),
            LengthSample::new(0, 1),
            LengthSample::new(3, 2),
        ]
    );

    let stats = source
        .table_statistics(&["docs".to_string()])
        .await
        .unwrap();
    assert_eq!(stats["docs"].tuple_count, 5);
    assert!(stats["docs"].tuple_data_kb >= 1);
}

//! Memreport Binary

use clap::Parser;
use memreport_catalog::{DataSource, DatabaseSnapshot};
use memreport_common::{ErrorPolicy, OutputFormat, ReportConfig};
use memreport_coordinator::ReportCoordinator;
use memreport_executor::DataFusionSource;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod render;

/// Memreport CLI
#[derive(Parser, Debug)]
#[command(name = "memreport")]
#[command(version = "0.1.0")]
#[command(about = "Per-column tuple memory estimates for a tabular database")]
struct Args {
    /// Config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read tables, samples and statistics from a snapshot file
    #[arg(long, conflicts_with_all = ["load_csv", "load_parquet"])]
    snapshot: Option<PathBuf>,

    /// Load CSV files: table_name=path pairs, e.g. --load-csv users=/path/to/users.csv
    #[arg(long, value_parser = parse_table_pair)]
    load_csv: Vec<(String, PathBuf)>,

    /// Load Parquet files: table_name=path pairs
    #[arg(long, value_parser = parse_table_pair)]
    load_parquet: Vec<(String, PathBuf)>,

    /// Report a single table instead of ALL
    #[arg(long)]
    table: Option<String>,

    /// Rows sampled per variable-length column
    #[arg(long)]
    sample_size: Option<u64>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// What to do when a table cannot be estimated
    #[arg(long, value_enum)]
    on_error: Option<ErrorPolicy>,

    /// Leave index sizes out of the report
    #[arg(long)]
    no_indexes: bool,

    /// Fail a table on unknown column types instead of sizing them as 0
    #[arg(long)]
    strict_types: bool,

    /// Also write what the data source returned to a snapshot file
    #[arg(long)]
    save_snapshot: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_table_pair(s: &str) -> Result<(String, PathBuf), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!("Expected format: table_name=path, got: {s}"));
    }
    Ok((parts[0].to_string(), PathBuf::from(parts[1])))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> anyhow::Result<ReportConfig> {
    let mut config = match &args.config {
        Some(path) => ReportConfig::load_from_file(path)?,
        None => ReportConfig::default(),
    };
    if let Some(table) = &args.table {
        config.table = table.clone();
    }
    if let Some(sample_size) = args.sample_size {
        config.sample_size = sample_size;
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if let Some(on_error) = args.on_error {
        config.on_error = on_error;
    }
    if args.no_indexes {
        config.include_indexes = false;
    }
    if args.strict_types {
        config.strict_types = true;
    }
    config.validate()?;
    Ok(config)
}

async fn open_source(args: &Args, config: &ReportConfig) -> anyhow::Result<Arc<dyn DataSource>> {
    if let Some(path) = &args.snapshot {
        let catalog = DatabaseSnapshot::load_from_file(path)?.into_catalog()?;
        tracing::info!("Loaded snapshot {:?}", path);
        return Ok(Arc::new(catalog));
    }
    if args.load_csv.is_empty() && args.load_parquet.is_empty() {
        anyhow::bail!("no data source: pass --snapshot, --load-csv or --load-parquet");
    }

    let source = DataFusionSource::new(config.lengths.clone());
    for (table_name, path) in &args.load_csv {
        source.register_csv(table_name, path).await?;
    }
    for (table_name, path) in &args.load_parquet {
        source.register_parquet(table_name, path).await?;
    }
    Ok(Arc::new(source))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = build_config(&args)?;
    let source = open_source(&args, &config).await?;
    let format = config.format;
    let coordinator = ReportCoordinator::new(source, config)?;

    if let Some(path) = &args.save_snapshot {
        coordinator.capture_snapshot().await?.save_to_file(path)?;
        tracing::info!("Saved snapshot to {:?}", path);
    }

    let model = coordinator.run().await?;
    println!("{}", render::render(&model, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_pair() {
        assert_eq!(
            parse_table_pair("users=/data/users.csv").unwrap(),
            ("users".to_string(), PathBuf::from("/data/users.csv"))
        );
        assert!(parse_table_pair("users").is_err());
        assert!(parse_table_pair("=x.csv").is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "memreport",
            "--snapshot",
            "db.toml",
            "--table",
            "orders",
            "--sample-size",
            "10",
            "--format",
            "json",
            "--on-error",
            "abort",
            "--no-indexes",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.table, "orders");
        assert_eq!(config.sample_size, 10);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.on_error, ErrorPolicy::Abort);
        assert!(!config.include_indexes);
        assert!(!config.strict_types);
    }

    #[test]
    fn test_snapshot_conflicts_with_files() {
        let parsed = Args::try_parse_from([
            "memreport",
            "--snapshot",
            "db.toml",
            "--load-csv",
            "t=t.csv",
        ]);
        assert!(parsed.is_err());
    }
}

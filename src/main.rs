use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use procurement_ingest::config::IngestConfig;
use procurement_ingest::graph::{GraphStore, InMemoryGraph, Neo4jStore};
use procurement_ingest::pipeline::{self, Pipeline, PipelineOptions, StoreTarget};
use procurement_ingest::{logging, metrics};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "procurement-ingest")]
#[command(about = "Load the procurement CSV extract into a Neo4j graph")]
#[command(version)]
struct Cli {
    /// TOML config file (defaults to ./ingest.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// CSV extract to read (overrides CSV_PATH)
    #[arg(long)]
    csv_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full ingest: read, clean, constrain, load, verify
    Run {
        #[command(flatten)]
        source: SourceArgs,
        /// Rows per write transaction
        #[arg(long)]
        batch_size: Option<usize>,
        /// Fail when any row is dropped for a missing key
        #[arg(long)]
        strict: bool,
        /// Load into an in-memory graph instead of Neo4j
        #[arg(long)]
        dry_run: bool,
        /// Hide batch progress bars
        #[arg(long)]
        no_progress: bool,
        /// Write a Prometheus text snapshot here after the run
        #[arg(long)]
        metrics_out: Option<PathBuf>,
        /// Write the run summary as JSON here
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },
    /// Declare the uniqueness constraints only
    Schema,
    /// Print node and relationship counts from Neo4j
    Counts,
    /// Read and clean the extract and report key counts, without a database
    Inspect {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();
    metrics::init_metrics();

    let cli = Cli::parse();
    let mut config = IngestConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Run {
            source,
            batch_size,
            strict,
            dry_run,
            no_progress,
            metrics_out,
            summary_json,
        } => {
            if let Some(path) = source.csv_path {
                config.csv_path = path;
            }
            if let Some(size) = batch_size {
                config.batch_size = size;
            }
            config.strict |= strict;
            config.validate()?;

            let mut options = PipelineOptions::from_config(&config);
            options.show_progress = !no_progress;

            let target = if dry_run {
                println!("🧪 Dry run: loading into an in-memory graph");
                StoreTarget::Open(Arc::new(InMemoryGraph::new()))
            } else {
                StoreTarget::Neo4j(config.neo4j.clone())
            };

            let result = Pipeline::run(&config.csv_path, target, options).await;

            if let Some(path) = metrics_out {
                match metrics::write_snapshot(&path) {
                    Ok(true) => {}
                    Ok(false) => info!("No metrics recorder installed, skipping snapshot"),
                    Err(e) => error!("Failed to write metrics snapshot: {}", e),
                }
            }

            match result {
                Ok(summary) => {
                    summary.print();
                    if let Some(path) = summary_json {
                        summary.write_json(&path)?;
                    }
                }
                Err(e) => {
                    println!("❌ Ingest failed ({:?}): {}", e.class(), e);
                    return Err(e.into());
                }
            }
        }
        Commands::Schema => {
            config.validate()?;
            println!("🔐 Declaring uniqueness constraints...");
            let store = Neo4jStore::connect(&config.neo4j).await?;
            pipeline::ensure_schema(&store).await?;
            store.close().await?;
            println!("✅ Constraints in place");
        }
        Commands::Counts => {
            config.validate()?;
            let store = Neo4jStore::connect(&config.neo4j).await?;
            let counts = pipeline::report_counts(&store).await;
            store.close().await?;
            counts?;
        }
        Commands::Inspect { source } => {
            let csv_path = source.csv_path.unwrap_or(config.csv_path);
            let inspection = Pipeline::inspect(&csv_path)?;
            let invalid = inspection.dates.invalid_total();
            println!("\n📅 Date columns:");
            for (column, count) in &inspection.dates.formatted {
                println!("  {:<26}: {} formatted", column, count);
            }
            for column in &inspection.dates.skipped {
                println!("  {:<26}: not present", column);
            }
            if invalid > 0 {
                println!("⚠️ {} date value(s) will be stored as null", invalid);
            }
            println!(
                "✅ {} rows ready to load",
                inspection.table.row_count()
            );
        }
    }
    Ok(())
}

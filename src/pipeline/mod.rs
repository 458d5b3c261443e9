//! The ingest pipeline: read, clean, constrain, load nodes, load
//! relationships, verify. Stages run strictly in sequence over one store.

pub mod context;
pub mod nodes;
pub mod relationships;
pub mod summary;

pub use context::{PipelineContext, PipelineOptions};
pub use nodes::NodeLoadStats;
pub use relationships::RelationshipLoadStats;
pub use summary::RunSummary;

use crate::config::Neo4jConfig;
use crate::error::Result;
use crate::fingerprint::source_fingerprint;
use crate::graph::{GraphStore, Neo4jStore, NodeCounts, RelationshipCounts};
use crate::loader::{load_csv, required_columns, KeySummary};
use crate::metrics::IngestMetrics;
use crate::model::EntityKind;
use crate::table::Table;
use crate::timing::StepTimer;
use crate::transform::{format_date_columns, DateReport};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Where the run writes.
pub enum StoreTarget {
    /// Connect to a Neo4j server during the run.
    Neo4j(Neo4jConfig),
    /// Use an already open store (dry runs, tests).
    Open(Arc<dyn GraphStore>),
}

impl StoreTarget {
    pub fn is_remote(&self) -> bool {
        matches!(self, StoreTarget::Neo4j(_))
    }

    async fn open(self) -> Result<Arc<dyn GraphStore>> {
        match self {
            StoreTarget::Neo4j(config) => {
                let store: Arc<dyn GraphStore> = Arc::new(Neo4jStore::connect(&config).await?);
                Ok(store)
            }
            StoreTarget::Open(store) => Ok(store),
        }
    }
}

/// Output of the read-only `inspect` path.
#[derive(Debug)]
pub struct Inspection {
    pub table: Table,
    pub keys: KeySummary,
    pub dates: DateReport,
}

pub struct Pipeline;

impl Pipeline {
    /// Read, validate and clean the extract without touching a database.
    pub fn inspect(csv_path: &Path) -> Result<Inspection> {
        let mut timer = StepTimer::new();
        let (mut table, keys) = Self::read_source(&mut timer, csv_path)?;
        let dates = Self::format_dates(&mut timer, &mut table);
        Ok(Inspection { table, keys, dates })
    }

    /// Full run. Setup failures (unreadable file, missing columns, no
    /// database) and strict-mode key gaps surface before any write; a failed
    /// batch aborts the run and leaves earlier batches committed.
    #[instrument(skip(target, options), fields(csv = %csv_path.display()))]
    pub async fn run(
        csv_path: &Path,
        target: StoreTarget,
        options: PipelineOptions,
    ) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let dry_run = !target.is_remote();
        info!(%run_id, dry_run, batch_size = options.batch_size, "Starting ingest run");

        let mut timer = StepTimer::new();
        let (mut table, keys) = Self::read_source(&mut timer, csv_path)?;
        let source_sha256 = match source_fingerprint(csv_path) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!("Could not fingerprint {}: {}", csv_path.display(), e);
                None
            }
        };
        let dates = Self::format_dates(&mut timer, &mut table);
        if options.strict {
            nodes::check_strict(&table)?;
        }

        let step = if dry_run {
            "Step 3: Opening In-Memory Graph"
        } else {
            "Step 3: Connecting to Neo4j"
        };
        timer.start(step);
        let store = target.open().await?;
        timer.end(step);

        let mut summary = RunSummary {
            run_id,
            started_at,
            source: csv_path.display().to_string(),
            source_sha256,
            rows: table.row_count(),
            columns: table.column_count(),
            distinct_keys: keys,
            dates,
            nodes: Vec::new(),
            relationships: Vec::new(),
            node_counts: NodeCounts::new(),
            relationship_counts: RelationshipCounts::new(),
            steps: Vec::new(),
            total_secs: 0.0,
            dry_run,
        };

        let mut ctx = PipelineContext {
            table,
            store,
            timer,
            options,
        };
        let outcome = Self::load(&mut ctx, &mut summary).await;
        let closed = ctx.store.close().await;

        match (outcome, closed) {
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!("Failed to close store after error: {}", close_err);
                }
                error!(class = ?e.class(), "Ingest run failed: {}", e);
                Err(e)
            }
            (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => {
                summary.steps = ctx
                    .timer
                    .finished()
                    .iter()
                    .map(|(name, d)| (name.clone(), d.as_secs_f64()))
                    .collect();
                summary.total_secs = ctx.timer.total().as_secs_f64();
                Ok(summary)
            }
        }
    }

    async fn load(ctx: &mut PipelineContext, summary: &mut RunSummary) -> Result<()> {
        init_schema(ctx).await?;
        summary.nodes = nodes::load_nodes(ctx).await?;
        let node_counts = nodes::verify_nodes(ctx).await?;
        summary.relationships = relationships::load_relationships(ctx).await?;
        let relationship_counts = relationships::verify_relationships(ctx).await?;
        summary.set_counts(node_counts, relationship_counts);
        Ok(())
    }

    fn read_source(timer: &mut StepTimer, csv_path: &Path) -> Result<(Table, KeySummary)> {
        let step = "Step 1: Reading CSV";
        timer.start(step);
        let table = load_csv(csv_path)?;
        println!(
            "📦 Read {} rows and {} columns from {}",
            table.row_count(),
            table.column_count(),
            csv_path.display()
        );
        IngestMetrics::record_rows_loaded(table.row_count());

        let keys = KeySummary::from_table(&table);
        keys.print();
        table.require_columns(&required_columns())?;
        timer.end(step);
        Ok((table, keys))
    }

    fn format_dates(timer: &mut StepTimer, table: &mut Table) -> DateReport {
        let step = "Step 2: Formatting Dates";
        timer.start(step);
        let report = format_date_columns(table);
        IngestMetrics::record_invalid_dates(report.invalid_total());
        timer.end(step);
        report
    }
}

/// Declare the uniqueness constraint on every entity key. Safe to repeat.
pub async fn init_schema(ctx: &mut PipelineContext) -> Result<()> {
    let step = "Step 4: Creating Constraints";
    ctx.timer.start(step);
    ensure_schema(ctx.store.as_ref()).await?;
    ctx.timer.end(step);
    Ok(())
}

pub async fn ensure_schema(store: &dyn GraphStore) -> Result<()> {
    store.ensure_constraints(&EntityKind::ALL).await?;
    for kind in EntityKind::ALL {
        info!("Constraint ensured on {}.{}", kind.label(), kind.key_field());
    }
    Ok(())
}

/// Run both verification queries against `store` and print them.
pub async fn report_counts(store: &dyn GraphStore) -> Result<(NodeCounts, RelationshipCounts)> {
    let node_counts = store.count_nodes().await?;
    nodes::print_node_counts(&node_counts);
    let relationship_counts = store.count_relationships().await?;
    relationships::print_relationship_counts(&relationship_counts);
    Ok((node_counts, relationship_counts))
}

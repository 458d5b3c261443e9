//! Node stage: one upsert pass per entity type.

use super::context::PipelineContext;
use crate::error::{IngestError, Result};
use crate::graph::NodeCounts;
use crate::metrics::IngestMetrics;
use crate::model::EntityKind;
use crate::table::{CellValue, PropertyMap, Table};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Serialize)]
pub struct NodeLoadStats {
    pub label: EntityKind,
    pub rows_written: usize,
    pub rows_dropped: usize,
    pub batches: usize,
    pub elapsed_secs: f64,
}

/// Split off rows whose key is null. Returns the kept rows and the drop count.
pub fn drop_null_keys(kind: EntityKind, rows: Vec<PropertyMap>) -> (Vec<PropertyMap>, usize) {
    let before = rows.len();
    let kept: Vec<PropertyMap> = rows.into_iter().filter(|row| has_key(kind, row)).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Strict mode: fail if any entity would lose rows to a null key. Runs over
/// the whole table before the first write.
pub fn check_strict(table: &Table) -> Result<()> {
    for kind in EntityKind::ALL {
        let dropped = table.null_count(kind.key_field());
        if dropped > 0 {
            return Err(IngestError::StrictViolation {
                label: kind.label().to_string(),
                field: kind.key_field().to_string(),
                dropped,
            });
        }
    }
    Ok(())
}

#[instrument(skip(ctx), fields(label = %kind))]
pub async fn load_entity(ctx: &mut PipelineContext, kind: EntityKind) -> Result<NodeLoadStats> {
    let step = format!("Ingesting {} Nodes", kind.label());
    ctx.timer.start(step.clone());

    let projected = ctx.table.project(kind.columns())?;
    let (rows, dropped) = drop_null_keys(kind, projected);
    if dropped > 0 {
        println!("⚠️ Dropped {} rows due to missing `{}`", dropped, kind.key_field());
        warn!(dropped, field = kind.key_field(), "Dropped rows with null key");
        IngestMetrics::record_rows_dropped(kind.label(), dropped);
    }

    let batch_size = ctx.batch_size();
    let bar = ctx.progress_bar(rows.len(), kind.label());
    let mut batches = 0;
    for (idx, chunk) in rows.chunks(batch_size).enumerate() {
        let started = Instant::now();
        ctx.store
            .upsert_nodes(kind, chunk)
            .await
            .map_err(|e| IngestError::BatchWrite {
                target: kind.label().to_string(),
                batch: idx + 1,
                message: e.to_string(),
            })?;
        let secs = started.elapsed().as_secs_f64();
        IngestMetrics::record_node_batch(kind.label(), chunk.len(), secs);
        debug!(batch = idx + 1, rows = chunk.len(), elapsed_secs = secs, "Committed node batch");
        bar.inc(chunk.len() as u64);
        batches += 1;
    }
    bar.finish_and_clear();

    let elapsed = ctx.timer.end(&step);
    info!(rows = rows.len(), dropped, batches, "Loaded {} nodes", kind.label());

    Ok(NodeLoadStats {
        label: kind,
        rows_written: rows.len(),
        rows_dropped: dropped,
        batches,
        elapsed_secs: elapsed.as_secs_f64(),
    })
}

/// Load every entity type in dependency order.
pub async fn load_nodes(ctx: &mut PipelineContext) -> Result<Vec<NodeLoadStats>> {
    let mut stats = Vec::with_capacity(EntityKind::ALL.len());
    for kind in EntityKind::ALL {
        stats.push(load_entity(ctx, kind).await?);
    }
    Ok(stats)
}

pub async fn verify_nodes(ctx: &mut PipelineContext) -> Result<NodeCounts> {
    let step = "Step 7: Confirming Node Counts";
    ctx.timer.start(step);
    let counts = ctx.store.count_nodes().await?;
    print_node_counts(&counts);
    ctx.timer.end(step);
    Ok(counts)
}

pub fn print_node_counts(counts: &NodeCounts) {
    println!("\n🔍 Node Count Summary (in Neo4j):");
    for (kind, count) in counts {
        println!("  {:<14}: {}", kind.label(), count);
        info!(label = %kind, count, "Node count");
    }
}

/// Whether a row would be kept by the node stage for `kind`.
pub fn has_key(kind: EntityKind, row: &PropertyMap) -> bool {
    !matches!(row.get(kind.key_field()), None | Some(CellValue::Null))
}

//! Relationship stage: distinct join-key pairs, merged in batches.

use super::context::PipelineContext;
use crate::error::{IngestError, Result};
use crate::graph::RelationshipCounts;
use crate::metrics::IngestMetrics;
use crate::model::RelationshipKind;
use crate::table::PropertyMap;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipLoadStats {
    pub rel_type: RelationshipKind,
    /// Rows with a null join key; the pair never reaches the store.
    pub null_key_rows: usize,
    /// Distinct non-null join-key combinations sent to the store.
    pub candidates: usize,
    pub matched: u64,
    /// Candidates whose source or target node does not exist.
    pub unmatched: u64,
    pub batches: usize,
    pub elapsed_secs: f64,
}

/// Drop rows with any null join key, then deduplicate the rest keeping the
/// first occurrence of each combination. Returns the candidates and the
/// null-key drop count.
pub fn distinct_candidates(rows: Vec<PropertyMap>) -> (Vec<PropertyMap>, usize) {
    let total = rows.len();
    let mut seen = HashSet::new();
    let mut null_key_rows = 0;
    let mut candidates = Vec::new();
    for row in rows {
        if row.values().any(|v| v.is_null()) {
            null_key_rows += 1;
            continue;
        }
        if seen.insert(row.clone()) {
            candidates.push(row);
        }
    }
    debug!(total, null_key_rows, distinct = candidates.len(), "Deduplicated join keys");
    (candidates, null_key_rows)
}

#[instrument(skip(ctx), fields(rel_type = kind.rel_type()))]
pub async fn load_relationship(
    ctx: &mut PipelineContext,
    kind: RelationshipKind,
) -> Result<RelationshipLoadStats> {
    let step = format!("Step 8: Creating {} Relationships", kind.rel_type());
    ctx.timer.start(step.clone());

    let projected = ctx.table.project(&kind.join_columns())?;
    let (candidates, null_key_rows) = distinct_candidates(projected);

    let batch_size = ctx.batch_size();
    let bar = ctx.progress_bar(candidates.len(), kind.rel_type());
    let mut matched = 0u64;
    let mut batches = 0;
    for (idx, chunk) in candidates.chunks(batch_size).enumerate() {
        let started = Instant::now();
        let batch_matched = ctx
            .store
            .merge_relationships(kind, chunk)
            .await
            .map_err(|e| IngestError::BatchWrite {
                target: kind.rel_type().to_string(),
                batch: idx + 1,
                message: e.to_string(),
            })?;
        let secs = started.elapsed().as_secs_f64();
        IngestMetrics::record_relationship_batch(kind.rel_type(), chunk.len(), batch_matched, secs);
        matched += batch_matched;
        bar.inc(chunk.len() as u64);
        batches += 1;
    }
    bar.finish_and_clear();

    let unmatched = (candidates.len() as u64).saturating_sub(matched);
    if unmatched > 0 {
        warn!(
            unmatched,
            candidates = candidates.len(),
            "{} candidates skipped: endpoint node not found",
            kind.rel_type()
        );
    }
    let elapsed = ctx.timer.end(&step);

    Ok(RelationshipLoadStats {
        rel_type: kind,
        null_key_rows,
        candidates: candidates.len(),
        matched,
        unmatched,
        batches,
        elapsed_secs: elapsed.as_secs_f64(),
    })
}

pub async fn load_relationships(ctx: &mut PipelineContext) -> Result<Vec<RelationshipLoadStats>> {
    let mut stats = Vec::with_capacity(RelationshipKind::ALL.len());
    for kind in RelationshipKind::ALL {
        stats.push(load_relationship(ctx, kind).await?);
    }
    Ok(stats)
}

pub async fn verify_relationships(ctx: &mut PipelineContext) -> Result<RelationshipCounts> {
    let step = "Step 9: Confirming Relationship Counts";
    ctx.timer.start(step);
    let counts = ctx.store.count_relationships().await?;
    print_relationship_counts(&counts);
    ctx.timer.end(step);
    Ok(counts)
}

pub fn print_relationship_counts(counts: &RelationshipCounts) {
    println!("\n🔗 Relationship Count Summary (in Neo4j):");
    for (kind, count) in counts {
        println!("  {:<13}: {}", kind.rel_type(), count);
        info!(rel_type = kind.rel_type(), count, "Relationship count");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    fn pair(v: Option<&str>, b: Option<&str>) -> PropertyMap {
        let cell = |x: Option<&str>| x.map(CellValue::text).unwrap_or(CellValue::Null);
        let mut row = PropertyMap::new();
        row.insert("VendorCode", cell(v));
        row.insert("BusinessUnitCode", cell(b));
        row
    }

    #[test]
    fn test_distinct_candidates_keeps_first_seen_order() {
        let rows = vec![
            pair(Some("V2"), Some("B1")),
            pair(Some("V1"), Some("B1")),
            pair(Some("V2"), Some("B1")),
            pair(None, Some("B1")),
            pair(Some("V1"), None),
        ];
        let (candidates, null_key_rows) = distinct_candidates(rows);
        assert_eq!(null_key_rows, 2);
        assert_eq!(
            candidates,
            vec![pair(Some("V2"), Some("B1")), pair(Some("V1"), Some("B1"))]
        );
    }
}

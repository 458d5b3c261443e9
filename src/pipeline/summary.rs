use super::nodes::NodeLoadStats;
use super::relationships::RelationshipLoadStats;
use crate::error::Result;
use crate::graph::{NodeCounts, RelationshipCounts};
use crate::loader::KeySummary;
use crate::model::{EntityKind, RelationshipKind};
use crate::transform::DateReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub source: String,
    pub source_sha256: Option<String>,
    pub rows: usize,
    pub columns: usize,
    pub distinct_keys: KeySummary,
    pub dates: DateReport,
    pub nodes: Vec<NodeLoadStats>,
    pub relationships: Vec<RelationshipLoadStats>,
    pub node_counts: BTreeMap<EntityKind, u64>,
    pub relationship_counts: BTreeMap<RelationshipKind, u64>,
    pub steps: Vec<(String, f64)>,
    pub total_secs: f64,
    pub dry_run: bool,
}

impl RunSummary {
    pub fn total_unmatched(&self) -> u64 {
        self.relationships.iter().map(|r| r.unmatched).sum()
    }

    pub fn total_dropped(&self) -> usize {
        self.nodes.iter().map(|n| n.rows_dropped).sum()
    }

    pub fn set_counts(&mut self, nodes: NodeCounts, relationships: RelationshipCounts) {
        self.node_counts = nodes;
        self.relationship_counts = relationships;
    }

    pub fn print(&self) {
        println!("\n🎉 All steps completed successfully!");
        println!("🕒 Total time elapsed: {:.2} seconds", self.total_secs);

        println!("\n📊 Ingestion Time per Node Type:");
        for node in &self.nodes {
            println!("  {:<15}: {:.2} sec", node.label.label(), node.elapsed_secs);
        }

        let skipped = self.skipped_relationship_lines();
        if !skipped.is_empty() {
            println!("\n⚠️  Relationship candidates not created:");
            for line in skipped {
                println!("  {}", line);
            }
        }

        info!(
            run_id = %self.run_id,
            total_secs = self.total_secs,
            dropped = self.total_dropped(),
            unmatched = self.total_unmatched(),
            "Run summary"
        );
    }

    /// One line per relationship type that lost candidates, either to a
    /// missing key or to an endpoint node that does not exist.
    pub fn skipped_relationship_lines(&self) -> Vec<String> {
        self.relationships
            .iter()
            .filter(|r| r.null_key_rows > 0 || r.unmatched > 0)
            .map(|r: &RelationshipLoadStats| {
                format!(
                    "{:<13}: {} row(s) with a missing key, {} pair(s) without an endpoint node",
                    r.rel_type.rel_type(),
                    r.null_key_rows,
                    r.unmatched
                )
            })
            .collect()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Wrote run summary to {}", path.display());
        Ok(())
    }
}

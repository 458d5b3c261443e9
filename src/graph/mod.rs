//! Graph store abstraction.
//!
//! Every write is an idempotent find-or-create: nodes are merged on their
//! entity key, relationships on their (source, target) pair. Each call is one
//! transaction; nothing spans calls.

pub mod cypher;
pub mod memory;
pub mod neo4j;

use crate::error::Result;
use crate::model::{EntityKind, RelationshipKind};
use crate::table::PropertyMap;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub use memory::InMemoryGraph;
pub use neo4j::Neo4jStore;

pub type NodeCounts = BTreeMap<EntityKind, u64>;
pub type RelationshipCounts = BTreeMap<RelationshipKind, u64>;

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Declare a uniqueness constraint on each label's key. Declaring an
    /// existing constraint is a no-op.
    async fn ensure_constraints(&self, kinds: &[EntityKind]) -> Result<()>;

    /// Merge every row on the label's key and overwrite the supplied
    /// properties; a null value removes that property.
    async fn upsert_nodes(&self, kind: EntityKind, batch: &[PropertyMap]) -> Result<()>;

    /// Merge one relationship per candidate pair whose endpoints both exist.
    /// Returns how many candidate rows matched; the rest are skipped silently.
    async fn merge_relationships(
        &self,
        kind: RelationshipKind,
        batch: &[PropertyMap],
    ) -> Result<u64>;

    async fn count_nodes(&self) -> Result<NodeCounts>;

    async fn count_relationships(&self) -> Result<RelationshipCounts>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

//! In-memory [`GraphStore`] with the same merge semantics as the Cypher
//! statements, for dry runs and tests.

use super::{GraphStore, NodeCounts, RelationshipCounts};
use crate::error::{IngestError, Result};
use crate::model::{EntityKind, RelationshipKind};
use crate::table::{CellValue, PropertyMap};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub type Properties = BTreeMap<String, CellValue>;

#[derive(Debug, Default)]
struct GraphState {
    constraints: BTreeSet<EntityKind>,
    constraint_declarations: usize,
    nodes: HashMap<EntityKind, Vec<Properties>>,
    key_index: HashMap<(EntityKind, CellValue), usize>,
    relationships: HashSet<(RelationshipKind, usize, usize)>,
}

/// Orders keys the way Cypher `min()` does: strings before numbers.
fn key_order(a: &CellValue, b: &CellValue) -> Ordering {
    fn rank(v: &CellValue) -> u8 {
        match v {
            CellValue::Text(_) => 0,
            CellValue::Int(_) | CellValue::Float(_) => 1,
            CellValue::Null => 2,
        }
    }
    match (a, b) {
        (CellValue::Text(x), CellValue::Text(y)) => x.cmp(y),
        (CellValue::Int(x), CellValue::Int(y)) => x.cmp(y),
        (CellValue::Int(x), CellValue::Float(y)) => (*x as f64).total_cmp(y),
        (CellValue::Float(x), CellValue::Int(y)) => x.total_cmp(&(*y as f64)),
        (CellValue::Float(x), CellValue::Float(y)) => x.total_cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

impl GraphState {
    /// The `kind` node whose properties equal the row's values for `fields`.
    /// Null never matches, as in Cypher. When several nodes match a non-key
    /// field set, the one with the smallest key wins.
    fn find(&self, kind: EntityKind, fields: &[&str], row: &PropertyMap) -> Option<usize> {
        let wanted: Vec<&CellValue> = fields
            .iter()
            .map(|f| row.get(*f).filter(|v| !v.is_null()))
            .collect::<Option<_>>()?;

        if fields == [kind.key_field()] {
            return self.key_index.get(&(kind, wanted[0].clone())).copied();
        }

        let key_field = kind.key_field();
        self.nodes
            .get(&kind)?
            .iter()
            .enumerate()
            .filter(|(_, props)| {
                fields
                    .iter()
                    .zip(&wanted)
                    .all(|(f, v)| props.get(*f) == Some(*v))
            })
            .filter_map(|(idx, props)| props.get(key_field).map(|key| (idx, key)))
            .min_by(|(_, a), (_, b)| key_order(a, b))
            .map(|(idx, _)| idx)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryGraph {
    state: Mutex<GraphState>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Properties of the `kind` node with key `key`.
    pub fn node(&self, kind: EntityKind, key: impl Into<CellValue>) -> Option<Properties> {
        let state = self.state();
        let idx = *state.key_index.get(&(kind, key.into()))?;
        state.nodes.get(&kind).and_then(|nodes| nodes.get(idx)).cloned()
    }

    pub fn node_count(&self, kind: EntityKind) -> usize {
        self.state().nodes.get(&kind).map_or(0, Vec::len)
    }

    /// Whether `kind` links the source keyed `from` to the target keyed `to`
    /// (both by entity key).
    pub fn has_relationship(
        &self,
        kind: RelationshipKind,
        from: impl Into<CellValue>,
        to: impl Into<CellValue>,
    ) -> bool {
        let state = self.state();
        let source = state.key_index.get(&(kind.source(), from.into()));
        let target = state.key_index.get(&(kind.target(), to.into()));
        match (source, target) {
            (Some(s), Some(t)) => state.relationships.contains(&(kind, *s, *t)),
            _ => false,
        }
    }

    pub fn relationship_count(&self, kind: RelationshipKind) -> usize {
        self.state()
            .relationships
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .count()
    }

    pub fn has_constraint(&self, kind: EntityKind) -> bool {
        self.state().constraints.contains(&kind)
    }

    pub fn constraint_declarations(&self) -> usize {
        self.state().constraint_declarations
    }
}

#[async_trait]
impl GraphStore for InMemoryGraph {
    async fn ensure_constraints(&self, kinds: &[EntityKind]) -> Result<()> {
        let mut state = self.state();
        for kind in kinds {
            state.constraint_declarations += 1;
            if state.constraints.insert(*kind) {
                debug!("Created constraint on {}.{}", kind.label(), kind.key_field());
            }
        }
        Ok(())
    }

    async fn upsert_nodes(&self, kind: EntityKind, batch: &[PropertyMap]) -> Result<()> {
        let key_field = kind.key_field();
        // Validate the whole batch first so a failure leaves nothing applied.
        if batch
            .iter()
            .any(|row| row.get(key_field).map_or(true, CellValue::is_null))
        {
            return Err(IngestError::Query(format!(
                "Cannot merge {} node using null property value for {}",
                kind.label(),
                key_field
            )));
        }

        let mut state = self.state();
        for row in batch {
            let key = row[key_field].clone();
            let existing = state.key_index.get(&(kind, key.clone())).copied();
            let idx = match existing {
                Some(idx) => idx,
                None => {
                    let nodes = state.nodes.entry(kind).or_default();
                    nodes.push(Properties::new());
                    let idx = nodes.len() - 1;
                    state.key_index.insert((kind, key), idx);
                    idx
                }
            };
            if let Some(props) = state.nodes.get_mut(&kind).and_then(|n| n.get_mut(idx)) {
                for (field, value) in row {
                    if value.is_null() {
                        props.remove(*field);
                    } else {
                        props.insert(field.to_string(), value.clone());
                    }
                }
            }
        }
        Ok(())
    }

    async fn merge_relationships(
        &self,
        kind: RelationshipKind,
        batch: &[PropertyMap],
    ) -> Result<u64> {
        let mut state = self.state();
        let mut matched = 0u64;
        for row in batch {
            let source = state.find(kind.source(), kind.source_fields(), row);
            let target = state.find(kind.target(), kind.target_fields(), row);
            if let (Some(s), Some(t)) = (source, target) {
                matched += 1;
                state.relationships.insert((kind, s, t));
            }
        }
        Ok(matched)
    }

    async fn count_nodes(&self) -> Result<NodeCounts> {
        let state = self.state();
        Ok(EntityKind::ALL
            .iter()
            .map(|kind| (*kind, state.nodes.get(kind).map_or(0, Vec::len) as u64))
            .collect())
    }

    async fn count_relationships(&self) -> Result<RelationshipCounts> {
        let state = self.state();
        let mut counts: RelationshipCounts =
            RelationshipKind::ALL.iter().map(|k| (*k, 0)).collect();
        for (kind, _, _) in &state.relationships {
            *counts.entry(*kind).or_default() += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&'static str, CellValue)]) -> PropertyMap {
        pairs.iter().cloned().collect()
    }

    #[tokio::test]
    async fn test_upsert_merges_on_key_and_overwrites() {
        let graph = InMemoryGraph::new();
        graph
            .upsert_nodes(
                EntityKind::Vendor,
                &[row(&[("VendorCode", "V1".into()), ("VendorName", "Acme".into()), ("VendorCity", "Pune".into())])],
            )
            .await
            .unwrap();
        graph
            .upsert_nodes(
                EntityKind::Vendor,
                &[row(&[("VendorCode", "V1".into()), ("VendorName", "Acme Ltd".into())])],
            )
            .await
            .unwrap();

        assert_eq!(graph.node_count(EntityKind::Vendor), 1);
        let props = graph.node(EntityKind::Vendor, "V1").unwrap();
        assert_eq!(props["VendorName"], CellValue::text("Acme Ltd"));
        // absent from the second batch, so untouched
        assert_eq!(props["VendorCity"], CellValue::text("Pune"));
    }

    #[tokio::test]
    async fn test_null_property_removes_value() {
        let graph = InMemoryGraph::new();
        let kind = EntityKind::BusinessUnit;
        graph
            .upsert_nodes(kind, &[row(&[("BusinessUnitCode", "B1".into()), ("Business", "Retail".into())])])
            .await
            .unwrap();
        graph
            .upsert_nodes(kind, &[row(&[("BusinessUnitCode", "B1".into()), ("Business", CellValue::Null)])])
            .await
            .unwrap();
        assert!(!graph.node(kind, "B1").unwrap().contains_key("Business"));
    }

    #[tokio::test]
    async fn test_null_key_rejected_atomically() {
        let graph = InMemoryGraph::new();
        let err = graph
            .upsert_nodes(
                EntityKind::Vendor,
                &[row(&[("VendorCode", "V1".into())]), row(&[("VendorCode", CellValue::Null)])],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Query(_)));
        assert_eq!(graph.node_count(EntityKind::Vendor), 0);
    }

    #[tokio::test]
    async fn test_relationship_merge_skips_missing_endpoints() {
        let graph = InMemoryGraph::new();
        graph
            .upsert_nodes(EntityKind::Vendor, &[row(&[("VendorCode", "V1".into())])])
            .await
            .unwrap();
        graph
            .upsert_nodes(EntityKind::BusinessUnit, &[row(&[("BusinessUnitCode", "B1".into())])])
            .await
            .unwrap();

        let batch = vec![
            row(&[("VendorCode", "V1".into()), ("BusinessUnitCode", "B1".into())]),
            row(&[("VendorCode", "V9".into()), ("BusinessUnitCode", "B1".into())]),
        ];
        let matched = graph
            .merge_relationships(RelationshipKind::SuppliesTo, &batch)
            .await
            .unwrap();
        assert_eq!(matched, 1);
        // merging again converges
        graph
            .merge_relationships(RelationshipKind::SuppliesTo, &batch)
            .await
            .unwrap();
        assert_eq!(graph.relationship_count(RelationshipKind::SuppliesTo), 1);
        assert!(graph.has_relationship(RelationshipKind::SuppliesTo, "V1", "B1"));
    }

    #[tokio::test]
    async fn test_orders_picks_one_material_per_mrn_pair() {
        let graph = InMemoryGraph::new();
        graph
            .upsert_nodes(EntityKind::PurchaseOrder, &[row(&[("ID", "PO1".into())])])
            .await
            .unwrap();
        let material = |code: &str| {
            row(&[
                ("MaterialCode", code.into()),
                ("MRNNumber", "M1".into()),
                ("MRNItemNumber", CellValue::Int(1)),
            ])
        };
        graph
            .upsert_nodes(EntityKind::Material, &[material("MAT2"), material("MAT1")])
            .await
            .unwrap();

        let candidate = row(&[
            ("ID", "PO1".into()),
            ("MRNNumber", "M1".into()),
            ("MRNItemNumber", CellValue::Int(1)),
        ]);
        let matched = graph
            .merge_relationships(RelationshipKind::Orders, &[candidate])
            .await
            .unwrap();

        assert_eq!(matched, 1);
        assert_eq!(graph.relationship_count(RelationshipKind::Orders), 1);
        assert!(graph.has_relationship(RelationshipKind::Orders, "PO1", "MAT1"));
        assert!(!graph.has_relationship(RelationshipKind::Orders, "PO1", "MAT2"));
    }

    #[test]
    fn test_key_order_matches_cypher_min() {
        assert_eq!(key_order(&"A".into(), &"B".into()), Ordering::Less);
        assert_eq!(key_order(&CellValue::Int(10), &CellValue::Int(9)), Ordering::Greater);
        assert_eq!(key_order(&"Z".into(), &CellValue::Int(1)), Ordering::Less);
    }

    #[tokio::test]
    async fn test_constraints_idempotent() {
        let graph = InMemoryGraph::new();
        graph.ensure_constraints(&EntityKind::ALL).await.unwrap();
        graph.ensure_constraints(&EntityKind::ALL).await.unwrap();
        assert_eq!(graph.constraint_declarations(), 10);
        assert!(EntityKind::ALL.iter().all(|k| graph.has_constraint(*k)));
    }
}

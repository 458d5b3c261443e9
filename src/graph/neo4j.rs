//! Neo4j-backed [`GraphStore`] over Bolt.
//!
//! One pooled [`Graph`] capped at a single connection: every statement runs
//! in its own explicit transaction and the caller waits for the commit before
//! issuing the next one.

use super::{cypher, GraphStore, NodeCounts, RelationshipCounts};
use crate::config::Neo4jConfig;
use crate::error::{IngestError, Result};
use crate::model::{EntityKind, RelationshipKind};
use crate::table::{CellValue, PropertyMap};
use async_trait::async_trait;
use neo4rs::{query, BoltNull, BoltType, ConfigBuilder, Graph, Query, Row};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub struct Neo4jStore {
    graph: Graph,
}

fn to_bolt(value: &CellValue) -> BoltType {
    match value {
        CellValue::Null => BoltType::Null(BoltNull),
        CellValue::Int(i) => BoltType::from(*i),
        CellValue::Float(f) => BoltType::from(*f),
        CellValue::Text(s) => BoltType::from(s.clone()),
    }
}

fn batch_param(batch: &[PropertyMap]) -> Vec<HashMap<String, BoltType>> {
    batch
        .iter()
        .map(|row| {
            row.iter()
                .map(|(k, v)| (k.to_string(), to_bolt(v)))
                .collect()
        })
        .collect()
}

impl Neo4jStore {
    /// Connect and verify the server answers before any stage runs.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self> {
        info!("Connecting to Neo4j at {} as {}", config.uri, config.user);

        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password()?)
            .max_connections(1);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo_config = builder
            .build()
            .map_err(|e| IngestError::Connection(format!("invalid Neo4j configuration: {e}")))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| IngestError::Connection(format!("{}: {e}", config.uri)))?;
        graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| IngestError::Connection(format!("{}: {e}", config.uri)))?;

        info!("✅ Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Run a write statement in its own transaction, rolling back on failure.
    async fn write(&self, q: Query) -> Result<()> {
        let mut txn = self.graph.start_txn().await?;
        if let Err(e) = txn.run(q).await {
            if let Err(rollback) = txn.rollback().await {
                warn!("Rollback failed: {}", rollback);
            }
            return Err(e.into());
        }
        txn.commit().await?;
        Ok(())
    }

    async fn single_count(&self, text: String) -> Result<u64> {
        let mut stream = self.graph.execute(query(&text)).await?;
        let count = match stream.next().await? {
            Some(row) => count_column(&row, "count", &text)?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }
}

/// Integer column of a result row. A value that does not decode is a query
/// error, never a silent zero.
fn count_column(row: &Row, column: &str, text: &str) -> Result<i64> {
    row.get::<i64>(column)
        .map_err(|e| IngestError::Query(format!("{text}: column `{column}`: {e}")))
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn ensure_constraints(&self, kinds: &[EntityKind]) -> Result<()> {
        let mut txn = self.graph.start_txn().await?;
        for kind in kinds {
            debug!("Declaring uniqueness constraint on {}.{}", kind.label(), kind.key_field());
            if let Err(e) = txn.run(query(&cypher::constraint(*kind))).await {
                if let Err(rollback) = txn.rollback().await {
                    warn!("Rollback failed: {}", rollback);
                }
                return Err(e.into());
            }
        }
        txn.commit().await?;
        Ok(())
    }

    async fn upsert_nodes(&self, kind: EntityKind, batch: &[PropertyMap]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let q = query(&cypher::upsert_nodes(kind)).param("batch", batch_param(batch));
        self.write(q).await
    }

    async fn merge_relationships(
        &self,
        kind: RelationshipKind,
        batch: &[PropertyMap],
    ) -> Result<u64> {
        if batch.is_empty() {
            return Ok(0);
        }
        let q_text = cypher::merge_relationships(kind);
        let q = query(&q_text).param("batch", batch_param(batch));

        let mut txn = self.graph.start_txn().await?;
        let matched = match txn.execute(q).await {
            Ok(mut stream) => {
                let mut matched = 0i64;
                loop {
                    match stream.next(&mut txn).await {
                        Ok(Some(row)) => match count_column(&row, "matched", &q_text) {
                            Ok(n) => matched += n,
                            Err(e) => {
                                if let Err(rollback) = txn.rollback().await {
                                    warn!("Rollback failed: {}", rollback);
                                }
                                return Err(e);
                            }
                        },
                        Ok(None) => break,
                        Err(e) => {
                            if let Err(rollback) = txn.rollback().await {
                                warn!("Rollback failed: {}", rollback);
                            }
                            return Err(e.into());
                        }
                    }
                }
                matched
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!("Rollback failed: {}", rollback);
                }
                return Err(e.into());
            }
        };
        txn.commit().await?;
        Ok(matched.max(0) as u64)
    }

    async fn count_nodes(&self) -> Result<NodeCounts> {
        let mut counts = NodeCounts::new();
        for kind in EntityKind::ALL {
            counts.insert(kind, self.single_count(cypher::count_nodes(kind)).await?);
        }
        Ok(counts)
    }

    async fn count_relationships(&self) -> Result<RelationshipCounts> {
        let mut counts = RelationshipCounts::new();
        for kind in RelationshipKind::ALL {
            counts.insert(kind, self.single_count(cypher::count_relationships(kind)).await?);
        }
        Ok(counts)
    }

    async fn close(&self) -> Result<()> {
        // The pool closes its connections when the Graph is dropped.
        debug!("Releasing Neo4j session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo4rs::BoltList;

    #[test]
    fn test_to_bolt_variants() {
        assert!(matches!(to_bolt(&CellValue::Null), BoltType::Null(_)));
        assert!(matches!(to_bolt(&CellValue::Int(7)), BoltType::Integer(_)));
        assert!(matches!(to_bolt(&CellValue::Float(1.5)), BoltType::Float(_)));
        assert!(matches!(to_bolt(&CellValue::text("V1")), BoltType::String(_)));
    }

    #[test]
    fn test_batch_param_keeps_nulls() {
        let mut row = PropertyMap::new();
        row.insert("ID", CellValue::text("PO1"));
        row.insert("PODate", CellValue::Null);
        let param = batch_param(&[row]);
        assert_eq!(param.len(), 1);
        assert!(matches!(param[0].get("PODate"), Some(BoltType::Null(_))));
    }

    fn result_row(column: &str, value: BoltType) -> Row {
        Row::new(
            BoltList::from(vec![BoltType::from(column)]),
            BoltList::from(vec![value]),
        )
    }

    #[test]
    fn test_count_column_reads_integer() {
        let row = result_row("matched", BoltType::from(3i64));
        assert_eq!(count_column(&row, "matched", "RETURN 3").unwrap(), 3);
    }

    #[test]
    fn test_undecodable_count_is_query_error() {
        let row = result_row("matched", BoltType::from("three"));
        let err = count_column(&row, "matched", "RETURN 'three'").unwrap_err();
        assert!(matches!(err, IngestError::Query(ref msg) if msg.contains("matched")));

        let missing = count_column(&row, "count", "RETURN 'three'").unwrap_err();
        assert!(matches!(missing, IngestError::Query(_)));
    }

    #[tokio::test]
    async fn test_connect_without_password_is_config_error() {
        let config = Neo4jConfig {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: None,
            database: None,
        };
        let err = Neo4jStore::connect(&config).await.err().unwrap();
        assert!(matches!(err, IngestError::Config(_)));
    }
}

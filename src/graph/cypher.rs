//! Cypher text for each statement the loader issues.
//!
//! Only labels, relationship types and field names from [`crate::model`] are
//! interpolated; row data always travels as the `$batch` parameter.

use crate::model::{EntityKind, RelationshipKind};

/// `{a: row.a, b: row.b}`
fn match_map(fields: &[&str]) -> String {
    let pairs: Vec<String> = fields.iter().map(|f| format!("{f}: row.{f}")).collect();
    format!("{{{}}}", pairs.join(", "))
}

pub fn constraint(kind: EntityKind) -> String {
    format!(
        "CREATE CONSTRAINT IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
        kind.label(),
        kind.key_field()
    )
}

pub fn upsert_nodes(kind: EntityKind) -> String {
    format!(
        "UNWIND $batch AS row\n\
         MERGE (n:{label} {map})\n\
         SET n += row",
        label = kind.label(),
        map = match_map(&[kind.key_field()]),
    )
}

/// One relationship per candidate row. A target matched on fields other
/// than its key (ORDERS via the MRN pair) can hit several nodes; the one
/// with the smallest key is chosen so a candidate never fans out.
pub fn merge_relationships(kind: RelationshipKind) -> String {
    let src = kind.source();
    let dst = kind.target();
    let resolve = if kind.target_fields() == [dst.key_field()] {
        String::new()
    } else {
        format!(
            "WITH a, row, min(b.{key}) AS target_key\n\
             MATCH (b:{dst} {{{key}: target_key}})\n",
            key = dst.key_field(),
            dst = dst.label(),
        )
    };
    format!(
        "UNWIND $batch AS row\n\
         MATCH (a:{src} {src_map})\n\
         MATCH (b:{dst} {dst_map})\n\
         {resolve}\
         MERGE (a)-[:{rel}]->(b)\n\
         WITH DISTINCT row\n\
         RETURN count(row) AS matched",
        src = src.label(),
        src_map = match_map(kind.source_fields()),
        dst = dst.label(),
        dst_map = match_map(kind.target_fields()),
        resolve = resolve,
        rel = kind.rel_type(),
    )
}

pub fn count_nodes(kind: EntityKind) -> String {
    format!("MATCH (n:{}) RETURN count(n) AS count", kind.label())
}

pub fn count_relationships(kind: RelationshipKind) -> String {
    format!(
        "MATCH (:{})-[r:{}]->(:{}) RETURN count(r) AS count",
        kind.source().label(),
        kind.rel_type(),
        kind.target().label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_statement() {
        assert_eq!(
            constraint(EntityKind::Vendor),
            "CREATE CONSTRAINT IF NOT EXISTS FOR (n:Vendor) REQUIRE n.VendorCode IS UNIQUE"
        );
    }

    #[test]
    fn test_upsert_statement() {
        let q = upsert_nodes(EntityKind::PurchaseOrder);
        assert!(q.contains("MERGE (n:PurchaseOrder {ID: row.ID})"));
        assert!(q.ends_with("SET n += row"));
    }

    #[test]
    fn test_orders_matches_material_by_mrn() {
        let q = merge_relationships(RelationshipKind::Orders);
        assert!(q.contains("MATCH (a:PurchaseOrder {ID: row.ID})"));
        assert!(q.contains(
            "MATCH (b:Material {MRNNumber: row.MRNNumber, MRNItemNumber: row.MRNItemNumber})"
        ));
        assert!(q.contains("WITH a, row, min(b.MaterialCode) AS target_key"));
        assert!(q.contains("MATCH (b:Material {MaterialCode: target_key})"));
        assert!(q.contains("MERGE (a)-[:ORDERS]->(b)"));
        assert!(q.contains("RETURN count(row) AS matched"));
    }

    #[test]
    fn test_key_matched_target_needs_no_resolution() {
        let q = merge_relationships(RelationshipKind::SuppliesTo);
        assert!(!q.contains("min("));
        assert_eq!(
            q,
            "UNWIND $batch AS row\n\
             MATCH (a:Vendor {VendorCode: row.VendorCode})\n\
             MATCH (b:BusinessUnit {BusinessUnitCode: row.BusinessUnitCode})\n\
             MERGE (a)-[:SUPPLIES_TO]->(b)\n\
             WITH DISTINCT row\n\
             RETURN count(row) AS matched"
        );
    }

    #[test]
    fn test_count_statements() {
        assert_eq!(
            count_nodes(EntityKind::BusinessUnit),
            "MATCH (n:BusinessUnit) RETURN count(n) AS count"
        );
        assert_eq!(
            count_relationships(RelationshipKind::BelongsTo),
            "MATCH (:Warehouse)-[r:BELONGS_TO]->(:BusinessUnit) RETURN count(r) AS count"
        );
    }
}

//! Closed vocabulary of node labels and relationship types.
//!
//! Labels and field names end up interpolated into Cypher text, so they only
//! ever come from these enums and never from the input file.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EntityKind {
    PurchaseOrder,
    Material,
    Warehouse,
    Vendor,
    BusinessUnit,
}

impl EntityKind {
    /// Load order: every relationship endpoint exists before edges are merged.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::PurchaseOrder,
        EntityKind::Material,
        EntityKind::Warehouse,
        EntityKind::Vendor,
        EntityKind::BusinessUnit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::PurchaseOrder => "PurchaseOrder",
            EntityKind::Material => "Material",
            EntityKind::Warehouse => "Warehouse",
            EntityKind::Vendor => "Vendor",
            EntityKind::BusinessUnit => "BusinessUnit",
        }
    }

    /// The unique business key of the label.
    pub fn key_field(&self) -> &'static str {
        match self {
            EntityKind::PurchaseOrder => "ID",
            EntityKind::Material => "MaterialCode",
            EntityKind::Warehouse => "WarehouseLocation",
            EntityKind::Vendor => "VendorCode",
            EntityKind::BusinessUnit => "BusinessUnitCode",
        }
    }

    /// Columns projected onto the node as properties (key first).
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            EntityKind::PurchaseOrder => &[
                "ID",
                "PONumber",
                "PurchaseOrderItem",
                "POQuantity",
                "POAmount",
                "POUOM",
                "POPricePerUOM",
                "DocumentCurrency",
                "ExchangeRate",
                "POAmountInINR",
                "POPricePerUOMInINR",
                "PODate",
                "PaymentTerms",
                "ExpectedDeliveryStartDate",
                "ExpectedDeliveryEndDate",
                "ActualDeliveryDate",
                "ReceivedDate",
                "AmountInDocCurrency",
                "MRNNumber",
                "MRNItemNumber",
                "WarehouseLocation",
                "VendorCode",
                "BusinessUnitCode",
            ],
            EntityKind::Material => &[
                "MaterialCode",
                "MRNNumber",
                "MRNItemNumber",
                "MaterialGroup",
                "MaterialGroupText",
                "MaterialQuantity",
                "MovementType",
                "MaterialName",
                "MaterialDescription",
                "WarehouseLocation",
                "VendorCode",
            ],
            EntityKind::Warehouse => &[
                "WarehouseLocation",
                "WarehouseCountry",
                "WarehouseState",
                "WarehouseCity",
                "WarehousePostalCode",
                "BusinessUnitCode",
            ],
            EntityKind::Vendor => &[
                "VendorCode",
                "VendorName",
                "VendorGSTIN",
                "VendorPostalCode",
                "VendorCity",
                "VendorPAN",
                "ContactPersonName",
                "VendorPhoneNumber",
                "VendorFullAddress",
                "VendorCountry",
                "VendorCountryName",
                "BusinessUnitCode",
            ],
            EntityKind::BusinessUnit => &["BusinessUnitCode", "BusinessUnitDescription", "Business"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RelationshipKind {
    Orders,
    DeliveredTo,
    ProcuredFrom,
    RaisedBy,
    StoredIn,
    SuppliedBy,
    SuppliesTo,
    BelongsTo,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 8] = [
        RelationshipKind::Orders,
        RelationshipKind::DeliveredTo,
        RelationshipKind::ProcuredFrom,
        RelationshipKind::RaisedBy,
        RelationshipKind::StoredIn,
        RelationshipKind::SuppliedBy,
        RelationshipKind::SuppliesTo,
        RelationshipKind::BelongsTo,
    ];

    pub fn rel_type(&self) -> &'static str {
        match self {
            RelationshipKind::Orders => "ORDERS",
            RelationshipKind::DeliveredTo => "DELIVERED_TO",
            RelationshipKind::ProcuredFrom => "PROCURED_FROM",
            RelationshipKind::RaisedBy => "RAISED_BY",
            RelationshipKind::StoredIn => "STORED_IN",
            RelationshipKind::SuppliedBy => "SUPPLIED_BY",
            RelationshipKind::SuppliesTo => "SUPPLIES_TO",
            RelationshipKind::BelongsTo => "BELONGS_TO",
        }
    }

    pub fn source(&self) -> EntityKind {
        match self {
            RelationshipKind::Orders
            | RelationshipKind::DeliveredTo
            | RelationshipKind::ProcuredFrom
            | RelationshipKind::RaisedBy => EntityKind::PurchaseOrder,
            RelationshipKind::StoredIn | RelationshipKind::SuppliedBy => EntityKind::Material,
            RelationshipKind::SuppliesTo => EntityKind::Vendor,
            RelationshipKind::BelongsTo => EntityKind::Warehouse,
        }
    }

    pub fn target(&self) -> EntityKind {
        match self {
            RelationshipKind::Orders => EntityKind::Material,
            RelationshipKind::DeliveredTo | RelationshipKind::StoredIn => EntityKind::Warehouse,
            RelationshipKind::ProcuredFrom | RelationshipKind::SuppliedBy => EntityKind::Vendor,
            RelationshipKind::RaisedBy
            | RelationshipKind::SuppliesTo
            | RelationshipKind::BelongsTo => EntityKind::BusinessUnit,
        }
    }

    /// Properties the source node is matched on.
    pub fn source_fields(&self) -> &'static [&'static str] {
        match self.source() {
            EntityKind::PurchaseOrder => &["ID"],
            EntityKind::Material => &["MaterialCode"],
            EntityKind::Warehouse => &["WarehouseLocation"],
            EntityKind::Vendor => &["VendorCode"],
            EntityKind::BusinessUnit => &["BusinessUnitCode"],
        }
    }

    /// Properties the target node is matched on. ORDERS reaches its
    /// Material through the MRN number and item rather than the code.
    pub fn target_fields(&self) -> &'static [&'static str] {
        match self {
            RelationshipKind::Orders => &["MRNNumber", "MRNItemNumber"],
            RelationshipKind::DeliveredTo | RelationshipKind::StoredIn => &["WarehouseLocation"],
            RelationshipKind::ProcuredFrom | RelationshipKind::SuppliedBy => &["VendorCode"],
            RelationshipKind::RaisedBy
            | RelationshipKind::SuppliesTo
            | RelationshipKind::BelongsTo => &["BusinessUnitCode"],
        }
    }

    /// All source-table columns needed to build one candidate pair.
    pub fn join_columns(&self) -> Vec<&'static str> {
        let mut columns = self.source_fields().to_vec();
        columns.extend_from_slice(self.target_fields());
        columns
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rel_type())
    }
}

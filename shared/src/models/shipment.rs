//! Shipment and allocation record models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Customer, HarvestLot, SalesOrder, SalesOrderDetail};

/// Dated container for one or more allocation records
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shipment {
    pub id: Uuid,
    pub sales_order_id: Uuid,
    pub shipment_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable fact: how much of a lot went to a demand line
///
/// Never edited or deleted once stored; the lot and order ledgers are
/// consistent only as long as these rows stay untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentLotDetail {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub harvest_lot_id: Uuid,
    pub sales_order_detail_id: Uuid,
    pub quantity_taken_kg: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Allocation record with its lot and demand line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentLotDetailView {
    #[serde(flatten)]
    pub detail: ShipmentLotDetail,
    pub harvest_lot: HarvestLot,
    pub sales_order_detail: SalesOrderDetail,
}

/// Shipment with every relation populated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentWithDetails {
    #[serde(flatten)]
    pub shipment: Shipment,
    pub sales_order: SalesOrder,
    pub lot_details: Vec<ShipmentLotDetailView>,
}

/// Where one allocation came from and where it went
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationTrace {
    pub allocation: ShipmentLotDetail,
    pub harvest_lot: HarvestLot,
    pub shipment: Shipment,
    pub sales_order_detail: SalesOrderDetail,
    pub sales_order: SalesOrder,
    pub customer: Customer,
}

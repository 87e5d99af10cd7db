//! Shipment allocation service
//!
//! `create_shipment` is the single writer of lot remaining weights and
//! demand-line shipped quantities. The order, its lines and the referenced
//! lots are locked (in that order, lots by ascending id) before the plan is
//! computed, and every write happens in one transaction.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::allocation::{lot_lock_order, normalize_requests, plan_shipment, AllocationRequest};
use shared::{
    HarvestLot, SalesOrderDetail, Shipment, ShipmentLotDetail, ShipmentLotDetailView,
    ShipmentWithDetails,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::harvest_lot::{HarvestLotRow, HARVEST_LOT_COLUMNS};
use super::sales_order::{fetch_details, fetch_order};
use crate::error::{AppError, AppResult};

pub(crate) const SHIPMENT_COLUMNS: &str =
    "id, sales_order_id, shipment_date, notes, created_at, updated_at";

pub(crate) const LOT_DETAIL_COLUMNS: &str = "id, shipment_id, harvest_lot_id, \
     sales_order_detail_id, quantity_taken_kg, created_at, updated_at";

/// Shipment service
#[derive(Clone)]
pub struct ShipmentService {
    db: PgPool,
}

/// Database row for a shipment header
#[derive(Debug, FromRow)]
pub(crate) struct ShipmentRow {
    pub id: Uuid,
    pub sales_order_id: Uuid,
    pub shipment_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ShipmentRow> for Shipment {
    fn from(row: ShipmentRow) -> Self {
        Self {
            id: row.id,
            sales_order_id: row.sales_order_id,
            shipment_date: row.shipment_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for an allocation record
#[derive(Debug, FromRow)]
pub(crate) struct ShipmentLotDetailRow {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub harvest_lot_id: Uuid,
    pub sales_order_detail_id: Uuid,
    pub quantity_taken_kg: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ShipmentLotDetailRow> for ShipmentLotDetail {
    fn from(row: ShipmentLotDetailRow) -> Self {
        Self {
            id: row.id,
            shipment_id: row.shipment_id,
            harvest_lot_id: row.harvest_lot_id,
            sales_order_detail_id: row.sales_order_detail_id,
            quantity_taken_kg: row.quantity_taken_kg,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for recording a shipment
#[derive(Debug, Deserialize)]
pub struct CreateShipmentInput {
    pub sales_order_id: Uuid,
    pub shipment_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lot_details: Vec<AllocationRequest>,
}

impl ShipmentService {
    /// Create a new ShipmentService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a shipment, allocating lot weight to demand lines
    ///
    /// Either every allocation is stored together with the updated lots,
    /// lines and order status, or nothing is.
    pub async fn create_shipment(&self, input: CreateShipmentInput) -> AppResult<ShipmentWithDetails> {
        let requests = normalize_requests(&input.lot_details)?;
        let shipment_date = input.shipment_date.unwrap_or_else(|| Utc::now().date_naive());
        let notes = input
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let mut tx = self.db.begin().await?;

        let order = fetch_order(&mut tx, input.sales_order_id, true).await?;
        let details = fetch_details(&mut tx, order.id, true).await?;
        let lots = lock_lots(&mut tx, &lot_lock_order(&requests)).await?;

        let plan = plan_shipment(&order, details, lots, &requests)?;

        let shipment_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO shipments (sales_order_id, shipment_date, notes)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(order.id)
        .bind(shipment_date)
        .bind(&notes)
        .fetch_one(&mut *tx)
        .await?;

        for allocation in &plan.allocations {
            sqlx::query(
                r#"
                INSERT INTO shipment_lot_details
                    (shipment_id, harvest_lot_id, sales_order_detail_id, quantity_taken_kg)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(shipment_id)
            .bind(allocation.harvest_lot_id)
            .bind(allocation.sales_order_detail_id)
            .bind(allocation.quantity_taken_kg)
            .execute(&mut *tx)
            .await?;
        }

        for lot in &plan.lots {
            sqlx::query(
                "UPDATE harvest_lots SET remaining_net_weight_kg = $1, status = $2 WHERE id = $3",
            )
            .bind(lot.remaining_net_weight_kg)
            .bind(lot.status.as_str())
            .bind(lot.id)
            .execute(&mut *tx)
            .await?;
        }

        for detail in &plan.details {
            sqlx::query(
                "UPDATE sales_order_details SET quantity_shipped_kg = $1, status = $2 WHERE id = $3",
            )
            .bind(detail.quantity_shipped_kg)
            .bind(detail.status.as_str())
            .bind(detail.id)
            .execute(&mut *tx)
            .await?;
        }

        if plan.order_status != order.status {
            sqlx::query("UPDATE sales_orders SET status = $1 WHERE id = $2")
                .bind(plan.order_status.as_str())
                .bind(order.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            shipment_id = %shipment_id,
            order_id = %order.id,
            allocations = plan.allocations.len(),
            total_kg = %plan.total_quantity_kg(),
            order_status = %plan.order_status,
            "Shipment recorded"
        );

        self.get_shipment(shipment_id).await
    }

    /// Get a shipment with its order and every allocation populated
    pub async fn get_shipment(&self, shipment_id: Uuid) -> AppResult<ShipmentWithDetails> {
        let mut conn = self.db.acquire().await?;

        let shipment = fetch_shipment(&mut conn, shipment_id).await?;
        let sales_order = fetch_order(&mut conn, shipment.sales_order_id, false).await?;

        let allocations = sqlx::query_as::<_, ShipmentLotDetailRow>(&format!(
            "SELECT {} FROM shipment_lot_details WHERE shipment_id = $1 ORDER BY created_at, id",
            LOT_DETAIL_COLUMNS
        ))
        .bind(shipment_id)
        .fetch_all(&mut *conn)
        .await?;

        let details: HashMap<Uuid, SalesOrderDetail> =
            fetch_details(&mut conn, sales_order.id, false)
                .await?
                .into_iter()
                .map(|d| (d.id, d))
                .collect();

        let lot_ids: Vec<Uuid> = allocations.iter().map(|a| a.harvest_lot_id).collect();
        let lots: HashMap<Uuid, HarvestLot> = load_lots(&mut conn, &lot_ids)
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();

        let lot_details = allocations
            .into_iter()
            .map(|row| -> AppResult<ShipmentLotDetailView> {
                let harvest_lot = lots.get(&row.harvest_lot_id).cloned().ok_or_else(|| {
                    AppError::Internal(format!("allocation {} lost its harvest lot", row.id))
                })?;
                let sales_order_detail =
                    details.get(&row.sales_order_detail_id).cloned().ok_or_else(|| {
                        AppError::Internal(format!("allocation {} lost its demand line", row.id))
                    })?;
                Ok(ShipmentLotDetailView {
                    detail: row.into(),
                    harvest_lot,
                    sales_order_detail,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(ShipmentWithDetails {
            shipment,
            sales_order,
            lot_details,
        })
    }

    /// List the shipments recorded against an order, oldest first
    pub async fn list_shipments_for_order(&self, order_id: Uuid) -> AppResult<Vec<Shipment>> {
        let mut conn = self.db.acquire().await?;

        // Surface NotFound for unknown orders rather than an empty list
        fetch_order(&mut conn, order_id, false).await?;

        let rows = sqlx::query_as::<_, ShipmentRow>(&format!(
            "SELECT {} FROM shipments WHERE sales_order_id = $1 ORDER BY shipment_date, created_at",
            SHIPMENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(Shipment::from).collect())
    }
}

pub(crate) async fn fetch_shipment(conn: &mut PgConnection, shipment_id: Uuid) -> AppResult<Shipment> {
    sqlx::query_as::<_, ShipmentRow>(&format!(
        "SELECT {} FROM shipments WHERE id = $1",
        SHIPMENT_COLUMNS
    ))
    .bind(shipment_id)
    .fetch_optional(&mut *conn)
    .await?
    .map(Shipment::from)
    .ok_or_else(|| AppError::not_found(format!("Shipment {}", shipment_id)))
}

/// Lock the given lots; `lot_ids` must already be sorted
async fn lock_lots(conn: &mut PgConnection, lot_ids: &[Uuid]) -> AppResult<Vec<HarvestLot>> {
    let rows = sqlx::query_as::<_, HarvestLotRow>(&format!(
        "SELECT {} FROM harvest_lots WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        HARVEST_LOT_COLUMNS
    ))
    .bind(lot_ids)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(HarvestLot::try_from).collect()
}

async fn load_lots(conn: &mut PgConnection, lot_ids: &[Uuid]) -> AppResult<Vec<HarvestLot>> {
    let rows = sqlx::query_as::<_, HarvestLotRow>(&format!(
        "SELECT {} FROM harvest_lots WHERE id = ANY($1)",
        HARVEST_LOT_COLUMNS
    ))
    .bind(lot_ids)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(HarvestLot::try_from).collect()
}

//! Traceability queries
//!
//! Read-only: resolves an allocation record to its lot, shipment, demand
//! line, order and customer.

use chrono::{DateTime, Utc};
use shared::{AllocationTrace, Customer, HarvestLot, SalesOrderDetail, ShipmentLotDetail};
use sqlx::PgPool;
use uuid::Uuid;

use super::harvest_lot::fetch_lot;
use super::sales_order::{fetch_order, SalesOrderDetailRow, DETAIL_COLUMNS};
use super::shipment::{fetch_shipment, ShipmentLotDetailRow, LOT_DETAIL_COLUMNS};
use crate::error::{AppError, AppResult};

/// Traceability service
#[derive(Clone)]
pub struct TraceabilityService {
    db: PgPool,
}

impl TraceabilityService {
    /// Create a new TraceabilityService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Trace an allocation back to its lot and forward to its customer
    pub async fn trace_allocation(&self, allocation_id: Uuid) -> AppResult<AllocationTrace> {
        let mut conn = self.db.acquire().await?;

        let allocation: ShipmentLotDetail = sqlx::query_as::<_, ShipmentLotDetailRow>(&format!(
            "SELECT {} FROM shipment_lot_details WHERE id = $1",
            LOT_DETAIL_COLUMNS
        ))
        .bind(allocation_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Allocation {}", allocation_id)))?
        .into();

        let harvest_lot: HarvestLot = fetch_lot(&mut conn, allocation.harvest_lot_id, false).await?;
        let shipment = fetch_shipment(&mut conn, allocation.shipment_id).await?;

        let detail_row = sqlx::query_as::<_, SalesOrderDetailRow>(&format!(
            "SELECT {} FROM sales_order_details WHERE id = $1",
            DETAIL_COLUMNS
        ))
        .bind(allocation.sales_order_detail_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("Demand line {}", allocation.sales_order_detail_id))
        })?;
        let sales_order_detail = SalesOrderDetail::try_from(detail_row)?;

        let sales_order = fetch_order(&mut conn, sales_order_detail.sales_order_id, false).await?;

        let customer = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>)>(
            "SELECT id, name, created_at FROM customers WHERE id = $1",
        )
        .bind(sales_order.customer_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(|(id, name, created_at)| Customer {
            id,
            name,
            created_at,
        })
        .ok_or_else(|| AppError::not_found(format!("Customer {}", sales_order.customer_id)))?;

        tracing::debug!(allocation_id = %allocation_id, lot_code = %harvest_lot.lot_code, "Allocation traced");

        Ok(AllocationTrace {
            allocation,
            harvest_lot,
            shipment,
            sales_order_detail,
            sales_order,
            customer,
        })
    }
}

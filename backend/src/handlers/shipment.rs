//! HTTP handlers for shipments

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Shipment, ShipmentWithDetails};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::shipment::{CreateShipmentInput, ShipmentService};
use crate::AppState;

/// Record a shipment and its lot allocations
pub async fn create_shipment(
    State(state): State<AppState>,
    Json(input): Json<CreateShipmentInput>,
) -> AppResult<(StatusCode, Json<ShipmentWithDetails>)> {
    let service = ShipmentService::new(state.db);
    let shipment = service.create_shipment(input).await?;
    Ok((StatusCode::CREATED, Json(shipment)))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
) -> AppResult<Json<ShipmentWithDetails>> {
    let service = ShipmentService::new(state.db);
    Ok(Json(service.get_shipment(shipment_id).await?))
}

/// Shipments recorded against one order
pub async fn list_order_shipments(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Vec<Shipment>>> {
    let service = ShipmentService::new(state.db);
    Ok(Json(service.list_shipments_for_order(order_id).await?))
}

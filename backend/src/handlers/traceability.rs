//! HTTP handler for allocation traceability

use axum::{
    extract::{Path, State},
    Json,
};
use shared::AllocationTrace;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::TraceabilityService;
use crate::AppState;

/// Trace one allocation record to its lot, shipment, order and customer
pub async fn trace_allocation(
    State(state): State<AppState>,
    Path(allocation_id): Path<Uuid>,
) -> AppResult<Json<AllocationTrace>> {
    let service = TraceabilityService::new(state.db);
    Ok(Json(service.trace_allocation(allocation_id).await?))
}

//! HTTP handlers for harvest lots

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Classification, HarvestLot};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::harvest_lot::{
    CreateHarvestLotInput, HarvestLotQuery, HarvestLotService, UpdateHarvestLotInput,
};
use crate::AppState;

/// Register a harvest lot
pub async fn create_lot(
    State(state): State<AppState>,
    Json(input): Json<CreateHarvestLotInput>,
) -> AppResult<(StatusCode, Json<HarvestLot>)> {
    let service = HarvestLotService::new(state.db);
    let lot = service.create_lot(input).await?;
    Ok((StatusCode::CREATED, Json(lot)))
}

/// List lots, optionally by status (`?status=IN_STOCK`)
pub async fn list_lots(
    State(state): State<AppState>,
    Query(query): Query<HarvestLotQuery>,
) -> AppResult<Json<Vec<HarvestLot>>> {
    let service = HarvestLotService::new(state.db);
    Ok(Json(service.list_lots(query).await?))
}

pub async fn get_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<HarvestLot>> {
    let service = HarvestLotService::new(state.db);
    Ok(Json(service.get_lot(lot_id).await?))
}

/// Edit a lot that is still pending classification
pub async fn update_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<UpdateHarvestLotInput>,
) -> AppResult<Json<HarvestLot>> {
    let service = HarvestLotService::new(state.db);
    Ok(Json(service.update_lot(lot_id, input).await?))
}

/// Classify a lot
pub async fn classify_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<Classification>,
) -> AppResult<Json<HarvestLot>> {
    let service = HarvestLotService::new(state.db);
    Ok(Json(service.classify_lot(lot_id, input).await?))
}

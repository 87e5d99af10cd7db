//! HTTP handlers for consumable inputs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::ConsumableInput;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::consumable_input::{ConsumableInputService, CreateInputInput};
use crate::AppState;

/// Register a consumable input
pub async fn create_input(
    State(state): State<AppState>,
    Json(input): Json<CreateInputInput>,
) -> AppResult<(StatusCode, Json<ConsumableInput>)> {
    let service = ConsumableInputService::new(state.db);
    let created = service.create_input(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List inputs that are not archived
pub async fn list_inputs(State(state): State<AppState>) -> AppResult<Json<Vec<ConsumableInput>>> {
    let service = ConsumableInputService::new(state.db);
    Ok(Json(service.list_inputs().await?))
}

/// Get a single input
pub async fn get_input(
    State(state): State<AppState>,
    Path(input_id): Path<Uuid>,
) -> AppResult<Json<ConsumableInput>> {
    let service = ConsumableInputService::new(state.db);
    Ok(Json(service.get_input(input_id).await?))
}

/// Archive an input
pub async fn archive_input(
    State(state): State<AppState>,
    Path(input_id): Path<Uuid>,
) -> AppResult<Json<ConsumableInput>> {
    let service = ConsumableInputService::new(state.db);
    Ok(Json(service.archive_input(input_id).await?))
}

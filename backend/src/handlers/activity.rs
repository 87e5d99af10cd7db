//! HTTP handlers for work orders and activities

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{ActivityWithUsage, WorkOrder};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::activity::{
    ActivityService, CreateActivityInput, CreateWorkOrderInput, UpdateActivityInput,
};
use crate::AppState;

/// Create a work order
pub async fn create_work_order(
    State(state): State<AppState>,
    Json(input): Json<CreateWorkOrderInput>,
) -> AppResult<(StatusCode, Json<WorkOrder>)> {
    let service = ActivityService::new(state.db);
    let work_order = service.create_work_order(input).await?;
    Ok((StatusCode::CREATED, Json(work_order)))
}

/// Record a work activity; the caller's role decides its initial status
pub async fn create_activity(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateActivityInput>,
) -> AppResult<(StatusCode, Json<ActivityWithUsage>)> {
    let service = ActivityService::new(state.db);
    let activity = service
        .create_activity(current_user.0.user_id, current_user.0.role, input)
        .await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

/// Get an activity with its usage lines
pub async fn get_activity(
    State(state): State<AppState>,
    Path(activity_id): Path<Uuid>,
) -> AppResult<Json<ActivityWithUsage>> {
    let service = ActivityService::new(state.db);
    Ok(Json(service.get_activity(activity_id).await?))
}

/// Update an activity's description, usage lines or status
pub async fn update_activity(
    State(state): State<AppState>,
    Path(activity_id): Path<Uuid>,
    Json(input): Json<UpdateActivityInput>,
) -> AppResult<Json<ActivityWithUsage>> {
    let service = ActivityService::new(state.db);
    Ok(Json(service.update_activity(activity_id, input).await?))
}

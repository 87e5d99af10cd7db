//! HTTP handlers for customers and sales orders

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Customer, DetailChange, NewDetail, SalesOrderWithDetails};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::sales_order::{CreateCustomerInput, CreateSalesOrderInput, SalesOrderService};
use crate::AppState;

/// Register a customer
pub async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CreateCustomerInput>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    let service = SalesOrderService::new(state.db);
    let customer = service.create_customer(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// Create a sales order
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateSalesOrderInput>,
) -> AppResult<(StatusCode, Json<SalesOrderWithDetails>)> {
    let service = SalesOrderService::new(state.db);
    let order = service.create_order(input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SalesOrderWithDetails>> {
    let service = SalesOrderService::new(state.db);
    Ok(Json(service.get_order(order_id).await?))
}

/// Approve a pending order
pub async fn approve_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SalesOrderWithDetails>> {
    let service = SalesOrderService::new(state.db);
    Ok(Json(service.approve_order(order_id).await?))
}

/// Add a demand line
pub async fn add_detail(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(line): Json<NewDetail>,
) -> AppResult<(StatusCode, Json<SalesOrderWithDetails>)> {
    let service = SalesOrderService::new(state.db);
    let order = service.add_detail(order_id, line).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Edit a demand line
pub async fn update_detail(
    State(state): State<AppState>,
    Path((order_id, detail_id)): Path<(Uuid, Uuid)>,
    Json(change): Json<DetailChange>,
) -> AppResult<Json<SalesOrderWithDetails>> {
    let service = SalesOrderService::new(state.db);
    Ok(Json(service.update_detail(order_id, detail_id, change).await?))
}

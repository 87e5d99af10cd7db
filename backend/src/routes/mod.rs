//! Route definitions for the harvest inventory API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes; everything here requires a bearer token
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/inputs", input_routes())
        .route("/work-orders", post(handlers::create_work_order))
        .nest("/activities", activity_routes())
        .nest("/harvest-lots", harvest_lot_routes())
        .route("/customers", post(handlers::create_customer))
        .nest("/sales-orders", sales_order_routes())
        .nest("/shipments", shipment_routes())
        .route(
            "/trace/allocations/:allocation_id",
            get(handlers::trace_allocation),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Consumable input routes
fn input_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_inputs).post(handlers::create_input))
        .route(
            "/:input_id",
            get(handlers::get_input).delete(handlers::archive_input),
        )
}

/// Work activity routes
fn activity_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_activity))
        .route(
            "/:activity_id",
            get(handlers::get_activity).put(handlers::update_activity),
        )
}

/// Harvest lot routes
fn harvest_lot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_lots).post(handlers::create_lot))
        .route("/:lot_id", get(handlers::get_lot).put(handlers::update_lot))
        .route("/:lot_id/classify", post(handlers::classify_lot))
}

/// Sales order routes
fn sales_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_order))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/approve", post(handlers::approve_order))
        .route("/:order_id/details", post(handlers::add_detail))
        .route(
            "/:order_id/details/:detail_id",
            axum::routing::put(handlers::update_detail),
        )
        .route("/:order_id/shipments", get(handlers::list_order_shipments))
}

/// Shipment routes
fn shipment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_shipment))
        .route("/:shipment_id", get(handlers::get_shipment))
}

//! Business logic services for the harvest inventory core
//!
//! Each service owns a pool handle and runs every mutation in a single
//! database transaction.

pub mod activity;
pub mod consumable_input;
pub mod harvest_lot;
pub mod sales_order;
pub mod shipment;
pub mod stock_ledger;
pub mod traceability;

pub use activity::ActivityService;
pub use consumable_input::ConsumableInputService;
pub use harvest_lot::HarvestLotService;
pub use sales_order::SalesOrderService;
pub use shipment::ShipmentService;
pub use stock_ledger::StockLedger;
pub use traceability::TraceabilityService;

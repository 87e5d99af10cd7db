//! HTTP request handlers

pub mod activity;
pub mod consumable_input;
pub mod harvest_lot;
pub mod health;
pub mod sales_order;
pub mod shipment;
pub mod traceability;

pub use activity::*;
pub use consumable_input::*;
pub use harvest_lot::*;
pub use health::*;
pub use sales_order::*;
pub use shipment::*;
pub use traceability::*;

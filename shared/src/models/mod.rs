//! Domain models for the harvest inventory and fulfillment core

mod activity;
mod harvest_lot;
mod input;
mod sales_order;
mod shipment;

pub use activity::*;
pub use harvest_lot::*;
pub use input::*;
pub use sales_order::*;
pub use shipment::*;

//! Shared domain types and pure business logic for the harvest inventory
//! and fulfillment core
//!
//! Nothing in this crate performs I/O. The backend loads and locks rows,
//! hands snapshots to the planners here, and persists what they return.

pub mod allocation;
pub mod error;
pub mod ledger;
pub mod models;
pub mod status;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;

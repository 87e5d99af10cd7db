//! Consumable input models (fertiliser, pesticide, packaging...)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A consumable input with its authoritative on-hand quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumableInput {
    pub id: Uuid,
    pub name: String,
    /// Unit the on-hand quantity is counted in (kg, l, unit...)
    pub unit_of_measure: String,
    pub quantity_on_hand: Decimal,
    pub unit_cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the input is archived; archived inputs are never hard-deleted
    pub deleted_at: Option<DateTime<Utc>>,
}

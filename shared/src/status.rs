//! Derived statuses
//!
//! Statuses here are recomputed from the current aggregate on every
//! mutation, never patched incrementally.

use rust_decimal::Decimal;

use crate::models::{DetailStatus, HarvestLotStatus, SalesOrderDetail, SalesOrderStatus};

/// Demand line status from its ordered and shipped quantities
pub fn detail_status(quantity_kg: Decimal, quantity_shipped_kg: Decimal) -> DetailStatus {
    if quantity_shipped_kg >= quantity_kg {
        DetailStatus::Filled
    } else if quantity_shipped_kg > Decimal::ZERO {
        DetailStatus::PartiallyFilled
    } else {
        DetailStatus::Open
    }
}

/// Order status from the statuses of all its lines
///
/// All lines filled gives FILLED, any progress gives PARTIALLY_SHIPPED, and
/// an order with no progress keeps whatever status it already had.
pub fn order_status(current: SalesOrderStatus, details: &[SalesOrderDetail]) -> SalesOrderStatus {
    if details.is_empty() {
        return current;
    }

    let statuses = details
        .iter()
        .map(|d| detail_status(d.quantity_kg, d.quantity_shipped_kg));

    let mut all_filled = true;
    let mut any_progress = false;
    for status in statuses {
        match status {
            DetailStatus::Filled => any_progress = true,
            DetailStatus::PartiallyFilled => {
                all_filled = false;
                any_progress = true;
            }
            DetailStatus::Open => all_filled = false,
        }
    }

    if all_filled {
        SalesOrderStatus::Filled
    } else if any_progress {
        SalesOrderStatus::PartiallyShipped
    } else {
        current
    }
}

/// Lot status after an allocation left `remaining_kg` behind
pub fn lot_status_for_remaining(remaining_kg: Decimal) -> HarvestLotStatus {
    if remaining_kg <= Decimal::ZERO {
        HarvestLotStatus::SoldOut
    } else {
        HarvestLotStatus::InStock
    }
}

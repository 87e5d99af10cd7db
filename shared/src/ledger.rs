//! Consumable-input stock ledger
//!
//! Debits and credits are planned against a snapshot of the locked input
//! rows; the caller writes the resulting quantities in the same transaction
//! as the activity status change that triggered them.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::{ConsumableInput, LedgerAction, UsageLine};

/// A planned change to one input's on-hand quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StockMovement {
    pub input_id: Uuid,
    pub quantity_before: Decimal,
    pub quantity_after: Decimal,
}

impl StockMovement {
    /// Signed change (negative for a debit)
    pub fn delta(&self) -> Decimal {
        self.quantity_after - self.quantity_before
    }
}

/// Combine usage lines per input, ordered by input id
///
/// The id ordering doubles as the row lock order.
pub fn aggregate_usage(lines: &[UsageLine]) -> DomainResult<BTreeMap<Uuid, Decimal>> {
    let mut totals = BTreeMap::new();
    for line in lines {
        let total = totals.entry(line.input_id).or_insert(Decimal::ZERO);
        *total = total.checked_add(line.quantity).ok_or_else(|| {
            DomainError::invalid_input(
                "input_usage",
                format!("usage of input {} is too large", line.input_id),
            )
        })?;
    }
    Ok(totals)
}

fn find_input(inputs: &[ConsumableInput], input_id: Uuid) -> DomainResult<&ConsumableInput> {
    inputs
        .iter()
        .find(|input| input.id == input_id)
        .ok_or_else(|| DomainError::NotFound(format!("Consumable input {}", input_id)))
}

/// Plan subtracting every usage line from stock
///
/// All lines are validated before any movement is produced, so a single
/// short input fails the whole debit.
pub fn plan_debit(
    inputs: &[ConsumableInput],
    lines: &[UsageLine],
) -> DomainResult<Vec<StockMovement>> {
    let totals = aggregate_usage(lines)?;

    let mut movements = Vec::with_capacity(totals.len());
    for (input_id, requested) in totals {
        let input = find_input(inputs, input_id)?;
        if input.quantity_on_hand < requested {
            return Err(DomainError::InsufficientStock {
                resource: format!("input {}", input.name),
                requested,
                available: input.quantity_on_hand,
            });
        }
        movements.push(StockMovement {
            input_id,
            quantity_before: input.quantity_on_hand,
            quantity_after: input.quantity_on_hand - requested,
        });
    }
    Ok(movements)
}

/// Plan returning every usage line to stock; there is no upper bound
pub fn plan_credit(
    inputs: &[ConsumableInput],
    lines: &[UsageLine],
) -> DomainResult<Vec<StockMovement>> {
    aggregate_usage(lines)?
        .into_iter()
        .map(|(input_id, returned)| {
            let input = find_input(inputs, input_id)?;
            let quantity_after = input.quantity_on_hand.checked_add(returned).ok_or_else(|| {
                DomainError::invalid_input(
                    "input_usage",
                    format!("returning {} to input {} overflows its stock", returned, input.name),
                )
            })?;
            Ok(StockMovement {
                input_id,
                quantity_before: input.quantity_on_hand,
                quantity_after,
            })
        })
        .collect()
}

/// Plan the movements a status transition requires
pub fn plan_action(
    action: LedgerAction,
    inputs: &[ConsumableInput],
    lines: &[UsageLine],
) -> DomainResult<Vec<StockMovement>> {
    if lines.is_empty() {
        return Ok(Vec::new());
    }
    match action {
        LedgerAction::Debit => plan_debit(inputs, lines),
        LedgerAction::Credit => plan_credit(inputs, lines),
        LedgerAction::None => Ok(Vec::new()),
    }
}

/// Apply planned movements to an in-memory snapshot
pub fn apply_movements(inputs: &mut [ConsumableInput], movements: &[StockMovement]) {
    for movement in movements {
        if let Some(input) = inputs.iter_mut().find(|i| i.id == movement.input_id) {
            input.quantity_on_hand = movement.quantity_after;
        }
    }
}

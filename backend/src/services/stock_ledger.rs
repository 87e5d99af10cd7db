//! Stock ledger writes for consumable inputs
//!
//! Runs on the caller's transaction so the quantity change commits or rolls
//! back together with the activity status that caused it.

use shared::ledger::{self, aggregate_usage, StockMovement};
use shared::{ConsumableInput, LedgerAction, UsageLine};
use sqlx::PgConnection;
use uuid::Uuid;

use super::consumable_input::ConsumableInputRow;
use crate::error::AppResult;

/// Debit/credit operations on consumable-input stock
pub struct StockLedger;

impl StockLedger {
    /// Lock every input referenced by `lines`, ascending by id
    async fn lock_inputs(
        conn: &mut PgConnection,
        lines: &[UsageLine],
    ) -> AppResult<Vec<ConsumableInput>> {
        let ids: Vec<Uuid> = aggregate_usage(lines)?.into_keys().collect();

        let rows = sqlx::query_as::<_, ConsumableInputRow>(
            r#"
            SELECT id, name, unit_of_measure, quantity_on_hand, unit_cost,
                   created_at, updated_at, deleted_at
            FROM consumable_inputs
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(ConsumableInput::from).collect())
    }

    /// Perform the stock movements required by `action`
    pub async fn apply(
        conn: &mut PgConnection,
        action: LedgerAction,
        lines: &[UsageLine],
    ) -> AppResult<Vec<StockMovement>> {
        if action == LedgerAction::None || lines.is_empty() {
            return Ok(Vec::new());
        }

        let inputs = Self::lock_inputs(conn, lines).await?;
        let movements = ledger::plan_action(action, &inputs, lines)?;

        for movement in &movements {
            sqlx::query("UPDATE consumable_inputs SET quantity_on_hand = $1 WHERE id = $2")
                .bind(movement.quantity_after)
                .bind(movement.input_id)
                .execute(&mut *conn)
                .await?;
            tracing::debug!(
                input_id = %movement.input_id,
                delta = %movement.delta(),
                on_hand = %movement.quantity_after,
                "Stock moved"
            );
        }

        tracing::debug!(?action, movements = movements.len(), "Stock ledger updated");
        Ok(movements)
    }
}

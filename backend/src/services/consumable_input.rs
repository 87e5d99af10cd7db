//! Consumable input service
//!
//! Inputs are created with an opening quantity; after that the on-hand
//! quantity only moves through [`super::StockLedger`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{require_text, validate_non_negative, ConsumableInput};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Consumable input service
#[derive(Clone)]
pub struct ConsumableInputService {
    db: PgPool,
}

/// Database row for a consumable input
#[derive(Debug, FromRow)]
pub(crate) struct ConsumableInputRow {
    pub id: Uuid,
    pub name: String,
    pub unit_of_measure: String,
    pub quantity_on_hand: Decimal,
    pub unit_cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<ConsumableInputRow> for ConsumableInput {
    fn from(row: ConsumableInputRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            unit_of_measure: row.unit_of_measure,
            quantity_on_hand: row.quantity_on_hand,
            unit_cost: row.unit_cost,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// Input for creating a consumable input
#[derive(Debug, Deserialize)]
pub struct CreateInputInput {
    pub name: String,
    pub unit_of_measure: String,
    pub quantity_on_hand: Decimal,
    pub unit_cost: Option<Decimal>,
}

impl ConsumableInputService {
    /// Create a new ConsumableInputService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a consumable input with its opening stock
    pub async fn create_input(&self, input: CreateInputInput) -> AppResult<ConsumableInput> {
        let name = require_text("name", &input.name)?;
        let unit = require_text("unit_of_measure", &input.unit_of_measure)?;
        validate_non_negative("quantity_on_hand", input.quantity_on_hand)?;
        if let Some(cost) = input.unit_cost {
            validate_non_negative("unit_cost", cost)?;
        }

        let row = sqlx::query_as::<_, ConsumableInputRow>(
            r#"
            INSERT INTO consumable_inputs (name, unit_of_measure, quantity_on_hand, unit_cost)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, unit_of_measure, quantity_on_hand, unit_cost,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(&name)
        .bind(&unit)
        .bind(input.quantity_on_hand)
        .bind(input.unit_cost)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Get an input by ID, archived or not
    pub async fn get_input(&self, input_id: Uuid) -> AppResult<ConsumableInput> {
        let row = sqlx::query_as::<_, ConsumableInputRow>(
            r#"
            SELECT id, name, unit_of_measure, quantity_on_hand, unit_cost,
                   created_at, updated_at, deleted_at
            FROM consumable_inputs
            WHERE id = $1
            "#,
        )
        .bind(input_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Consumable input {}", input_id)))?;

        Ok(row.into())
    }

    /// List inputs that are not archived
    pub async fn list_inputs(&self) -> AppResult<Vec<ConsumableInput>> {
        let rows = sqlx::query_as::<_, ConsumableInputRow>(
            r#"
            SELECT id, name, unit_of_measure, quantity_on_hand, unit_cost,
                   created_at, updated_at, deleted_at
            FROM consumable_inputs
            WHERE deleted_at IS NULL
            ORDER BY name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ConsumableInput::from).collect())
    }

    /// Archive (soft delete) an input
    ///
    /// Usage history keeps pointing at the row, so it is never removed.
    pub async fn archive_input(&self, input_id: Uuid) -> AppResult<ConsumableInput> {
        let row = sqlx::query_as::<_, ConsumableInputRow>(
            r#"
            UPDATE consumable_inputs
            SET deleted_at = COALESCE(deleted_at, NOW())
            WHERE id = $1
            RETURNING id, name, unit_of_measure, quantity_on_hand, unit_cost,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(input_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Consumable input {}", input_id)))?;

        tracing::info!(input_id = %input_id, "Consumable input archived");
        Ok(row.into())
    }
}

//! Harvest lot service
//!
//! Lots are registered with a gross weight and classified exactly once.
//! Remaining weight is only ever reduced by the shipment service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    normalize_positive_kg, validate_lot_code, Classification, HarvestLot, HarvestLotStatus,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{map_unique_violation, AppError, AppResult};

/// Column list shared by every harvest lot query
pub(crate) const HARVEST_LOT_COLUMNS: &str = "id, plot_id, harvest_date, lot_code, variety, \
     caliber, gross_weight_kg, net_weight_kg, remaining_net_weight_kg, yield_percent, status, \
     created_at, updated_at";

/// Harvest lot service
#[derive(Clone)]
pub struct HarvestLotService {
    db: PgPool,
}

/// Database row for a harvest lot
#[derive(Debug, FromRow)]
pub(crate) struct HarvestLotRow {
    pub id: Uuid,
    pub plot_id: Uuid,
    pub harvest_date: NaiveDate,
    pub lot_code: String,
    pub variety: Option<String>,
    pub caliber: Option<String>,
    pub gross_weight_kg: Decimal,
    pub net_weight_kg: Option<Decimal>,
    pub remaining_net_weight_kg: Option<Decimal>,
    pub yield_percent: Option<Decimal>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<HarvestLotRow> for HarvestLot {
    type Error = AppError;

    fn try_from(row: HarvestLotRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            plot_id: row.plot_id,
            harvest_date: row.harvest_date,
            lot_code: row.lot_code,
            variety: row.variety,
            caliber: row.caliber,
            gross_weight_kg: row.gross_weight_kg,
            net_weight_kg: row.net_weight_kg,
            remaining_net_weight_kg: row.remaining_net_weight_kg,
            yield_percent: row.yield_percent,
            status: row.status.parse().map_err(AppError::Internal)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input for registering a harvest lot
#[derive(Debug, Deserialize)]
pub struct CreateHarvestLotInput {
    pub plot_id: Uuid,
    pub harvest_date: NaiveDate,
    pub lot_code: String,
    pub gross_weight_kg: Decimal,
}

/// Input for editing a lot before classification
#[derive(Debug, Default, Deserialize)]
pub struct UpdateHarvestLotInput {
    pub plot_id: Option<Uuid>,
    pub harvest_date: Option<NaiveDate>,
    pub gross_weight_kg: Option<Decimal>,
}

/// Query filter for listing lots
#[derive(Debug, Default, Deserialize)]
pub struct HarvestLotQuery {
    pub status: Option<HarvestLotStatus>,
}

impl HarvestLotService {
    /// Create a new HarvestLotService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a harvested lot, pending classification
    pub async fn create_lot(&self, input: CreateHarvestLotInput) -> AppResult<HarvestLot> {
        let lot_code = validate_lot_code(&input.lot_code)?;
        let gross = normalize_positive_kg("gross_weight_kg", input.gross_weight_kg)?;

        let row = sqlx::query_as::<_, HarvestLotRow>(&format!(
            r#"
            INSERT INTO harvest_lots (plot_id, harvest_date, lot_code, gross_weight_kg, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            HARVEST_LOT_COLUMNS
        ))
        .bind(input.plot_id)
        .bind(input.harvest_date)
        .bind(&lot_code)
        .bind(gross)
        .bind(HarvestLotStatus::PendingClassification.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, "harvest_lots_lot_code_key", "lot_code"))?;

        tracing::info!(lot_id = %row.id, lot_code = %lot_code, gross_weight_kg = %gross, "Harvest lot registered");
        HarvestLot::try_from(row)
    }

    /// Get a lot by ID
    pub async fn get_lot(&self, lot_id: Uuid) -> AppResult<HarvestLot> {
        let mut conn = self.db.acquire().await?;
        fetch_lot(&mut conn, lot_id, false).await
    }

    /// List lots, optionally filtered by status
    pub async fn list_lots(&self, query: HarvestLotQuery) -> AppResult<Vec<HarvestLot>> {
        let rows = sqlx::query_as::<_, HarvestLotRow>(&format!(
            r#"
            SELECT {}
            FROM harvest_lots
            WHERE ($1::VARCHAR IS NULL OR status = $1)
            ORDER BY harvest_date DESC, lot_code
            "#,
            HARVEST_LOT_COLUMNS
        ))
        .bind(query.status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(HarvestLot::try_from).collect()
    }

    /// Edit a lot that has not been classified yet
    pub async fn update_lot(
        &self,
        lot_id: Uuid,
        input: UpdateHarvestLotInput,
    ) -> AppResult<HarvestLot> {
        let mut tx = self.db.begin().await?;

        let mut lot = fetch_lot(&mut tx, lot_id, true).await?;
        lot.ensure_editable()?;

        if let Some(plot_id) = input.plot_id {
            lot.plot_id = plot_id;
        }
        if let Some(harvest_date) = input.harvest_date {
            lot.harvest_date = harvest_date;
        }
        if let Some(gross) = input.gross_weight_kg {
            lot.gross_weight_kg = normalize_positive_kg("gross_weight_kg", gross)?;
        }

        sqlx::query(
            r#"
            UPDATE harvest_lots
            SET plot_id = $1, harvest_date = $2, gross_weight_kg = $3
            WHERE id = $4
            "#,
        )
        .bind(lot.plot_id)
        .bind(lot.harvest_date)
        .bind(lot.gross_weight_kg)
        .bind(lot_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_lot(lot_id).await
    }

    /// Classify a lot, fixing its variety, caliber and net weight
    pub async fn classify_lot(
        &self,
        lot_id: Uuid,
        classification: Classification,
    ) -> AppResult<HarvestLot> {
        let mut tx = self.db.begin().await?;

        let mut lot = fetch_lot(&mut tx, lot_id, true).await?;
        lot.classify(classification)?;

        sqlx::query(
            r#"
            UPDATE harvest_lots
            SET variety = $1, caliber = $2, net_weight_kg = $3,
                remaining_net_weight_kg = $4, yield_percent = $5, status = $6
            WHERE id = $7
            "#,
        )
        .bind(&lot.variety)
        .bind(&lot.caliber)
        .bind(lot.net_weight_kg)
        .bind(lot.remaining_net_weight_kg)
        .bind(lot.yield_percent)
        .bind(lot.status.as_str())
        .bind(lot_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            lot_id = %lot_id,
            lot_code = %lot.lot_code,
            net_weight_kg = ?lot.net_weight_kg,
            yield_percent = ?lot.yield_percent,
            "Harvest lot classified"
        );

        self.get_lot(lot_id).await
    }
}

/// Load a lot, optionally locking its row
pub(crate) async fn fetch_lot(
    conn: &mut PgConnection,
    lot_id: Uuid,
    for_update: bool,
) -> AppResult<HarvestLot> {
    let sql = format!(
        "SELECT {} FROM harvest_lots WHERE id = $1{}",
        HARVEST_LOT_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );

    let row = sqlx::query_as::<_, HarvestLotRow>(&sql)
        .bind(lot_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Harvest lot {}", lot_id)))?;

    HarvestLot::try_from(row)
}

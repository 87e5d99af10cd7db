//! Work activity service
//!
//! Owns the approval state machine. Every status change that moves stock is
//! written in the same transaction as the stock ledger update, so an
//! approved activity has always had its usage debited exactly once.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    require_text, validate_positive_quantity, ActivityStatus, ActivityWithUsage, ActorRole,
    DomainError, InputUsage, UsageLine, WorkActivity, WorkOrder,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::stock_ledger::StockLedger;
use crate::error::{AppError, AppResult};

/// Work activity service
#[derive(Clone)]
pub struct ActivityService {
    db: PgPool,
}

/// Database row for a work activity
#[derive(Debug, FromRow)]
struct WorkActivityRow {
    id: Uuid,
    work_order_id: Uuid,
    description: String,
    activity_date: NaiveDate,
    status: String,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WorkActivityRow> for WorkActivity {
    type Error = AppError;

    fn try_from(row: WorkActivityRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            work_order_id: row.work_order_id,
            description: row.description,
            activity_date: row.activity_date,
            status: row.status.parse().map_err(AppError::Internal)?,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for an input usage line
#[derive(Debug, FromRow)]
struct InputUsageRow {
    id: Uuid,
    activity_id: Uuid,
    input_id: Uuid,
    quantity: Decimal,
    created_at: DateTime<Utc>,
}

impl From<InputUsageRow> for InputUsage {
    fn from(row: InputUsageRow) -> Self {
        Self {
            id: row.id,
            activity_id: row.activity_id,
            input_id: row.input_id,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

/// Input for creating a work order
#[derive(Debug, Deserialize)]
pub struct CreateWorkOrderInput {
    pub description: String,
}

/// Input for recording a work activity
#[derive(Debug, Deserialize)]
pub struct CreateActivityInput {
    pub work_order_id: Uuid,
    pub description: String,
    pub activity_date: Option<NaiveDate>,
    /// Honoured for supervisors and admins only
    pub status: Option<ActivityStatus>,
    #[serde(default)]
    pub input_usage: Vec<UsageLine>,
}

/// Input for updating a work activity
#[derive(Debug, Default, Deserialize)]
pub struct UpdateActivityInput {
    pub description: Option<String>,
    pub status: Option<ActivityStatus>,
    /// Replaces every usage line; only allowed while PENDING
    pub input_usage: Option<Vec<UsageLine>>,
}

/// Reject non-positive usage quantities
fn validate_usage(lines: &[UsageLine]) -> AppResult<()> {
    for (index, line) in lines.iter().enumerate() {
        validate_positive_quantity(&format!("input_usage[{}].quantity", index), line.quantity)?;
    }
    Ok(())
}

impl ActivityService {
    /// Create a new ActivityService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a work order to hang activities from
    pub async fn create_work_order(&self, input: CreateWorkOrderInput) -> AppResult<WorkOrder> {
        let description = require_text("description", &input.description)?;

        let row = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>, DateTime<Utc>)>(
            r#"
            INSERT INTO work_orders (description)
            VALUES ($1)
            RETURNING id, description, created_at, updated_at
            "#,
        )
        .bind(&description)
        .fetch_one(&self.db)
        .await?;

        Ok(WorkOrder {
            id: row.0,
            description: row.1,
            created_at: row.2,
            updated_at: row.3,
        })
    }

    /// Get an activity with its usage lines
    pub async fn get_activity(&self, activity_id: Uuid) -> AppResult<ActivityWithUsage> {
        let mut conn = self.db.acquire().await?;
        let activity = fetch_activity(&mut conn, activity_id, false).await?;
        let input_usage = fetch_usage(&mut conn, activity_id).await?;
        Ok(ActivityWithUsage {
            activity,
            input_usage,
        })
    }

    /// Record a new activity
    ///
    /// An activity created as APPROVED has its usage debited in the same
    /// transaction.
    pub async fn create_activity(
        &self,
        actor_id: Uuid,
        role: ActorRole,
        input: CreateActivityInput,
    ) -> AppResult<ActivityWithUsage> {
        let status = ActivityStatus::initial(role, input.status)?;
        let description = require_text("description", &input.description)?;
        validate_usage(&input.input_usage)?;
        let activity_date = input.activity_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        let work_order_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM work_orders WHERE id = $1)",
        )
        .bind(input.work_order_id)
        .fetch_one(&mut *tx)
        .await?;

        if !work_order_exists {
            return Err(AppError::not_found(format!("Work order {}", input.work_order_id)));
        }

        ensure_inputs_usable(&mut tx, &input.input_usage).await?;

        let activity_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO work_activities (work_order_id, description, activity_date, status, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(input.work_order_id)
        .bind(&description)
        .bind(activity_date)
        .bind(status.as_str())
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_usage(&mut tx, activity_id, &input.input_usage).await?;

        let action = ActivityStatus::Pending.ledger_action(status);
        let movements = StockLedger::apply(&mut tx, action, &input.input_usage).await?;

        tx.commit().await?;

        tracing::info!(
            activity_id = %activity_id,
            status = %status,
            usage_lines = input.input_usage.len(),
            stock_movements = movements.len(),
            "Work activity created"
        );

        self.get_activity(activity_id).await
    }

    /// Update an activity: replace usage lines and/or move its status
    ///
    /// Usage replacement is checked against the status the activity has
    /// before this request and is applied before any status change, so a
    /// single request may replace the lines of a PENDING activity and
    /// approve it.
    pub async fn update_activity(
        &self,
        activity_id: Uuid,
        input: UpdateActivityInput,
    ) -> AppResult<ActivityWithUsage> {
        let mut tx = self.db.begin().await?;

        let activity = fetch_activity(&mut tx, activity_id, true).await?;

        if let Some(lines) = &input.input_usage {
            if !activity.status.allows_usage_changes() {
                return Err(DomainError::ImmutableActivity(activity_id).into());
            }
            validate_usage(lines)?;
            ensure_inputs_usable(&mut tx, lines).await?;

            sqlx::query("DELETE FROM work_activity_input_usages WHERE activity_id = $1")
                .bind(activity_id)
                .execute(&mut *tx)
                .await?;
            insert_usage(&mut tx, activity_id, lines).await?;
        }

        if let Some(description) = &input.description {
            let description = require_text("description", description)?;
            sqlx::query("UPDATE work_activities SET description = $1 WHERE id = $2")
                .bind(&description)
                .bind(activity_id)
                .execute(&mut *tx)
                .await?;
        }

        let mut transition = None;
        if let Some(next) = input.status {
            if next != activity.status {
                let action = activity.status.ledger_action(next);
                let lines: Vec<UsageLine> = fetch_usage(&mut tx, activity_id)
                    .await?
                    .iter()
                    .map(UsageLine::from)
                    .collect();
                let movements = StockLedger::apply(&mut tx, action, &lines).await?;

                sqlx::query("UPDATE work_activities SET status = $1 WHERE id = $2")
                    .bind(next.as_str())
                    .bind(activity_id)
                    .execute(&mut *tx)
                    .await?;

                transition = Some((next, action, movements.len()));
            }
        }

        tx.commit().await?;

        if let Some((next, action, stock_movements)) = transition {
            tracing::info!(
                activity_id = %activity_id,
                from = %activity.status,
                to = %next,
                ?action,
                stock_movements,
                "Work activity status changed"
            );
        }

        self.get_activity(activity_id).await
    }
}

/// Load an activity, optionally locking its row
async fn fetch_activity(
    conn: &mut PgConnection,
    activity_id: Uuid,
    for_update: bool,
) -> AppResult<WorkActivity> {
    let sql = if for_update {
        r#"
        SELECT id, work_order_id, description, activity_date, status, created_by,
               created_at, updated_at
        FROM work_activities
        WHERE id = $1
        FOR UPDATE
        "#
    } else {
        r#"
        SELECT id, work_order_id, description, activity_date, status, created_by,
               created_at, updated_at
        FROM work_activities
        WHERE id = $1
        "#
    };

    let row = sqlx::query_as::<_, WorkActivityRow>(sql)
        .bind(activity_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Work activity {}", activity_id)))?;

    WorkActivity::try_from(row)
}

async fn fetch_usage(conn: &mut PgConnection, activity_id: Uuid) -> AppResult<Vec<InputUsage>> {
    let rows = sqlx::query_as::<_, InputUsageRow>(
        r#"
        SELECT id, activity_id, input_id, quantity, created_at
        FROM work_activity_input_usages
        WHERE activity_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(activity_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(InputUsage::from).collect())
}

async fn insert_usage(
    conn: &mut PgConnection,
    activity_id: Uuid,
    lines: &[UsageLine],
) -> AppResult<()> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO work_activity_input_usages (activity_id, input_id, quantity)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(activity_id)
        .bind(line.input_id)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// New usage lines may only reference existing, non-archived inputs
async fn ensure_inputs_usable(conn: &mut PgConnection, lines: &[UsageLine]) -> AppResult<()> {
    if lines.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = lines.iter().map(|l| l.input_id).collect();
    let found: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM consumable_inputs WHERE id = ANY($1) AND deleted_at IS NULL",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(AppError::not_found(format!("Consumable input {}", missing))),
        None => Ok(()),
    }
}

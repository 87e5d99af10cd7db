//! Sales order service
//!
//! Orders carry demand lines (variety, caliber, kg, price). Totals and
//! statuses are recomputed from the full set of lines on every change.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::status::order_status;
use shared::{
    order_total, require_text, Customer, DetailChange, DomainError, NewDetail, SalesOrder,
    SalesOrderDetail, SalesOrderStatus, SalesOrderWithDetails,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub(crate) const SALES_ORDER_COLUMNS: &str =
    "id, customer_id, order_date, status, total_amount, created_at, updated_at";

pub(crate) const DETAIL_COLUMNS: &str = "id, sales_order_id, variety, caliber, quantity_kg, \
     unit_price, quantity_shipped_kg, status, created_at, updated_at";

/// Sales order service
#[derive(Clone)]
pub struct SalesOrderService {
    db: PgPool,
}

/// Database row for a sales order
#[derive(Debug, FromRow)]
pub(crate) struct SalesOrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_date: NaiveDate,
    pub status: String,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SalesOrderRow> for SalesOrder {
    type Error = AppError;

    fn try_from(row: SalesOrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            customer_id: row.customer_id,
            order_date: row.order_date,
            status: row.status.parse().map_err(AppError::Internal)?,
            total_amount: row.total_amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for a demand line
#[derive(Debug, FromRow)]
pub(crate) struct SalesOrderDetailRow {
    pub id: Uuid,
    pub sales_order_id: Uuid,
    pub variety: String,
    pub caliber: String,
    pub quantity_kg: Decimal,
    pub unit_price: Decimal,
    pub quantity_shipped_kg: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SalesOrderDetailRow> for SalesOrderDetail {
    type Error = AppError;

    fn try_from(row: SalesOrderDetailRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            sales_order_id: row.sales_order_id,
            variety: row.variety,
            caliber: row.caliber,
            quantity_kg: row.quantity_kg,
            unit_price: row.unit_price,
            quantity_shipped_kg: row.quantity_shipped_kg,
            status: row.status.parse().map_err(AppError::Internal)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// Input for registering a customer
#[derive(Debug, Deserialize)]
pub struct CreateCustomerInput {
    pub name: String,
}

/// Input for creating a sales order
#[derive(Debug, Deserialize)]
pub struct CreateSalesOrderInput {
    pub customer_id: Uuid,
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub details: Vec<NewDetail>,
}

impl SalesOrderService {
    /// Create a new SalesOrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a customer that orders can reference
    pub async fn create_customer(&self, input: CreateCustomerInput) -> AppResult<Customer> {
        let name = require_text("name", &input.name)?;

        let row = sqlx::query_as::<_, CustomerRow>(
            "INSERT INTO customers (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(&name)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Create a PENDING order with its demand lines
    pub async fn create_order(
        &self,
        input: CreateSalesOrderInput,
    ) -> AppResult<SalesOrderWithDetails> {
        let lines = input
            .details
            .iter()
            .map(NewDetail::normalized)
            .collect::<Result<Vec<_>, _>>()?;
        let order_date = input.order_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        let customer_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)",
        )
        .bind(input.customer_id)
        .fetch_one(&mut *tx)
        .await?;

        if !customer_exists {
            return Err(AppError::not_found(format!("Customer {}", input.customer_id)));
        }

        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sales_orders (customer_id, order_date, status)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(input.customer_id)
        .bind(order_date)
        .bind(SalesOrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        for line in &lines {
            insert_detail(&mut tx, order_id, line).await?;
        }

        let details = fetch_details(&mut tx, order_id, false).await?;
        sqlx::query("UPDATE sales_orders SET total_amount = $1 WHERE id = $2")
            .bind(order_total(&details))
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, lines = lines.len(), "Sales order created");
        self.get_order(order_id).await
    }

    /// Get an order with its demand lines
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<SalesOrderWithDetails> {
        let mut conn = self.db.acquire().await?;
        let order = fetch_order(&mut conn, order_id, false).await?;
        let details = fetch_details(&mut conn, order_id, false).await?;
        Ok(SalesOrderWithDetails { order, details })
    }

    /// Approve a PENDING order so it can be shipped
    pub async fn approve_order(&self, order_id: Uuid) -> AppResult<SalesOrderWithDetails> {
        let mut tx = self.db.begin().await?;

        let order = fetch_order(&mut tx, order_id, true).await?;
        if order.status != SalesOrderStatus::Pending {
            return Err(DomainError::InvalidState(format!(
                "sales order {} is {}, only PENDING orders can be approved",
                order_id, order.status
            ))
            .into());
        }

        sqlx::query("UPDATE sales_orders SET status = $1 WHERE id = $2")
            .bind(SalesOrderStatus::Approved.as_str())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, "Sales order approved");
        self.get_order(order_id).await
    }

    /// Add a demand line to an open order
    pub async fn add_detail(
        &self,
        order_id: Uuid,
        line: NewDetail,
    ) -> AppResult<SalesOrderWithDetails> {
        let line = line.normalized()?;

        let mut tx = self.db.begin().await?;

        let order = fetch_order(&mut tx, order_id, true).await?;
        ensure_lines_editable(&order)?;

        insert_detail(&mut tx, order_id, &line).await?;
        refresh_order(&mut tx, &order).await?;

        tx.commit().await?;

        self.get_order(order_id).await
    }

    /// Edit a demand line of an open order
    pub async fn update_detail(
        &self,
        order_id: Uuid,
        detail_id: Uuid,
        change: DetailChange,
    ) -> AppResult<SalesOrderWithDetails> {
        let mut tx = self.db.begin().await?;

        let order = fetch_order(&mut tx, order_id, true).await?;
        ensure_lines_editable(&order)?;

        let mut details = fetch_details(&mut tx, order_id, true).await?;
        let detail = details
            .iter_mut()
            .find(|d| d.id == detail_id)
            .ok_or_else(|| AppError::not_found(format!("Demand line {}", detail_id)))?;
        detail.apply_change(&change)?;

        sqlx::query(
            r#"
            UPDATE sales_order_details
            SET variety = $1, caliber = $2, quantity_kg = $3, unit_price = $4, status = $5
            WHERE id = $6
            "#,
        )
        .bind(&detail.variety)
        .bind(&detail.caliber)
        .bind(detail.quantity_kg)
        .bind(detail.unit_price)
        .bind(detail.status.as_str())
        .bind(detail_id)
        .execute(&mut *tx)
        .await?;

        refresh_order(&mut tx, &order).await?;

        tx.commit().await?;

        self.get_order(order_id).await
    }
}

fn ensure_lines_editable(order: &SalesOrder) -> AppResult<()> {
    if !order.status.accepts_line_changes() {
        return Err(DomainError::InvalidState(format!(
            "sales order {} is {}; its lines can no longer change",
            order.id, order.status
        ))
        .into());
    }
    Ok(())
}

async fn insert_detail(conn: &mut PgConnection, order_id: Uuid, line: &NewDetail) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales_order_details
            (sales_order_id, variety, caliber, quantity_kg, unit_price, quantity_shipped_kg, status)
        VALUES ($1, $2, $3, $4, $5, 0, 'OPEN')
        "#,
    )
    .bind(order_id)
    .bind(&line.variety)
    .bind(&line.caliber)
    .bind(line.quantity_kg)
    .bind(line.unit_price)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Recompute the total and status of an order from its current lines
async fn refresh_order(conn: &mut PgConnection, order: &SalesOrder) -> AppResult<()> {
    let details = fetch_details(conn, order.id, false).await?;
    let status = order_status(order.status, &details);

    sqlx::query("UPDATE sales_orders SET total_amount = $1, status = $2 WHERE id = $3")
        .bind(order_total(&details))
        .bind(status.as_str())
        .bind(order.id)
        .execute(&mut *conn)
        .await?;

    if status != order.status {
        tracing::info!(order_id = %order.id, from = %order.status, to = %status, "Sales order status changed");
    }
    Ok(())
}

/// Load an order, optionally locking its row
pub(crate) async fn fetch_order(
    conn: &mut PgConnection,
    order_id: Uuid,
    for_update: bool,
) -> AppResult<SalesOrder> {
    let sql = format!(
        "SELECT {} FROM sales_orders WHERE id = $1{}",
        SALES_ORDER_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );

    let row = sqlx::query_as::<_, SalesOrderRow>(&sql)
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Sales order {}", order_id)))?;

    SalesOrder::try_from(row)
}

/// Load every line of an order, optionally locking them in id order
pub(crate) async fn fetch_details(
    conn: &mut PgConnection,
    order_id: Uuid,
    for_update: bool,
) -> AppResult<Vec<SalesOrderDetail>> {
    let sql = format!(
        "SELECT {} FROM sales_order_details WHERE sales_order_id = $1 ORDER BY {}",
        DETAIL_COLUMNS,
        if for_update { "id FOR UPDATE" } else { "created_at, id" }
    );

    let rows = sqlx::query_as::<_, SalesOrderDetailRow>(&sql)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

    rows.into_iter().map(SalesOrderDetail::try_from).collect()
}

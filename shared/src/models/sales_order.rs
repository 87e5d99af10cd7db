//! Sales order and demand line models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::status::detail_status;
use crate::validation::{normalize_positive_kg, require_text, round_kg, validate_non_negative};

/// Status of a sales order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesOrderStatus {
    Pending,
    Approved,
    PartiallyShipped,
    /// Every demand line is filled
    Filled,
    Cancelled,
}

impl SalesOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderStatus::Pending => "PENDING",
            SalesOrderStatus::Approved => "APPROVED",
            SalesOrderStatus::PartiallyShipped => "PARTIALLY_SHIPPED",
            SalesOrderStatus::Filled => "FILLED",
            SalesOrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether shipments may be recorded against an order in this status
    pub fn accepts_shipments(&self) -> bool {
        matches!(
            self,
            SalesOrderStatus::Approved | SalesOrderStatus::PartiallyShipped
        )
    }

    /// Whether demand lines may still be added or edited
    pub fn accepts_line_changes(&self) -> bool {
        matches!(
            self,
            SalesOrderStatus::Pending
                | SalesOrderStatus::Approved
                | SalesOrderStatus::PartiallyShipped
        )
    }
}

impl std::fmt::Display for SalesOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SalesOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SalesOrderStatus::Pending),
            "APPROVED" => Ok(SalesOrderStatus::Approved),
            "PARTIALLY_SHIPPED" => Ok(SalesOrderStatus::PartiallyShipped),
            "FILLED" => Ok(SalesOrderStatus::Filled),
            "CANCELLED" => Ok(SalesOrderStatus::Cancelled),
            other => Err(format!("unknown sales order status '{}'", other)),
        }
    }
}

/// Fill status of a single demand line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetailStatus {
    Open,
    PartiallyFilled,
    Filled,
}

impl DetailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailStatus::Open => "OPEN",
            DetailStatus::PartiallyFilled => "PARTIALLY_FILLED",
            DetailStatus::Filled => "FILLED",
        }
    }
}

impl std::fmt::Display for DetailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DetailStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(DetailStatus::Open),
            "PARTIALLY_FILLED" => Ok(DetailStatus::PartiallyFilled),
            "FILLED" => Ok(DetailStatus::Filled),
            other => Err(format!("unknown demand line status '{}'", other)),
        }
    }
}

/// A customer sales order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_date: NaiveDate,
    pub status: SalesOrderStatus,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One caliber/variety/quantity requirement within an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesOrderDetail {
    pub id: Uuid,
    pub sales_order_id: Uuid,
    pub variety: String,
    pub caliber: String,
    pub quantity_kg: Decimal,
    pub unit_price: Decimal,
    /// Derived from shipment allocations only
    pub quantity_shipped_kg: Decimal,
    pub status: DetailStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SalesOrderDetail {
    /// Quantity still to be shipped on this line
    pub fn outstanding_kg(&self) -> Decimal {
        (self.quantity_kg - self.quantity_shipped_kg).max(Decimal::ZERO)
    }

    pub fn subtotal(&self) -> Decimal {
        round_kg(self.quantity_kg * self.unit_price)
    }
}

/// Order total: sum of line subtotals
pub fn order_total(details: &[SalesOrderDetail]) -> Decimal {
    round_kg(details.iter().map(SalesOrderDetail::subtotal).sum())
}

/// Sales order together with its demand lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrderWithDetails {
    #[serde(flatten)]
    pub order: SalesOrder,
    pub details: Vec<SalesOrderDetail>,
}

/// Customer reference for sales orders (managed outside this core)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A demand line as submitted by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDetail {
    pub variety: String,
    pub caliber: String,
    pub quantity_kg: Decimal,
    pub unit_price: Decimal,
}

impl NewDetail {
    /// Trim text fields and normalise quantity and price to two decimals
    pub fn normalized(&self) -> DomainResult<NewDetail> {
        validate_non_negative("unit_price", self.unit_price)?;
        Ok(NewDetail {
            variety: require_text("variety", &self.variety)?,
            caliber: require_text("caliber", &self.caliber)?,
            quantity_kg: normalize_positive_kg("quantity_kg", self.quantity_kg)?,
            unit_price: round_kg(self.unit_price),
        })
    }
}

/// Changes to an existing demand line
///
/// `quantity_shipped_kg` is accepted on the wire only so it can be refused:
/// shipped quantities move through shipments alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailChange {
    pub variety: Option<String>,
    pub caliber: Option<String>,
    pub quantity_kg: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub quantity_shipped_kg: Option<Decimal>,
}

impl SalesOrderDetail {
    /// Apply a client edit and recompute the line status
    pub fn apply_change(&mut self, change: &DetailChange) -> DomainResult<()> {
        if change.quantity_shipped_kg.is_some() {
            return Err(DomainError::invalid_input(
                "quantity_shipped_kg",
                "is maintained by shipments and cannot be edited",
            ));
        }

        let has_shipments = self.quantity_shipped_kg > Decimal::ZERO;

        if let Some(variety) = &change.variety {
            let variety = require_text("variety", variety)?;
            if has_shipments && variety != self.variety {
                return Err(DomainError::InvalidState(format!(
                    "demand line {} has shipments; its variety is fixed",
                    self.id
                )));
            }
            self.variety = variety;
        }

        if let Some(caliber) = &change.caliber {
            let caliber = require_text("caliber", caliber)?;
            if has_shipments && caliber != self.caliber {
                return Err(DomainError::InvalidState(format!(
                    "demand line {} has shipments; its caliber is fixed",
                    self.id
                )));
            }
            self.caliber = caliber;
        }

        if let Some(quantity) = change.quantity_kg {
            let quantity = normalize_positive_kg("quantity_kg", quantity)?;
            if quantity < self.quantity_shipped_kg {
                return Err(DomainError::invalid_input(
                    "quantity_kg",
                    format!(
                        "cannot be below the {} kg already shipped",
                        self.quantity_shipped_kg
                    ),
                ));
            }
            self.quantity_kg = quantity;
        }

        if let Some(price) = change.unit_price {
            validate_non_negative("unit_price", price)?;
            self.unit_price = round_kg(price);
        }

        self.status = detail_status(self.quantity_kg, self.quantity_shipped_kg);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn detail(qty: &str, price: &str, shipped: &str) -> SalesOrderDetail {
        let now = Utc::now();
        SalesOrderDetail {
            id: Uuid::new_v4(),
            sales_order_id: Uuid::new_v4(),
            variety: "Keitt".to_string(),
            caliber: "8".to_string(),
            quantity_kg: Decimal::from_str(qty).unwrap(),
            unit_price: Decimal::from_str(price).unwrap(),
            quantity_shipped_kg: Decimal::from_str(shipped).unwrap(),
            status: DetailStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_order_total_sums_subtotals() {
        let details = vec![detail("500", "1.25", "0"), detail("200", "2.10", "0")];
        assert_eq!(order_total(&details), Decimal::from(1045));
    }

    #[test]
    fn test_order_total_empty() {
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_outstanding_never_negative() {
        assert_eq!(detail("500", "1", "400").outstanding_kg(), Decimal::from(100));
        assert_eq!(detail("500", "1", "500").outstanding_kg(), Decimal::ZERO);
    }

    #[test]
    fn test_only_approved_or_partially_shipped_accept_shipments() {
        assert!(SalesOrderStatus::Approved.accepts_shipments());
        assert!(SalesOrderStatus::PartiallyShipped.accepts_shipments());
        assert!(!SalesOrderStatus::Pending.accepts_shipments());
        assert!(!SalesOrderStatus::Filled.accepts_shipments());
        assert!(!SalesOrderStatus::Cancelled.accepts_shipments());
    }

    #[test]
    fn test_new_detail_normalizes() {
        let line = NewDetail {
            variety: "  Keitt ".to_string(),
            caliber: "8".to_string(),
            quantity_kg: Decimal::from_str("100.005").unwrap(),
            unit_price: Decimal::from_str("1.5").unwrap(),
        }
        .normalized()
        .unwrap();
        assert_eq!(line.variety, "Keitt");
        assert_eq!(line.quantity_kg, Decimal::from_str("100.01").unwrap());
    }

    #[test]
    fn test_new_detail_rejects_negative_price() {
        let err = NewDetail {
            variety: "Keitt".to_string(),
            caliber: "8".to_string(),
            quantity_kg: Decimal::from(10),
            unit_price: Decimal::from(-1),
        }
        .normalized()
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { .. }));
    }

    #[test]
    fn test_change_rejects_shipped_quantity() {
        let mut line = detail("500", "1", "0");
        let change = DetailChange {
            quantity_shipped_kg: Some(Decimal::from(10)),
            ..Default::default()
        };
        assert!(matches!(
            line.apply_change(&change).unwrap_err(),
            DomainError::InvalidInput { .. }
        ));
    }

    #[test]
    fn test_change_cannot_drop_below_shipped() {
        let mut line = detail("500", "1", "300");
        let change = DetailChange {
            quantity_kg: Some(Decimal::from(200)),
            ..Default::default()
        };
        assert!(line.apply_change(&change).is_err());
        assert_eq!(line.quantity_kg, Decimal::from(500));
    }

    #[test]
    fn test_change_to_shipped_quantity_fills_line() {
        let mut line = detail("500", "1", "300");
        line.status = DetailStatus::PartiallyFilled;
        let change = DetailChange {
            quantity_kg: Some(Decimal::from(300)),
            ..Default::default()
        };
        line.apply_change(&change).unwrap();
        assert_eq!(line.status, DetailStatus::Filled);
    }

    #[test]
    fn test_variety_fixed_once_shipped() {
        let mut line = detail("500", "1", "10");
        let change = DetailChange {
            variety: Some("Tommy Atkins".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            line.apply_change(&change).unwrap_err(),
            DomainError::InvalidState(_)
        ));

        let mut fresh = detail("500", "1", "0");
        fresh.apply_change(&change).unwrap();
        assert_eq!(fresh.variety, "Tommy Atkins");
    }
}

//! Harvest lot models
//!
//! A lot is created with only its gross weight known. Classification fixes
//! variety, caliber and net weight once; after that only allocations move
//! the remaining weight and status.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::status::lot_status_for_remaining;
use crate::validation::{normalize_positive_kg, require_text, round_kg};

/// Lifecycle status of a harvest lot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarvestLotStatus {
    PendingClassification,
    InStock,
    SoldOut,
}

impl HarvestLotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HarvestLotStatus::PendingClassification => "PENDING_CLASSIFICATION",
            HarvestLotStatus::InStock => "IN_STOCK",
            HarvestLotStatus::SoldOut => "SOLD_OUT",
        }
    }
}

impl std::fmt::Display for HarvestLotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HarvestLotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_CLASSIFICATION" => Ok(HarvestLotStatus::PendingClassification),
            "IN_STOCK" => Ok(HarvestLotStatus::InStock),
            "SOLD_OUT" => Ok(HarvestLotStatus::SoldOut),
            other => Err(format!("unknown harvest lot status '{}'", other)),
        }
    }
}

/// A physically harvested batch of product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarvestLot {
    pub id: Uuid,
    pub plot_id: Uuid,
    pub harvest_date: NaiveDate,
    /// Unique human-facing code (e.g. "LOT-2024-0001")
    pub lot_code: String,
    pub variety: Option<String>,
    pub caliber: Option<String>,
    pub gross_weight_kg: Decimal,
    pub net_weight_kg: Option<Decimal>,
    pub remaining_net_weight_kg: Option<Decimal>,
    /// net / gross * 100, set at classification
    pub yield_percent: Option<Decimal>,
    pub status: HarvestLotStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attributes fixed by classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub variety: String,
    pub caliber: String,
    pub net_weight_kg: Decimal,
}

/// Classification attributes of a lot that is ready to ship
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedView<'a> {
    pub variety: &'a str,
    pub caliber: &'a str,
    pub net_weight_kg: Decimal,
    pub remaining_net_weight_kg: Decimal,
}

/// Yield of a lot as a percentage of its gross weight
pub fn yield_percent(net_weight_kg: Decimal, gross_weight_kg: Decimal) -> Option<Decimal> {
    if gross_weight_kg <= Decimal::ZERO {
        return None;
    }
    Some(round_kg(net_weight_kg / gross_weight_kg * Decimal::ONE_HUNDRED))
}

impl HarvestLot {
    pub fn is_classified(&self) -> bool {
        self.status != HarvestLotStatus::PendingClassification
    }

    /// Classification attributes, or `IncompleteClassification` if any is unset
    pub fn classified(&self) -> DomainResult<ClassifiedView<'_>> {
        match (
            self.variety.as_deref(),
            self.caliber.as_deref(),
            self.net_weight_kg,
            self.remaining_net_weight_kg,
        ) {
            (Some(variety), Some(caliber), Some(net), Some(remaining)) => Ok(ClassifiedView {
                variety,
                caliber,
                net_weight_kg: net,
                remaining_net_weight_kg: remaining,
            }),
            _ => Err(DomainError::IncompleteClassification(self.lot_code.clone())),
        }
    }

    /// One-time classification: fixes variety, caliber and net weight and
    /// makes the lot shippable
    pub fn classify(&mut self, classification: Classification) -> DomainResult<()> {
        if self.is_classified() {
            return Err(DomainError::InvalidState(format!(
                "harvest lot {} is already classified",
                self.lot_code
            )));
        }

        let variety = require_text("variety", &classification.variety)?;
        let caliber = require_text("caliber", &classification.caliber)?;
        let net = normalize_positive_kg("net_weight_kg", classification.net_weight_kg)?;
        if net > self.gross_weight_kg {
            return Err(DomainError::invalid_input(
                "net_weight_kg",
                format!(
                    "net weight {} kg exceeds gross weight {} kg",
                    net, self.gross_weight_kg
                ),
            ));
        }

        self.variety = Some(variety);
        self.caliber = Some(caliber);
        self.net_weight_kg = Some(net);
        self.remaining_net_weight_kg = Some(net);
        self.yield_percent = yield_percent(net, self.gross_weight_kg);
        self.status = HarvestLotStatus::InStock;
        Ok(())
    }

    /// Ensure the lot can still have its pre-classification fields edited
    pub fn ensure_editable(&self) -> DomainResult<()> {
        if self.is_classified() {
            return Err(DomainError::InvalidState(format!(
                "harvest lot {} is classified; its weights and attributes are fixed",
                self.lot_code
            )));
        }
        Ok(())
    }

    /// Check that `quantity_kg` can be taken from this lot right now
    pub fn ensure_can_take(&self, quantity_kg: Decimal) -> DomainResult<()> {
        if self.status != HarvestLotStatus::InStock {
            return Err(DomainError::InvalidState(format!(
                "harvest lot {} is {}, expected IN_STOCK",
                self.lot_code, self.status
            )));
        }
        let view = self.classified()?;
        if quantity_kg > view.remaining_net_weight_kg {
            return Err(DomainError::InsufficientStock {
                resource: format!("harvest lot {}", self.lot_code),
                requested: quantity_kg,
                available: view.remaining_net_weight_kg,
            });
        }
        Ok(())
    }

    /// Take `quantity_kg` from the remaining weight, flipping to SOLD_OUT at zero
    ///
    /// Callers validate with [`HarvestLot::ensure_can_take`] first.
    pub fn take(&mut self, quantity_kg: Decimal) -> DomainResult<Decimal> {
        self.ensure_can_take(quantity_kg)?;
        let remaining = self.remaining_net_weight_kg.unwrap_or(Decimal::ZERO);
        let after = round_kg(remaining - quantity_kg);
        if after < Decimal::ZERO {
            return Err(DomainError::InsufficientStock {
                resource: format!("harvest lot {}", self.lot_code),
                requested: quantity_kg,
                available: remaining,
            });
        }
        self.remaining_net_weight_kg = Some(after);
        self.status = lot_status_for_remaining(after);
        Ok(after)
    }
}

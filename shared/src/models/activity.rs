//! Work activity models and the approval state machine

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::types::ActorRole;

/// Approval status of a work activity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    Pending,
    Approved,
    Rejected,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Pending => "PENDING",
            ActivityStatus::Approved => "APPROVED",
            ActivityStatus::Rejected => "REJECTED",
        }
    }

    /// Status a new activity starts in
    ///
    /// Workers always start at PENDING. Supervisors and admins may record an
    /// activity as APPROVED. Nobody may create one already REJECTED.
    pub fn initial(actor: ActorRole, requested: Option<ActivityStatus>) -> DomainResult<Self> {
        match requested {
            Some(ActivityStatus::Rejected) => Err(DomainError::InvalidState(
                "an activity cannot be created as REJECTED".to_string(),
            )),
            Some(status) if actor.can_approve() => Ok(status),
            _ => Ok(ActivityStatus::Pending),
        }
    }

    /// Input usage can only be replaced while the activity is pending
    pub fn allows_usage_changes(&self) -> bool {
        matches!(self, ActivityStatus::Pending)
    }

    /// Ledger action required when moving from `self` to `next`
    pub fn ledger_action(&self, next: ActivityStatus) -> LedgerAction {
        use ActivityStatus::*;
        match (self, next) {
            (Pending, Approved) | (Rejected, Approved) => LedgerAction::Debit,
            (Approved, Pending) | (Approved, Rejected) => LedgerAction::Credit,
            _ => LedgerAction::None,
        }
    }
}

impl std::fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ActivityStatus::Pending),
            "APPROVED" => Ok(ActivityStatus::Approved),
            "REJECTED" => Ok(ActivityStatus::Rejected),
            other => Err(format!("unknown activity status '{}'", other)),
        }
    }
}

/// What the stock ledger must do for a status transition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    Debit,
    Credit,
    None,
}

/// A work order that groups field activities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A recorded unit of field work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkActivity {
    pub id: Uuid,
    pub work_order_id: Uuid,
    pub description: String,
    pub activity_date: NaiveDate,
    pub status: ActivityStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quantity of one consumable input used by an activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputUsage {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub input_id: Uuid,
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Requested usage line, before it is stored
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UsageLine {
    pub input_id: Uuid,
    pub quantity: Decimal,
}

impl From<&InputUsage> for UsageLine {
    fn from(usage: &InputUsage) -> Self {
        Self {
            input_id: usage.input_id,
            quantity: usage.quantity,
        }
    }
}

/// Activity together with its usage lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityWithUsage {
    #[serde(flatten)]
    pub activity: WorkActivity,
    pub input_usage: Vec<InputUsage>,
}

//! Business-rule errors raised by the inventory and fulfillment core
//!
//! Every variant is final from the core's point of view: nothing here is
//! retried internally, the caller decides how to surface it.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the pure domain operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Activity {0} is no longer pending; its input usage cannot change")]
    ImmutableActivity(Uuid),

    #[error("Insufficient stock for {resource}: requested {requested}, available {available}")]
    InsufficientStock {
        resource: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Harvest lot {0} has not been classified")]
    IncompleteClassification(String),

    #[error("Variety mismatch: lot {lot_code} is {lot_variety}, line expects {line_variety}")]
    VarietyMismatch {
        lot_code: String,
        lot_variety: String,
        line_variety: String,
    },

    #[error("Caliber mismatch: lot {lot_code} is {lot_caliber}, line expects {line_caliber}")]
    CaliberMismatch {
        lot_code: String,
        lot_caliber: String,
        line_caliber: String,
    },

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },
}

impl DomainError {
    /// Shorthand for an [`DomainError::InvalidInput`] on a named field
    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        DomainError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::InvalidState(_) => "INVALID_STATE",
            DomainError::ImmutableActivity(_) => "IMMUTABLE_ACTIVITY",
            DomainError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            DomainError::IncompleteClassification(_) => "INCOMPLETE_CLASSIFICATION",
            DomainError::VarietyMismatch { .. } => "VARIETY_MISMATCH",
            DomainError::CaliberMismatch { .. } => "CALIBER_MISMATCH",
            DomainError::InvalidReference(_) => "INVALID_REFERENCE",
            DomainError::InvalidInput { .. } => "INVALID_INPUT",
        }
    }
}

/// Result alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

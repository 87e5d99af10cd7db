//! Validation and numeric helpers shared by the ledgers
//!
//! Weights and money are kept at two decimal places. Rounding is
//! midpoint-away-from-zero so that 0.005 kg becomes 0.01 kg.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

/// Number of decimal places kept for weights and money
pub const KG_SCALE: u32 = 2;

/// Round a weight (or amount) to two decimals
pub fn round_kg(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(KG_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

// ============================================================================
// Quantity Validations
// ============================================================================

/// Require a strictly positive quantity
pub fn validate_positive_quantity(field: &str, quantity: Decimal) -> DomainResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(DomainError::invalid_input(field, "must be greater than zero"));
    }
    Ok(())
}

/// Require a quantity that is zero or more
pub fn validate_non_negative(field: &str, quantity: Decimal) -> DomainResult<()> {
    if quantity < Decimal::ZERO {
        return Err(DomainError::invalid_input(field, "cannot be negative"));
    }
    Ok(())
}

/// Normalise a positive weight to two decimals
///
/// A value that rounds to zero (e.g. 0.001 kg) is rejected.
pub fn normalize_positive_kg(field: &str, quantity: Decimal) -> DomainResult<Decimal> {
    validate_positive_quantity(field, quantity)?;
    let rounded = round_kg(quantity);
    validate_positive_quantity(field, rounded)?;
    Ok(rounded)
}

// ============================================================================
// Text Validations
// ============================================================================

/// Require a non-blank value and return it trimmed
pub fn require_text(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_input(field, "cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Validate a harvest lot code (3-40 chars of A-Z, 0-9, '-' or '_')
pub fn validate_lot_code(code: &str) -> DomainResult<String> {
    let code = require_text("lot_code", code)?;
    if code.len() < 3 || code.len() > 40 {
        return Err(DomainError::invalid_input(
            "lot_code",
            "must be between 3 and 40 characters",
        ));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(DomainError::invalid_input(
            "lot_code",
            "may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(code.to_ascii_uppercase())
}

/// Case-insensitive comparison used for variety names
pub fn same_variety(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round_kg_midpoint_goes_up() {
        assert_eq!(round_kg(dec("0.005")), dec("0.01"));
        assert_eq!(round_kg(dec("12.345")), dec("12.35"));
        assert_eq!(round_kg(dec("12.344")), dec("12.34"));
    }

    #[test]
    fn test_round_kg_keeps_exact_values() {
        assert_eq!(round_kg(dec("600")), dec("600"));
        assert_eq!(round_kg(dec("0.10")), dec("0.1"));
    }

    #[test]
    fn test_validate_positive_quantity() {
        assert!(validate_positive_quantity("q", dec("0.01")).is_ok());
        assert!(validate_positive_quantity("q", Decimal::ZERO).is_err());
        assert!(validate_positive_quantity("q", dec("-1")).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("q", Decimal::ZERO).is_ok());
        assert!(validate_non_negative("q", dec("-0.01")).is_err());
    }

    #[test]
    fn test_normalize_positive_kg_rejects_values_rounding_to_zero() {
        assert_eq!(normalize_positive_kg("q", dec("1.234")).unwrap(), dec("1.23"));
        let err = normalize_positive_kg("q", dec("0.001")).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("variety", "  Nam Dok Mai ").unwrap(), "Nam Dok Mai");
        assert!(require_text("variety", "   ").is_err());
    }

    #[test]
    fn test_validate_lot_code() {
        assert_eq!(validate_lot_code("lot-2024-001").unwrap(), "LOT-2024-001");
        assert!(validate_lot_code("AB").is_err());
        assert!(validate_lot_code("LOT 1").is_err());
    }

    #[test]
    fn test_same_variety_ignores_case() {
        assert!(same_variety("Keitt", "KEITT"));
        assert!(same_variety("nam dok mai", "Nam Dok Mai"));
        assert!(!same_variety("Keitt", "Kent"));
    }
}

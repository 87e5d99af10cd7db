//! Harvest lot lifecycle tests
//!
//! Registration, one-time classification and the lot code rules.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    validate_lot_code, yield_percent, Classification, DomainError, HarvestLot, HarvestLotStatus,
};
use std::str::FromStr;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// A freshly registered lot, as the service inserts it
fn registered(gross: &str) -> HarvestLot {
    let now = Utc::now();
    HarvestLot {
        id: Uuid::new_v4(),
        plot_id: Uuid::new_v4(),
        harvest_date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        lot_code: "LOT-2024-0001".to_string(),
        variety: None,
        caliber: None,
        gross_weight_kg: dec(gross),
        net_weight_kg: None,
        remaining_net_weight_kg: None,
        yield_percent: None,
        status: HarvestLotStatus::PendingClassification,
        created_at: now,
        updated_at: now,
    }
}

fn classification(variety: &str, caliber: &str, net: &str) -> Classification {
    Classification {
        variety: variety.to_string(),
        caliber: caliber.to_string(),
        net_weight_kg: dec(net),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_classification_makes_lot_shippable() {
        let mut lot = registered("1250");
        lot.classify(classification("Keitt", "8", "1000")).unwrap();

        assert_eq!(lot.status, HarvestLotStatus::InStock);
        assert_eq!(lot.net_weight_kg, Some(dec("1000")));
        assert_eq!(lot.remaining_net_weight_kg, Some(dec("1000")));
        assert_eq!(lot.yield_percent, Some(dec("80")));
        assert!(lot.ensure_can_take(dec("1000")).is_ok());
    }

    #[test]
    fn test_classification_happens_once() {
        let mut lot = registered("1250");
        lot.classify(classification("Keitt", "8", "1000")).unwrap();

        let err = lot
            .classify(classification("Tommy Atkins", "10", "900"))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert_eq!(lot.variety.as_deref(), Some("Keitt"));
        assert_eq!(lot.net_weight_kg, Some(dec("1000")));
    }

    #[test]
    fn test_net_cannot_exceed_gross() {
        let mut lot = registered("900");
        let err = lot.classify(classification("Keitt", "8", "1000")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { .. }));
        assert_eq!(lot.status, HarvestLotStatus::PendingClassification);
    }

    #[test]
    fn test_net_must_be_positive() {
        let mut lot = registered("900");
        assert!(lot.classify(classification("Keitt", "8", "0")).is_err());
        assert!(lot.classify(classification("Keitt", "8", "0.001")).is_err());
    }

    #[test]
    fn test_blank_attributes_rejected() {
        let mut lot = registered("900");
        assert!(lot.classify(classification("  ", "8", "100")).is_err());
        assert!(lot.classify(classification("Keitt", "", "100")).is_err());
        assert!(!lot.is_classified());
    }

    #[test]
    fn test_attributes_are_trimmed() {
        let mut lot = registered("900");
        lot.classify(classification(" Keitt ", " 8 ", "100")).unwrap();
        assert_eq!(lot.variety.as_deref(), Some("Keitt"));
        assert_eq!(lot.caliber.as_deref(), Some("8"));
    }

    #[test]
    fn test_pending_lot_cannot_be_taken_from() {
        let lot = registered("900");
        assert!(matches!(
            lot.ensure_can_take(dec("1")).unwrap_err(),
            DomainError::InvalidState(_)
        ));
    }

    #[test]
    fn test_editing_locked_after_classification() {
        let mut lot = registered("900");
        assert!(lot.ensure_editable().is_ok());
        lot.classify(classification("Keitt", "8", "800")).unwrap();
        assert!(matches!(
            lot.ensure_editable().unwrap_err(),
            DomainError::InvalidState(_)
        ));
    }

    #[test]
    fn test_lot_code_rules() {
        assert_eq!(validate_lot_code(" lot-2024-01 ").unwrap(), "LOT-2024-01");
        assert!(validate_lot_code("ab").is_err());
        assert!(validate_lot_code("LOT 2024").is_err());
        assert!(validate_lot_code(&"A".repeat(41)).is_err());
    }

    #[test]
    fn test_yield_percent() {
        assert_eq!(yield_percent(dec("800"), dec("1000")), Some(dec("80")));
        assert_eq!(yield_percent(dec("1"), dec("3")), Some(dec("33.33")));
        assert_eq!(yield_percent(dec("1"), Decimal::ZERO), None);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Classification either succeeds with remaining == net <= gross,
        /// or leaves the lot untouched
        #[test]
        fn prop_classification_bounds(gross in 1i64..100000, net in 1i64..120000) {
            let mut lot = registered("1");
            lot.gross_weight_kg = Decimal::new(gross, 2);
            let before = lot.clone();

            let result = lot.classify(Classification {
                variety: "Keitt".to_string(),
                caliber: "8".to_string(),
                net_weight_kg: Decimal::new(net, 2),
            });

            if net <= gross {
                prop_assert!(result.is_ok());
                prop_assert_eq!(lot.remaining_net_weight_kg, lot.net_weight_kg);
                prop_assert!(lot.net_weight_kg.unwrap() <= lot.gross_weight_kg);
                let yield_pct = lot.yield_percent.unwrap();
                prop_assert!(yield_pct >= Decimal::ZERO && yield_pct <= Decimal::ONE_HUNDRED);
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(lot, before);
            }
        }
    }
}

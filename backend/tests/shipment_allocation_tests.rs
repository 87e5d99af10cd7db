//! Shipment allocation tests
//!
//! Runs shipment plans against in-memory snapshots of an order, its demand
//! lines and harvest lots, feeding each plan's results into the next
//! shipment exactly as the service persists them.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::allocation::{normalize_requests, plan_shipment, AllocationPlan, AllocationRequest};
use shared::status::detail_status;
use shared::{
    DetailStatus, DomainError, HarvestLot, HarvestLotStatus, SalesOrder, SalesOrderDetail,
    SalesOrderStatus,
};
use std::str::FromStr;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn order(status: SalesOrderStatus) -> SalesOrder {
    let now = Utc::now();
    SalesOrder {
        id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        order_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        status,
        total_amount: Decimal::ZERO,
        created_at: now,
        updated_at: now,
    }
}

fn line(order: &SalesOrder, variety: &str, caliber: &str, quantity_kg: &str) -> SalesOrderDetail {
    let now = Utc::now();
    SalesOrderDetail {
        id: Uuid::new_v4(),
        sales_order_id: order.id,
        variety: variety.to_string(),
        caliber: caliber.to_string(),
        quantity_kg: dec(quantity_kg),
        unit_price: dec("1.50"),
        quantity_shipped_kg: Decimal::ZERO,
        status: DetailStatus::Open,
        created_at: now,
        updated_at: now,
    }
}

fn lot(code: &str, variety: &str, caliber: &str, net: &str) -> HarvestLot {
    let now = Utc::now();
    HarvestLot {
        id: Uuid::new_v4(),
        plot_id: Uuid::new_v4(),
        harvest_date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        lot_code: code.to_string(),
        variety: Some(variety.to_string()),
        caliber: Some(caliber.to_string()),
        gross_weight_kg: dec(net) + dec("50"),
        net_weight_kg: Some(dec(net)),
        remaining_net_weight_kg: Some(dec(net)),
        yield_percent: None,
        status: HarvestLotStatus::InStock,
        created_at: now,
        updated_at: now,
    }
}

fn take(lot: &HarvestLot, detail: &SalesOrderDetail, quantity: &str) -> AllocationRequest {
    AllocationRequest {
        harvest_lot_id: lot.id,
        sales_order_detail_id: detail.id,
        quantity_taken_kg: dec(quantity),
    }
}

/// In-memory stand-in for the rows a shipment touches
struct Books {
    order: SalesOrder,
    details: Vec<SalesOrderDetail>,
    lots: Vec<HarvestLot>,
}

impl Books {
    fn ship(&mut self, requests: &[AllocationRequest]) -> Result<AllocationPlan, DomainError> {
        let requests = normalize_requests(requests)?;
        let plan = plan_shipment(
            &self.order,
            self.details.clone(),
            self.lots.clone(),
            &requests,
        )?;

        for updated in &plan.lots {
            if let Some(lot) = self.lots.iter_mut().find(|l| l.id == updated.id) {
                *lot = updated.clone();
            }
        }
        for updated in &plan.details {
            if let Some(detail) = self.details.iter_mut().find(|d| d.id == updated.id) {
                *detail = updated.clone();
            }
        }
        self.order.status = plan.order_status;
        Ok(plan)
    }

    fn lot(&self, id: Uuid) -> &HarvestLot {
        self.lots.iter().find(|l| l.id == id).unwrap()
    }

    fn detail(&self, id: Uuid) -> &SalesOrderDetail {
        self.details.iter().find(|d| d.id == id).unwrap()
    }
}

fn books(details: Vec<SalesOrderDetail>, lots: Vec<HarvestLot>, o: SalesOrder) -> Books {
    Books {
        order: o,
        details,
        lots,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Partial then complete fill of a single line
    #[test]
    fn test_partial_then_full_fill() {
        let o = order(SalesOrderStatus::Approved);
        let d = line(&o, "Keitt", "8", "500");
        let l = lot("LOT-A", "Keitt", "8", "1000");
        let (lot_id, detail_id) = (l.id, d.id);
        let mut b = books(vec![d.clone()], vec![l.clone()], o);

        b.ship(&[take(&l, &d, "400")]).unwrap();
        assert_eq!(b.lot(lot_id).remaining_net_weight_kg, Some(dec("600")));
        assert_eq!(b.lot(lot_id).status, HarvestLotStatus::InStock);
        assert_eq!(b.detail(detail_id).quantity_shipped_kg, dec("400"));
        assert_eq!(b.detail(detail_id).status, DetailStatus::PartiallyFilled);
        assert_eq!(b.order.status, SalesOrderStatus::PartiallyShipped);

        b.ship(&[take(&l, &d, "100")]).unwrap();
        assert_eq!(b.lot(lot_id).remaining_net_weight_kg, Some(dec("500")));
        assert_eq!(b.detail(detail_id).status, DetailStatus::Filled);
        assert_eq!(b.order.status, SalesOrderStatus::Filled);
    }

    /// The order only fills once every line is filled
    #[test]
    fn test_order_waits_for_every_line() {
        let o = order(SalesOrderStatus::Approved);
        let keitt = line(&o, "Keitt", "8", "100");
        let tommy = line(&o, "Tommy Atkins", "10", "100");
        let l1 = lot("LOT-K", "Keitt", "8", "500");
        let l2 = lot("LOT-T", "Tommy Atkins", "10", "500");
        let mut b = books(vec![keitt.clone(), tommy.clone()], vec![l1.clone(), l2.clone()], o);

        b.ship(&[take(&l1, &keitt, "100")]).unwrap();
        assert_eq!(b.order.status, SalesOrderStatus::PartiallyShipped);

        b.ship(&[take(&l2, &tommy, "100")]).unwrap();
        assert_eq!(b.order.status, SalesOrderStatus::Filled);
    }

    #[test]
    fn test_overdraw_lot_is_rejected_without_changes() {
        let o = order(SalesOrderStatus::Approved);
        let d = line(&o, "Keitt", "8", "500");
        let l = lot("LOT-A", "Keitt", "8", "100");
        let mut b = books(vec![d.clone()], vec![l.clone()], o);

        let err = b.ship(&[take(&l, &d, "150")]).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(b.lot(l.id), &l);
        assert_eq!(b.detail(d.id), &d);
        assert_eq!(b.order.status, SalesOrderStatus::Approved);
    }

    #[test]
    fn test_taking_everything_sells_out_lot() {
        let o = order(SalesOrderStatus::Approved);
        let d = line(&o, "Keitt", "8", "500");
        let l = lot("LOT-A", "Keitt", "8", "123.45");
        let mut b = books(vec![d.clone()], vec![l.clone()], o);

        b.ship(&[take(&l, &d, "123.45")]).unwrap();
        assert_eq!(b.lot(l.id).remaining_net_weight_kg, Some(Decimal::ZERO));
        assert_eq!(b.lot(l.id).status, HarvestLotStatus::SoldOut);

        let err = b.ship(&[take(&l, &d, "1")]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    /// Two shipments each wanting 60% of a lot: the second one fails
    #[test]
    fn test_second_competing_shipment_fails() {
        let o = order(SalesOrderStatus::Approved);
        let first = line(&o, "Keitt", "8", "100");
        let second = line(&o, "Keitt", "8", "100");
        let l = lot("LOT-A", "Keitt", "8", "100");
        let mut b = books(vec![first.clone(), second.clone()], vec![l.clone()], o);

        b.ship(&[take(&l, &first, "60")]).unwrap();
        let err = b.ship(&[take(&l, &second, "60")]).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(b.lot(l.id).remaining_net_weight_kg, Some(dec("40")));
        assert_eq!(b.detail(second.id).quantity_shipped_kg, Decimal::ZERO);
    }

    /// Requests in one shipment see the effect of earlier requests
    #[test]
    fn test_requests_within_shipment_accumulate() {
        let o = order(SalesOrderStatus::Approved);
        let a = line(&o, "Keitt", "8", "100");
        let c = line(&o, "Keitt", "8", "100");
        let l = lot("LOT-A", "Keitt", "8", "100");
        let mut b = books(vec![a.clone(), c.clone()], vec![l.clone()], o);

        let err = b
            .ship(&[take(&l, &a, "60"), take(&l, &c, "60")])
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(b.lot(l.id).remaining_net_weight_kg, Some(dec("100")));
        assert_eq!(b.detail(a.id).quantity_shipped_kg, Decimal::ZERO);
    }

    /// One shipment can draw a line from several lots
    #[test]
    fn test_line_filled_from_two_lots() {
        let o = order(SalesOrderStatus::Approved);
        let d = line(&o, "Keitt", "8", "150");
        let l1 = lot("LOT-1", "Keitt", "8", "100");
        let l2 = lot("LOT-2", "Keitt", "8", "100");
        let mut b = books(vec![d.clone()], vec![l1.clone(), l2.clone()], o);

        let plan = b.ship(&[take(&l1, &d, "100"), take(&l2, &d, "50")]).unwrap();
        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.total_quantity_kg(), dec("150"));
        assert_eq!(b.lot(l1.id).status, HarvestLotStatus::SoldOut);
        assert_eq!(b.lot(l2.id).remaining_net_weight_kg, Some(dec("50")));
        assert_eq!(b.detail(d.id).status, DetailStatus::Filled);
        assert_eq!(b.order.status, SalesOrderStatus::Filled);
    }

    #[test]
    fn test_line_cannot_be_overshipped() {
        let o = order(SalesOrderStatus::Approved);
        let d = line(&o, "Keitt", "8", "100");
        let l = lot("LOT-A", "Keitt", "8", "1000");
        let mut b = books(vec![d.clone()], vec![l.clone()], o);

        let err = b.ship(&[take(&l, &d, "150")]).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
    }

    #[test]
    fn test_variety_mismatch() {
        let o = order(SalesOrderStatus::Approved);
        let d = line(&o, "Keitt", "8", "100");
        let l = lot("LOT-A", "Tommy Atkins", "8", "1000");
        let mut b = books(vec![d.clone()], vec![l.clone()], o);

        let err = b.ship(&[take(&l, &d, "10")]).unwrap_err();
        assert!(matches!(err, DomainError::VarietyMismatch { .. }));
    }

    #[test]
    fn test_variety_match_ignores_case() {
        let o = order(SalesOrderStatus::Approved);
        let d = line(&o, "keitt", "8", "100");
        let l = lot("LOT-A", "Keitt", "8", "1000");
        let mut b = books(vec![d.clone()], vec![l.clone()], o);

        assert!(b.ship(&[take(&l, &d, "10")]).is_ok());
    }

    #[test]
    fn test_caliber_mismatch() {
        let o = order(SalesOrderStatus::Approved);
        let d = line(&o, "Keitt", "8", "100");
        let l = lot("LOT-A", "Keitt", "10", "1000");
        let mut b = books(vec![d.clone()], vec![l.clone()], o);

        let err = b.ship(&[take(&l, &d, "10")]).unwrap_err();
        assert!(matches!(err, DomainError::CaliberMismatch { .. }));
    }

    #[test]
    fn test_unclassified_lot_cannot_ship() {
        let o = order(SalesOrderStatus::Approved);
        let d = line(&o, "Keitt", "8", "100");
        let mut l = lot("LOT-A", "Keitt", "8", "1000");
        l.status = HarvestLotStatus::PendingClassification;
        let mut b = books(vec![d.clone()], vec![l.clone()], o);

        let err = b.ship(&[take(&l, &d, "10")]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn test_in_stock_lot_missing_attributes_is_incomplete() {
        let o = order(SalesOrderStatus::Approved);
        let d = line(&o, "Keitt", "8", "100");
        let mut l = lot("LOT-A", "Keitt", "8", "1000");
        l.caliber = None;
        let mut b = books(vec![d.clone()], vec![l.clone()], o);

        let err = b.ship(&[take(&l, &d, "10")]).unwrap_err();
        assert!(matches!(err, DomainError::IncompleteClassification(_)));
    }

    #[test]
    fn test_pending_order_cannot_ship() {
        let o = order(SalesOrderStatus::Pending);
        let d = line(&o, "Keitt", "8", "100");
        let l = lot("LOT-A", "Keitt", "8", "1000");
        let mut b = books(vec![d.clone()], vec![l.clone()], o);

        let err = b.ship(&[take(&l, &d, "10")]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn test_line_from_other_order_is_invalid_reference() {
        let o = order(SalesOrderStatus::Approved);
        let other = order(SalesOrderStatus::Approved);
        let own = line(&o, "Keitt", "8", "100");
        let foreign = line(&other, "Keitt", "8", "100");
        let l = lot("LOT-A", "Keitt", "8", "1000");
        let mut b = books(vec![own], vec![l.clone()], o);

        let err = b.ship(&[take(&l, &foreign, "10")]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidReference(_)));
    }

    #[test]
    fn test_unknown_lot_is_not_found() {
        let o = order(SalesOrderStatus::Approved);
        let d = line(&o, "Keitt", "8", "100");
        let missing = lot("LOT-X", "Keitt", "8", "1000");
        let mut b = books(vec![d.clone()], vec![], o);

        let err = b.ship(&[take(&missing, &d, "10")]).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn test_empty_shipment_is_invalid_input() {
        let o = order(SalesOrderStatus::Approved);
        let mut b = books(vec![], vec![], o);

        let err = b.ship(&[]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { .. }));
    }

    /// Quantities are kept at two decimals
    #[test]
    fn test_quantities_are_normalised() {
        let o = order(SalesOrderStatus::Approved);
        let d = line(&o, "Keitt", "8", "100");
        let l = lot("LOT-A", "Keitt", "8", "100");
        let mut b = books(vec![d.clone()], vec![l.clone()], o);

        let plan = b.ship(&[take(&l, &d, "33.335")]).unwrap();
        assert_eq!(plan.allocations[0].quantity_taken_kg, dec("33.34"));
        assert_eq!(b.lot(l.id).remaining_net_weight_kg, Some(dec("66.66")));
        assert_eq!(b.detail(d.id).quantity_shipped_kg, dec("33.34"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// 0.01 to 300.00 kg
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=30000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// After any sequence of shipments, each lot's net minus remaining
        /// equals the sum taken from it, each line's shipped quantity equals
        /// the sum allocated to it, and no line ships more than ordered
        #[test]
        fn prop_ledgers_stay_consistent(
            shipments in prop::collection::vec(
                prop::collection::vec((0usize..2, 0usize..2, quantity_strategy()), 1..4),
                1..8
            )
        ) {
            let o = order(SalesOrderStatus::Approved);
            let details = vec![line(&o, "Keitt", "8", "400"), line(&o, "Keitt", "8", "250.50")];
            let lots = vec![lot("LOT-1", "Keitt", "8", "300"), lot("LOT-2", "Keitt", "8", "500")];
            let mut b = books(details.clone(), lots.clone(), o);
            let mut taken = [Decimal::ZERO; 2];
            let mut shipped = [Decimal::ZERO; 2];

            for shipment in shipments {
                let requests: Vec<AllocationRequest> = shipment
                    .iter()
                    .map(|(li, di, qty)| AllocationRequest {
                        harvest_lot_id: lots[*li].id,
                        sales_order_detail_id: details[*di].id,
                        quantity_taken_kg: *qty,
                    })
                    .collect();

                if let Ok(plan) = b.ship(&requests) {
                    for allocation in &plan.allocations {
                        let index = lots.iter().position(|l| l.id == allocation.harvest_lot_id).unwrap();
                        taken[index] += allocation.quantity_taken_kg;
                        let index = details
                            .iter()
                            .position(|d| d.id == allocation.sales_order_detail_id)
                            .unwrap();
                        shipped[index] += allocation.quantity_taken_kg;
                    }
                }

                for (index, original) in lots.iter().enumerate() {
                    let current = b.lot(original.id);
                    let net = current.net_weight_kg.unwrap();
                    let remaining = current.remaining_net_weight_kg.unwrap();
                    prop_assert!(remaining >= Decimal::ZERO);
                    prop_assert_eq!(net - remaining, taken[index]);
                    prop_assert_eq!(
                        current.status == HarvestLotStatus::SoldOut,
                        remaining == Decimal::ZERO
                    );
                }

                for (index, original) in details.iter().enumerate() {
                    let detail = b.detail(original.id);
                    prop_assert!(detail.quantity_shipped_kg <= detail.quantity_kg);
                    prop_assert!(detail.quantity_shipped_kg >= Decimal::ZERO);
                    prop_assert_eq!(detail.quantity_shipped_kg, shipped[index]);
                    prop_assert_eq!(
                        detail.status,
                        detail_status(detail.quantity_kg, detail.quantity_shipped_kg)
                    );
                }

                let all_filled = b.details.iter().all(|d| d.status == DetailStatus::Filled);
                prop_assert_eq!(b.order.status == SalesOrderStatus::Filled, all_filled);
            }
        }
    }
}

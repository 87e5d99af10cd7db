//! Shipment allocation planning
//!
//! Given a sales order, its demand lines and the harvest lots referenced by a
//! shipment request, work out every allocation record and the resulting lot,
//! line and order state. Requests are processed strictly in the order
//! supplied; no attempt is made to rearrange them. The first failing request
//! fails the whole plan and nothing is returned for the caller to persist.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::{HarvestLot, SalesOrder, SalesOrderDetail, SalesOrderStatus};
use crate::status::{detail_status, order_status};
use crate::validation::{normalize_positive_kg, round_kg, same_variety};

/// A request to take a quantity of one lot for one demand line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AllocationRequest {
    pub harvest_lot_id: Uuid,
    pub sales_order_detail_id: Uuid,
    pub quantity_taken_kg: Decimal,
}

/// Outcome of a successful allocation run
#[derive(Debug, Clone)]
pub struct AllocationPlan {
    /// Allocation records to create, in request order
    pub allocations: Vec<AllocationRequest>,
    /// Lots whose remaining weight changed
    pub lots: Vec<HarvestLot>,
    /// Demand lines whose shipped quantity changed
    pub details: Vec<SalesOrderDetail>,
    /// Order status recomputed from every line of the order
    pub order_status: SalesOrderStatus,
}

impl AllocationPlan {
    pub fn total_quantity_kg(&self) -> Decimal {
        self.allocations.iter().map(|a| a.quantity_taken_kg).sum()
    }
}

/// Reject empty requests and non-positive quantities, normalising weights
/// to two decimals
pub fn normalize_requests(requests: &[AllocationRequest]) -> DomainResult<Vec<AllocationRequest>> {
    if requests.is_empty() {
        return Err(DomainError::invalid_input(
            "lot_details",
            "at least one lot allocation is required",
        ));
    }

    requests
        .iter()
        .enumerate()
        .map(|(index, request)| {
            let field = format!("lot_details[{}].quantity_taken_kg", index);
            Ok(AllocationRequest {
                quantity_taken_kg: normalize_positive_kg(&field, request.quantity_taken_kg)?,
                ..*request
            })
        })
        .collect()
}

/// Shipments are only recorded against approved or partially shipped orders
pub fn ensure_order_shippable(order: &SalesOrder) -> DomainResult<()> {
    if !order.status.accepts_shipments() {
        return Err(DomainError::InvalidState(format!(
            "sales order {} is {}; shipments need APPROVED or PARTIALLY_SHIPPED",
            order.id, order.status
        )));
    }
    Ok(())
}

/// Every requested demand line must belong to the order being shipped
pub fn ensure_details_belong(
    order: &SalesOrder,
    details: &[SalesOrderDetail],
    requests: &[AllocationRequest],
) -> DomainResult<()> {
    for request in requests {
        let belongs = details
            .iter()
            .any(|d| d.id == request.sales_order_detail_id && d.sales_order_id == order.id);
        if !belongs {
            return Err(DomainError::InvalidReference(format!(
                "demand line {} is not part of sales order {}",
                request.sales_order_detail_id, order.id
            )));
        }
    }
    Ok(())
}

/// Distinct lot ids referenced by the requests, ascending
///
/// Lots are locked in this order so concurrent shipments cannot deadlock.
pub fn lot_lock_order(requests: &[AllocationRequest]) -> Vec<Uuid> {
    requests
        .iter()
        .map(|r| r.harvest_lot_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Check that a lot's classification matches a demand line
fn ensure_compatible(lot: &HarvestLot, detail: &SalesOrderDetail) -> DomainResult<()> {
    let view = lot.classified()?;
    if !same_variety(view.variety, &detail.variety) {
        return Err(DomainError::VarietyMismatch {
            lot_code: lot.lot_code.clone(),
            lot_variety: view.variety.to_string(),
            line_variety: detail.variety.clone(),
        });
    }
    if view.caliber.trim() != detail.caliber.trim() {
        return Err(DomainError::CaliberMismatch {
            lot_code: lot.lot_code.clone(),
            lot_caliber: view.caliber.to_string(),
            line_caliber: detail.caliber.clone(),
        });
    }
    Ok(())
}

/// Plan a shipment against locked snapshots of the order, its lines and the
/// referenced lots
///
/// `requests` must already be normalised with [`normalize_requests`].
pub fn plan_shipment(
    order: &SalesOrder,
    details: Vec<SalesOrderDetail>,
    lots: Vec<HarvestLot>,
    requests: &[AllocationRequest],
) -> DomainResult<AllocationPlan> {
    ensure_order_shippable(order)?;
    ensure_details_belong(order, &details, requests)?;

    let mut details = details;
    let mut lots: BTreeMap<Uuid, HarvestLot> = lots.into_iter().map(|l| (l.id, l)).collect();
    let mut touched_lots = BTreeSet::new();
    let mut touched_details = BTreeSet::new();

    for request in requests {
        let qty = request.quantity_taken_kg;

        let lot = lots
            .get_mut(&request.harvest_lot_id)
            .ok_or_else(|| DomainError::NotFound(format!("Harvest lot {}", request.harvest_lot_id)))?;
        lot.ensure_can_take(qty)?;

        let detail = details
            .iter_mut()
            .find(|d| d.id == request.sales_order_detail_id)
            .ok_or_else(|| {
                DomainError::InvalidReference(format!(
                    "demand line {} is not part of sales order {}",
                    request.sales_order_detail_id, order.id
                ))
            })?;
        ensure_compatible(lot, detail)?;

        let outstanding = detail.outstanding_kg();
        if qty > outstanding {
            return Err(DomainError::InsufficientStock {
                resource: format!("demand line {}", detail.id),
                requested: qty,
                available: outstanding,
            });
        }

        lot.take(qty)?;
        detail.quantity_shipped_kg = round_kg(detail.quantity_shipped_kg + qty);
        detail.status = detail_status(detail.quantity_kg, detail.quantity_shipped_kg);

        touched_lots.insert(lot.id);
        touched_details.insert(detail.id);
    }

    let order_status = order_status(order.status, &details);

    Ok(AllocationPlan {
        allocations: requests.to_vec(),
        lots: lots
            .into_values()
            .filter(|l| touched_lots.contains(&l.id))
            .collect(),
        details: details
            .into_iter()
            .filter(|d| touched_details.contains(&d.id))
            .collect(),
        order_status,
    })
}

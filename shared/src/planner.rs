//! Batch mutation planning for sell, restock and delete actions
//!
//! Stock is one record per unit, so every user action becomes a set of
//! independent writes: removals of existing unit records, appends of new unit
//! records, appends of ledger entries. The plan carries no ordering between
//! its writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{SaleRecord, SkuSummary, StockUnit};
use crate::types::{SkuKey, MANUAL_BARCODE};

/// User action on a SKU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchAction {
    Sell,
    Restock,
    Delete,
}

impl BatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchAction::Sell => "sell",
            BatchAction::Restock => "restock",
            BatchAction::Delete => "delete",
        }
    }

    /// Whether the action consumes existing units
    pub fn consumes_stock(&self) -> bool {
        matches!(self, BatchAction::Sell | BatchAction::Delete)
    }
}

impl std::str::FromStr for BatchAction {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sell" => Ok(BatchAction::Sell),
            "restock" => Ok(BatchAction::Restock),
            "delete" => Ok(BatchAction::Delete),
            _ => Err(PlanError::UnknownAction(s.to_string())),
        }
    }
}

/// Why a plan could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("quantity must be positive")]
    NonPositiveQuantity,

    #[error("quantity is too large")]
    QuantityTooLarge,

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    #[error("unknown action: {0}")]
    UnknownAction(String),
}

/// One write of a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteOp {
    RemoveStock { id: String },
    AppendStock { unit: StockUnit },
    AppendSale { sale: SaleRecord },
}

/// The writes produced for one user action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPlan {
    pub action: BatchAction,
    pub sku: SkuKey,
    pub quantity: u32,
    pub ops: Vec<WriteOp>,
}

impl BatchPlan {
    /// Identifiers of the unit records the plan removes
    pub fn removed_ids(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            WriteOp::RemoveStock { id } => Some(id.as_str()),
            _ => None,
        })
    }

    /// Ledger entries the plan appends
    pub fn sales(&self) -> impl Iterator<Item = &SaleRecord> {
        self.ops.iter().filter_map(|op| match op {
            WriteOp::AppendSale { sale } => Some(sale),
            _ => None,
        })
    }

    /// Unit records the plan creates
    pub fn new_units(&self) -> impl Iterator<Item = &StockUnit> {
        self.ops.iter().filter_map(|op| match op {
            WriteOp::AppendStock { unit } => Some(unit),
            _ => None,
        })
    }
}

/// Parse a quantity typed by the user
pub fn parse_quantity(input: &str) -> Result<u32, PlanError> {
    let value: i64 = input
        .trim()
        .parse()
        .map_err(|_| PlanError::NonPositiveQuantity)?;
    if value <= 0 {
        return Err(PlanError::NonPositiveQuantity);
    }
    u32::try_from(value).map_err(|_| PlanError::QuantityTooLarge)
}

/// Build the write plan for `quantity` units of `summary`.
///
/// Sell and delete consume the first `quantity` identifiers of the summary's
/// unit list. All records appended by one plan share the `now` timestamp.
pub fn plan_batch(
    action: BatchAction,
    quantity: u32,
    summary: &SkuSummary,
    now: DateTime<Utc>,
) -> Result<BatchPlan, PlanError> {
    if quantity == 0 {
        return Err(PlanError::NonPositiveQuantity);
    }

    let available = summary.unit_ids.len();
    if action.consumes_stock() && quantity as usize > available {
        return Err(PlanError::InsufficientStock {
            requested: quantity,
            available: available as u32,
        });
    }

    let count = quantity as usize;
    let mut ops = Vec::with_capacity(if action == BatchAction::Sell { count * 2 } else { count });

    match action {
        BatchAction::Delete => {
            ops.extend(removals(summary, count));
        }
        BatchAction::Sell => {
            ops.extend(removals(summary, count));
            ops.extend((0..count).map(|_| WriteOp::AppendSale {
                sale: sale_snapshot(summary, now),
            }));
        }
        BatchAction::Restock => {
            ops.extend((0..count).map(|_| WriteOp::AppendStock {
                unit: unit_snapshot(summary, now),
            }));
        }
    }

    Ok(BatchPlan {
        action,
        sku: summary.key(),
        quantity,
        ops,
    })
}

fn removals(summary: &SkuSummary, count: usize) -> impl Iterator<Item = WriteOp> + '_ {
    summary
        .unit_ids
        .iter()
        .take(count)
        .map(|id| WriteOp::RemoveStock { id: id.clone() })
}

fn sale_snapshot(summary: &SkuSummary, now: DateTime<Utc>) -> SaleRecord {
    SaleRecord {
        id: String::new(),
        product_name: summary.product_name.clone(),
        brand_name: summary.brand_name.clone(),
        unit_price: summary.unit_price,
        barcode: summary
            .barcode
            .clone()
            .unwrap_or_else(|| MANUAL_BARCODE.to_string()),
        sold_at: Some(now),
    }
}

fn unit_snapshot(summary: &SkuSummary, now: DateTime<Utc>) -> StockUnit {
    StockUnit {
        id: String::new(),
        product_name: summary.product_name.clone(),
        brand_name: summary.brand_name.clone(),
        unit_price: summary.unit_price,
        barcode: summary.barcode.clone(),
        intake_at: Some(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn cola(stock: u32) -> SkuSummary {
        let mut summary = SkuSummary::empty(&SkuKey::new("Cola", "BrandX"), Decimal::ONE, 10);
        summary.current_stock_count = stock;
        summary.unit_ids = (0..stock).map(|i| format!("unit-{}", i)).collect();
        summary.barcode = Some("7750001".to_string());
        summary.refresh_derived();
        summary
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("3"), Ok(3));
        assert_eq!(parse_quantity(" 12 "), Ok(12));
        assert_eq!(parse_quantity("0"), Err(PlanError::NonPositiveQuantity));
        assert_eq!(parse_quantity("-2"), Err(PlanError::NonPositiveQuantity));
        assert_eq!(parse_quantity("dos"), Err(PlanError::NonPositiveQuantity));
        assert_eq!(parse_quantity(""), Err(PlanError::NonPositiveQuantity));
        assert_eq!(parse_quantity("99999999999"), Err(PlanError::QuantityTooLarge));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(PlanError::NonPositiveQuantity.to_string(), "quantity must be positive");
        let err = PlanError::InsufficientStock { requested: 4, available: 3 };
        assert!(err.to_string().starts_with("insufficient stock"));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_sell_plan_takes_first_ids_and_appends_sales() {
        let plan = plan_batch(BatchAction::Sell, 2, &cola(3), now()).unwrap();

        assert_eq!(plan.quantity, 2);
        assert_eq!(plan.removed_ids().collect::<Vec<_>>(), vec!["unit-0", "unit-1"]);

        let sales: Vec<&SaleRecord> = plan.sales().collect();
        assert_eq!(sales.len(), 2);
        assert!(sales.iter().all(|s| s.sold_at == Some(now())));
        assert!(sales.iter().all(|s| s.unit_price == Decimal::ONE));
        assert!(sales.iter().all(|s| s.barcode == "7750001"));
        assert_eq!(plan.new_units().count(), 0);
    }

    #[test]
    fn test_sale_without_barcode_is_manual() {
        let mut summary = cola(1);
        summary.barcode = None;
        let plan = plan_batch(BatchAction::Sell, 1, &summary, now()).unwrap();
        assert_eq!(plan.sales().next().unwrap().barcode, MANUAL_BARCODE);
    }

    #[test]
    fn test_delete_plan_only_removes() {
        let plan = plan_batch(BatchAction::Delete, 3, &cola(3), now()).unwrap();
        assert_eq!(plan.removed_ids().count(), 3);
        assert_eq!(plan.sales().count(), 0);
        assert_eq!(plan.ops.len(), 3);
    }

    #[test]
    fn test_exact_stock_succeeds_and_one_more_fails() {
        assert!(plan_batch(BatchAction::Sell, 3, &cola(3), now()).is_ok());
        assert_eq!(
            plan_batch(BatchAction::Sell, 4, &cola(3), now()),
            Err(PlanError::InsufficientStock { requested: 4, available: 3 })
        );
        assert_eq!(
            plan_batch(BatchAction::Delete, 4, &cola(3), now()),
            Err(PlanError::InsufficientStock { requested: 4, available: 3 })
        );
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert_eq!(
            plan_batch(BatchAction::Restock, 0, &cola(0), now()),
            Err(PlanError::NonPositiveQuantity)
        );
    }

    #[test]
    fn test_restock_has_no_upper_bound() {
        let plan = plan_batch(BatchAction::Restock, 25, &cola(0), now()).unwrap();
        let units: Vec<&StockUnit> = plan.new_units().collect();
        assert_eq!(units.len(), 25);
        assert!(units.iter().all(|u| u.intake_at == Some(now())));
        assert!(units.iter().all(|u| u.barcode.as_deref() == Some("7750001")));
        assert!(units.iter().all(|u| u.id.is_empty()));
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("SELL".parse::<BatchAction>(), Ok(BatchAction::Sell));
        assert_eq!("restock".parse::<BatchAction>(), Ok(BatchAction::Restock));
        assert!("refund".parse::<BatchAction>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A sell of Q removes Q units and books Q × price in sales
        #[test]
        fn prop_sell_conserves_units(stock in 1u32..60, pick in 1u32..60, cents in 1i64..10_000) {
            let mut summary = cola(stock);
            summary.unit_price = Decimal::new(cents, 2);
            let quantity = pick.min(stock);

            let plan = plan_batch(BatchAction::Sell, quantity, &summary, now()).unwrap();
            let removed: Vec<&str> = plan.removed_ids().collect();
            let booked: Decimal = plan.sales().map(|s| s.unit_price).sum();

            prop_assert_eq!(removed.len() as u32, quantity);
            prop_assert_eq!(plan.sales().count() as u32, quantity);
            prop_assert_eq!(booked, Decimal::from(quantity) * summary.unit_price);

            let mut unique = removed.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), removed.len());
        }
    }
}

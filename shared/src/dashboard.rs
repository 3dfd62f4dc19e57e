//! Home screen view: headline metrics, recent sales, best sellers and the
//! restock worklist, all derived from the three live collections.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::aggregation::{aggregate, total_stock_value, SummaryMap};
use crate::history::period_total;
use crate::models::{CatalogEntry, SaleRecord, SkuSummary, StockUnit};
use crate::restock::{restock_worklist, RestockItem};
use crate::types::AggregateOptions;

/// Length of the "recent sales" and "top sellers" lists
pub const DASHBOARD_LIST_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    /// Distinct registered product names, case-insensitive
    pub total_categories: usize,
    pub total_stock: usize,
    pub total_sales: usize,
    pub stock_value: Decimal,
    pub sales_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub metrics: DashboardMetrics,
    pub recent_sales: Vec<SaleRecord>,
    pub top_sellers: Vec<SkuSummary>,
    pub restock: Vec<RestockItem>,
}

/// Build the view. `ledger` is expected most recent first.
pub fn build_dashboard(
    catalog: &[CatalogEntry],
    stock: &[StockUnit],
    ledger: &[SaleRecord],
    options: &AggregateOptions,
) -> DashboardView {
    let summaries = aggregate(catalog, stock, ledger, options);
    DashboardView::from_summaries(&summaries, catalog, stock, ledger)
}

impl DashboardView {
    pub fn from_summaries(
        summaries: &SummaryMap,
        catalog: &[CatalogEntry],
        stock: &[StockUnit],
        ledger: &[SaleRecord],
    ) -> Self {
        let metrics = DashboardMetrics {
            total_categories: count_categories(catalog),
            total_stock: stock.len(),
            total_sales: ledger.len(),
            stock_value: total_stock_value(summaries).round_dp(2),
            sales_value: period_total(ledger).round_dp(2),
        };

        let mut top_sellers: Vec<SkuSummary> = summaries.values().cloned().collect();
        top_sellers.sort_by(|a, b| b.units_sold_count.cmp(&a.units_sold_count));
        top_sellers.truncate(DASHBOARD_LIST_LEN);

        Self {
            metrics,
            recent_sales: ledger.iter().take(DASHBOARD_LIST_LEN).cloned().collect(),
            top_sellers,
            restock: restock_worklist(summaries.values()),
        }
    }
}

fn count_categories(catalog: &[CatalogEntry]) -> usize {
    catalog
        .iter()
        .map(|entry| entry.product_name.trim().to_lowercase())
        .collect::<HashSet<_>>()
        .len()
}

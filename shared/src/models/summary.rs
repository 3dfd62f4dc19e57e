//! Derived per-SKU inventory summaries

use rust_decimal::Decimal;
use serde::Serialize;

use super::CatalogEntry;
use crate::types::{AggregateOptions, SkuKey, DEFAULT_CATEGORY};

/// Stock and sales figures for one product/brand line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuSummary {
    pub product_name: String,
    pub brand_name: String,
    pub category: String,
    pub barcode: Option<String>,
    pub unit_price: Decimal,
    pub current_stock_count: u32,
    pub units_sold_count: u32,
    pub max_slots: u32,
    pub stock_value: Decimal,
    pub revenue_value: Decimal,
    /// `None` when the SKU has no capacity to measure against
    pub occupancy_percent: Option<Decimal>,
    /// Identifiers of the stock units counted, in discovery order
    pub unit_ids: Vec<String>,
}

impl SkuSummary {
    /// Empty summary for a key; counts start at zero
    pub fn empty(key: &SkuKey, unit_price: Decimal, max_slots: u32) -> Self {
        Self {
            product_name: key.product_name.clone(),
            brand_name: key.brand_name.clone(),
            category: DEFAULT_CATEGORY.to_string(),
            barcode: None,
            unit_price,
            current_stock_count: 0,
            units_sold_count: 0,
            max_slots,
            stock_value: Decimal::ZERO,
            revenue_value: Decimal::ZERO,
            occupancy_percent: None,
            unit_ids: Vec::new(),
        }
    }

    /// Zero-stock summary for a catalog entry, used to restock depleted SKUs
    pub fn from_catalog(entry: &CatalogEntry, options: &AggregateOptions) -> Self {
        let mut summary = Self::empty(
            &entry.key(),
            entry.reference_price.unwrap_or(Decimal::ZERO),
            entry.max_slots.unwrap_or(options.default_max_slots),
        );
        if !entry.category.is_empty() {
            summary.category = entry.category.clone();
        }
        if !entry.code.is_empty() {
            summary.barcode = Some(entry.code.clone());
        }
        summary.refresh_derived();
        summary
    }

    pub fn key(&self) -> SkuKey {
        SkuKey::new(&self.product_name, &self.brand_name)
    }

    /// Recompute the monetary values and occupancy from the counts
    pub fn refresh_derived(&mut self) {
        self.stock_value = Decimal::from(self.current_stock_count) * self.unit_price;
        self.revenue_value = Decimal::from(self.units_sold_count) * self.unit_price;
        self.occupancy_percent = occupancy_percent(self.current_stock_count, self.max_slots);
    }
}

/// current / max × 100, undefined for zero capacity
pub fn occupancy_percent(current: u32, max_slots: u32) -> Option<Decimal> {
    if max_slots == 0 {
        return None;
    }
    Some(Decimal::from(current) * Decimal::ONE_HUNDRED / Decimal::from(max_slots))
}

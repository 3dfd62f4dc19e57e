//! Inventory aggregation
//!
//! Turns the flat unit list, catalog and sales ledger into one summary per
//! product/brand pair. Pure: the same inputs always produce the same map.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::models::{find_catalog_entry, CatalogEntry, SaleRecord, SkuSummary, StockUnit};
use crate::types::{AggregateOptions, PricePolicy, SkuKey};

/// Summaries keyed by SKU
pub type SummaryMap = BTreeMap<SkuKey, SkuSummary>;

/// Group stock units and sales into per-SKU summaries.
///
/// A bucket is opened by the first stock unit seen for its key. Sales only
/// count toward buckets that already exist, so a SKU whose stock is fully
/// depleted reports no sales here.
pub fn aggregate(
    catalog: &[CatalogEntry],
    stock: &[StockUnit],
    ledger: &[SaleRecord],
    options: &AggregateOptions,
) -> SummaryMap {
    let mut buckets = SummaryMap::new();

    for unit in stock {
        let bucket = buckets
            .entry(unit.key())
            .or_insert_with_key(|key| open_bucket(key, unit, catalog, options));
        bucket.current_stock_count += 1;
        bucket.unit_ids.push(unit.id.clone());
    }

    for sale in ledger {
        if let Some(bucket) = buckets.get_mut(&sale.key()) {
            bucket.units_sold_count += 1;
        }
    }

    for summary in buckets.values_mut() {
        summary.refresh_derived();
    }

    buckets
}

fn open_bucket(
    key: &SkuKey,
    first_unit: &StockUnit,
    catalog: &[CatalogEntry],
    options: &AggregateOptions,
) -> SkuSummary {
    let entry = find_catalog_entry(catalog, key);

    let unit_price = match options.price_policy {
        PricePolicy::CatalogReference => entry
            .and_then(|e| e.reference_price)
            .unwrap_or(first_unit.unit_price),
        PricePolicy::FirstSeen => first_unit.unit_price,
    };
    let max_slots = entry
        .and_then(|e| e.max_slots)
        .unwrap_or(options.default_max_slots);

    let mut summary = SkuSummary::empty(key, unit_price, max_slots);
    if let Some(entry) = entry.filter(|e| !e.category.is_empty()) {
        summary.category = entry.category.clone();
    }
    summary.barcode = first_unit
        .barcode
        .clone()
        .or_else(|| entry.map(|e| e.code.clone()).filter(|c| !c.is_empty()));
    summary
}

/// Summary for a SKU, falling back to its catalog entry when nothing is in stock
pub fn summary_for(
    summaries: &SummaryMap,
    catalog: &[CatalogEntry],
    key: &SkuKey,
    options: &AggregateOptions,
) -> Option<SkuSummary> {
    summaries.get(key).cloned().or_else(|| {
        find_catalog_entry(catalog, key).map(|entry| SkuSummary::from_catalog(entry, options))
    })
}

/// Case-insensitive search over product and brand names
pub fn search<'a>(summaries: &'a SummaryMap, query: &str) -> Vec<&'a SkuSummary> {
    let needle = query.trim().to_lowercase();
    summaries
        .values()
        .filter(|s| {
            needle.is_empty()
                || s.product_name.to_lowercase().contains(&needle)
                || s.brand_name.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Total value of everything on the shelves
pub fn total_stock_value(summaries: &SummaryMap) -> Decimal {
    summaries.values().map(|s| s.stock_value).sum()
}

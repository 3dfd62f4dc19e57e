//! WebAssembly module for Stockroom
//!
//! Lets the browser compute inventory views from the collection snapshots it
//! already receives, without a round trip:
//! - SKU summaries and the restock worklist
//! - Quantity checks before a batch is submitted
//! - Sales history reports

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use shared::decode::{decode_catalog, decode_sales, decode_stock, DecodeIssue};
use shared::{
    aggregate, build_dashboard, classify, parse_quantity, restock_worklist, sales_report,
    total_stock_value, AggregateOptions, CatalogEntry, PlanError, RestockTier,
    SaleRecord, SalesWindow, SkuSummary, Snapshot, StockUnit,
};

/// Summaries of every SKU on hand
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InventoryOverview {
    summaries: Vec<SkuSummary>,
    total_stock_value: Decimal,
    issues: Vec<DecodeIssue>,
}

/// Aggregate catalog, stock and sales snapshots into per-SKU summaries
#[wasm_bindgen]
pub fn summarize_inventory(
    catalog_json: &str,
    stock_json: &str,
    sales_json: &str,
) -> Result<String, JsValue> {
    summarize(catalog_json, stock_json, sales_json).map_err(|e| JsValue::from_str(&e))
}

/// Restock tier for an occupancy percentage
#[wasm_bindgen]
pub fn classify_restock(occupancy_percent: f64) -> Result<String, JsValue> {
    tier_for(occupancy_percent)
        .map(|tier| tier.to_string())
        .map_err(|e| JsValue::from_str(&e))
}

/// Critical and low SKUs, most depleted first
#[wasm_bindgen]
pub fn restock_worklist_json(
    catalog_json: &str,
    stock_json: &str,
    sales_json: &str,
) -> Result<String, JsValue> {
    worklist(catalog_json, stock_json, sales_json).map_err(|e| JsValue::from_str(&e))
}

/// Dashboard metrics and lists
#[wasm_bindgen]
pub fn dashboard_json(
    catalog_json: &str,
    stock_json: &str,
    sales_json: &str,
) -> Result<String, JsValue> {
    dashboard(catalog_json, stock_json, sales_json).map_err(|e| JsValue::from_str(&e))
}

/// Validate a typed quantity against the units available.
///
/// Returns the parsed quantity, or the message to show next to the field.
#[wasm_bindgen]
pub fn check_batch_quantity(input: &str, available: u32) -> Result<u32, JsValue> {
    checked_quantity(input, available).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Sales report for a window (`all`, `week`, `month`, `day:YYYY-MM-DD`),
/// relative to `now_iso` in its own UTC offset
#[wasm_bindgen]
pub fn sales_report_json(sales_json: &str, window: &str, now_iso: &str) -> Result<String, JsValue> {
    report(sales_json, window, now_iso).map_err(|e| JsValue::from_str(&e))
}

/// Sales report relative to the browser clock
#[wasm_bindgen]
pub fn sales_report_now_json(sales_json: &str, window: &str) -> Result<String, JsValue> {
    let now = js_sys::Date::new_0();
    let offset_minutes = now.get_timezone_offset() as i32;
    let local = local_iso(&String::from(now.to_iso_string()), offset_minutes)
        .map_err(|e| JsValue::from_str(&e))?;
    report(sales_json, window, &local).map_err(|e| JsValue::from_str(&e))
}

/// Re-express a UTC timestamp in the browser's offset.
///
/// `offset_minutes` follows `Date.getTimezoneOffset`: positive west of UTC.
fn local_iso(utc_iso: &str, offset_minutes: i32) -> Result<String, String> {
    let offset = FixedOffset::west_opt(offset_minutes * 60)
        .ok_or_else(|| format!("Invalid offset {}", offset_minutes))?;
    let at = DateTime::parse_from_rfc3339(utc_iso)
        .map_err(|e| format!("Invalid timestamp {}: {}", utc_iso, e))?;
    Ok(at.with_timezone(&offset).to_rfc3339())
}

fn warn_issues(issues: &[DecodeIssue]) {
    for issue in issues {
        let line = format!("{}: {} {}", issue.id, issue.field, issue.reason);
        if cfg!(target_arch = "wasm32") {
            web_sys::console::warn_1(&JsValue::from_str(&line));
        }
    }
}

fn parse_snapshot(json: &str, what: &str) -> Result<Snapshot, String> {
    if json.trim().is_empty() || json.trim() == "null" {
        return Ok(Snapshot::new());
    }
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

/// The three decoded collections plus everything repaired or dropped on the way
struct Collections {
    catalog: Vec<CatalogEntry>,
    stock: Vec<StockUnit>,
    sales: Vec<SaleRecord>,
    issues: Vec<DecodeIssue>,
}

fn decode_all(catalog_json: &str, stock_json: &str, sales_json: &str) -> Result<Collections, String> {
    let catalog = decode_catalog(&parse_snapshot(catalog_json, "catalog")?);
    let stock = decode_stock(&parse_snapshot(stock_json, "stock")?);
    let sales = decode_sales(&parse_snapshot(sales_json, "sales")?);

    let issues = [catalog.issues, stock.issues, sales.issues].concat();
    warn_issues(&issues);
    Ok(Collections {
        catalog: catalog.records,
        stock: stock.records,
        sales: sales.records,
        issues,
    })
}

fn summarize(catalog_json: &str, stock_json: &str, sales_json: &str) -> Result<String, String> {
    let data = decode_all(catalog_json, stock_json, sales_json)?;
    let summaries = aggregate(
        &data.catalog,
        &data.stock,
        &data.sales,
        &AggregateOptions::default(),
    );
    let overview = InventoryOverview {
        total_stock_value: total_stock_value(&summaries),
        summaries: summaries.into_values().collect(),
        issues: data.issues,
    };
    serde_json::to_string(&overview).map_err(|e| e.to_string())
}

fn worklist(catalog_json: &str, stock_json: &str, sales_json: &str) -> Result<String, String> {
    let data = decode_all(catalog_json, stock_json, sales_json)?;
    let summaries = aggregate(
        &data.catalog,
        &data.stock,
        &data.sales,
        &AggregateOptions::default(),
    );
    serde_json::to_string(&restock_worklist(summaries.values())).map_err(|e| e.to_string())
}

fn dashboard(catalog_json: &str, stock_json: &str, sales_json: &str) -> Result<String, String> {
    let data = decode_all(catalog_json, stock_json, sales_json)?;
    let view = build_dashboard(
        &data.catalog,
        &data.stock,
        &data.sales,
        &AggregateOptions::default(),
    );
    serde_json::to_string(&view).map_err(|e| e.to_string())
}

fn tier_for(occupancy_percent: f64) -> Result<RestockTier, String> {
    if !occupancy_percent.is_finite() {
        return Err(format!("Invalid occupancy {}", occupancy_percent));
    }
    Decimal::try_from(occupancy_percent)
        .map(classify)
        .map_err(|e| format!("Invalid occupancy {}: {}", occupancy_percent, e))
}

fn checked_quantity(input: &str, available: u32) -> Result<u32, PlanError> {
    let requested = parse_quantity(input)?;
    if requested > available {
        return Err(PlanError::InsufficientStock {
            requested,
            available,
        });
    }
    Ok(requested)
}

fn report(sales_json: &str, window: &str, now_iso: &str) -> Result<String, String> {
    let window: SalesWindow = window.parse()?;
    let now = DateTime::parse_from_rfc3339(now_iso)
        .map_err(|e| format!("Invalid timestamp {}: {}", now_iso, e))?;
    let sales = decode_sales(&parse_snapshot(sales_json, "sales")?);
    warn_issues(&sales.issues);

    serde_json::to_string(&sales_report(&sales.records, window, &now)).map_err(|e| e.to_string())
}

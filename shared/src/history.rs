//! Sales history windows and "most sold" rankings

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::SaleRecord;
use crate::types::SkuKey;

/// Number of products in a "most sold" ranking
pub const TOP_PRODUCTS: usize = 5;

/// Time window applied to the sales ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "date", rename_all = "snake_case")]
pub enum SalesWindow {
    /// One local calendar day
    Day(NaiveDate),
    /// Since the most recent Sunday, local midnight
    Week,
    /// Since the first of the current month, local midnight
    Month,
    All,
}

impl fmt::Display for SalesWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SalesWindow::Day(date) => write!(f, "day:{}", date),
            SalesWindow::Week => write!(f, "week"),
            SalesWindow::Month => write!(f, "month"),
            SalesWindow::All => write!(f, "all"),
        }
    }
}

impl FromStr for SalesWindow {
    type Err = String;

    /// `all`, `week`, `month` or `day:YYYY-MM-DD`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "all" => Ok(SalesWindow::All),
            "week" => Ok(SalesWindow::Week),
            "month" => Ok(SalesWindow::Month),
            _ => s
                .strip_prefix("day:")
                .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
                .map(SalesWindow::Day)
                .ok_or_else(|| format!("unknown sales window: {}", s)),
        }
    }
}

/// Most recent first; undated records last, in their original order
pub fn sort_by_recency(ledger: &mut [SaleRecord]) {
    ledger.sort_by(|a, b| b.sold_at.cmp(&a.sold_at));
}

/// Records of `ledger` that fall in `window`, relative to `now` in its time zone.
///
/// Order is preserved. Records without a timestamp only survive `All`.
pub fn filter_sales<Tz: TimeZone>(
    ledger: &[SaleRecord],
    window: &SalesWindow,
    now: &DateTime<Tz>,
) -> Vec<SaleRecord> {
    let tz = now.timezone();
    let today = now.date_naive();

    match window {
        SalesWindow::All => ledger.to_vec(),
        SalesWindow::Day(date) => ledger
            .iter()
            .filter(|sale| {
                sale.sold_at
                    .map(|at| at.with_timezone(&tz).date_naive() == *date)
                    .unwrap_or(false)
            })
            .cloned()
            .collect(),
        SalesWindow::Week => {
            let back = i64::from(today.weekday().num_days_from_sunday());
            since(ledger, local_midnight(&tz, today - Duration::days(back)))
        }
        SalesWindow::Month => {
            let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
            since(ledger, local_midnight(&tz, first))
        }
    }
}

fn since(ledger: &[SaleRecord], start: DateTime<Utc>) -> Vec<SaleRecord> {
    ledger
        .iter()
        .filter(|sale| sale.sold_at.map(|at| at >= start).unwrap_or(false))
        .cloned()
        .collect()
}

/// Start of `date` in `tz`. Falls back to UTC midnight when the local
/// midnight does not exist.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Units sold and revenue of one product over a period
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub product_name: String,
    pub brand_name: String,
    pub quantity: u32,
    pub revenue: Decimal,
}

/// Group sales by SKU, highest quantity first (ties by name)
pub fn group_sales(sales: &[SaleRecord]) -> Vec<ProductSales> {
    let mut groups: BTreeMap<SkuKey, ProductSales> = BTreeMap::new();
    for sale in sales {
        let group = groups.entry(sale.key()).or_insert_with_key(|key| ProductSales {
            product_name: key.product_name.clone(),
            brand_name: key.brand_name.clone(),
            quantity: 0,
            revenue: Decimal::ZERO,
        });
        group.quantity += 1;
        group.revenue += sale.unit_price;
    }

    let mut ranked: Vec<ProductSales> = groups.into_values().collect();
    ranked.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    ranked
}

/// The `limit` best sellers of a period
pub fn top_sold(sales: &[SaleRecord], limit: usize) -> Vec<ProductSales> {
    let mut ranked = group_sales(sales);
    ranked.truncate(limit);
    ranked
}

/// Sum of the sale prices of a period
pub fn period_total(sales: &[SaleRecord]) -> Decimal {
    sales.iter().map(|sale| sale.unit_price).sum()
}

/// Everything the history screen shows for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub window: SalesWindow,
    pub sales: Vec<SaleRecord>,
    pub top_products: Vec<ProductSales>,
    pub total: Decimal,
}

/// Filter the ledger to `window` and rank it
pub fn sales_report<Tz: TimeZone>(
    ledger: &[SaleRecord],
    window: SalesWindow,
    now: &DateTime<Tz>,
) -> SalesReport {
    let mut sales = filter_sales(ledger, &window, now);
    sort_by_recency(&mut sales);
    SalesReport {
        window,
        top_products: top_sold(&sales, TOP_PRODUCTS),
        total: period_total(&sales),
        sales,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use proptest::prelude::*;

    fn sale(name: &str, price: &str, at: Option<DateTime<Utc>>) -> SaleRecord {
        SaleRecord {
            id: String::new(),
            product_name: name.to_string(),
            brand_name: "X".to_string(),
            unit_price: price.parse().unwrap(),
            barcode: "MANUAL".to_string(),
            sold_at: at,
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_window_parsing() {
        assert_eq!("ALL".parse::<SalesWindow>(), Ok(SalesWindow::All));
        assert_eq!("week".parse::<SalesWindow>(), Ok(SalesWindow::Week));
        assert_eq!(
            "day:2024-03-06".parse::<SalesWindow>(),
            Ok(SalesWindow::Day(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()))
        );
        assert!("year".parse::<SalesWindow>().is_err());
        assert!("day:yesterday".parse::<SalesWindow>().is_err());
    }

    #[test]
    fn test_sort_by_recency_puts_undated_last() {
        let mut ledger = vec![
            sale("a", "1", Some(utc(2024, 3, 1, 9))),
            sale("undated", "1", None),
            sale("b", "1", Some(utc(2024, 3, 2, 9))),
        ];
        sort_by_recency(&mut ledger);
        let names: Vec<&str> = ledger.iter().map(|s| s.product_name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "undated"]);
    }

    #[test]
    fn test_all_keeps_everything_in_order() {
        let ledger = vec![
            sale("b", "1", Some(utc(2024, 3, 2, 9))),
            sale("undated", "1", None),
            sale("a", "1", Some(utc(2024, 3, 1, 9))),
        ];
        let now = utc(2024, 3, 6, 12);
        assert_eq!(filter_sales(&ledger, &SalesWindow::All, &now), ledger);
    }

    #[test]
    fn test_week_starts_sunday_local_midnight() {
        // 2024-03-06 is a Wednesday; the week starts Sunday 2024-03-03.
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap();
        let ledger = vec![
            // Sunday 00:30 local
            sale("in", "1", Some(utc(2024, 3, 3, 5) + Duration::minutes(30))),
            // Saturday 23:30 local
            sale("out", "1", Some(utc(2024, 3, 3, 4) + Duration::minutes(30))),
            sale("undated", "1", None),
        ];

        let week = filter_sales(&ledger, &SalesWindow::Week, &now);
        let names: Vec<&str> = week.iter().map(|s| s.product_name.as_str()).collect();
        assert_eq!(names, vec!["in"]);
    }

    #[test]
    fn test_week_on_sunday_starts_today() {
        let now = utc(2024, 3, 3, 15);
        let ledger = vec![
            sale("today", "1", Some(utc(2024, 3, 3, 1))),
            sale("yesterday", "1", Some(utc(2024, 3, 2, 23))),
        ];
        let week = filter_sales(&ledger, &SalesWindow::Week, &now);
        assert_eq!(week.len(), 1);
        assert_eq!(week[0].product_name, "today");
    }

    #[test]
    fn test_month_starts_on_the_first() {
        let now = utc(2024, 3, 20, 12);
        let ledger = vec![
            sale("march", "1", Some(utc(2024, 3, 1, 0))),
            sale("february", "1", Some(utc(2024, 2, 29, 23))),
        ];
        let month = filter_sales(&ledger, &SalesWindow::Month, &now);
        assert_eq!(month.len(), 1);
        assert_eq!(month[0].product_name, "march");
    }

    #[test]
    fn test_day_uses_local_calendar_date() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let ledger = vec![
            // 2024-03-06 02:00 UTC is still March 5th local
            sale("late", "1", Some(utc(2024, 3, 6, 2))),
            sale("next", "1", Some(utc(2024, 3, 6, 6))),
        ];
        let filtered = filter_sales(&ledger, &SalesWindow::Day(day), &now);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].product_name, "late");
    }

    #[test]
    fn test_top_sold_ranks_by_quantity() {
        let at = Some(utc(2024, 3, 1, 9));
        let ledger = vec![
            sale("Agua", "0.50", at),
            sale("Cola", "1.00", at),
            sale("Cola", "1.00", at),
            sale("Cola", "1.20", at),
            sale("Pan", "0.25", at),
            sale("Pan", "0.25", at),
        ];
        let top = top_sold(&ledger, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_name, "Cola");
        assert_eq!(top[0].quantity, 3);
        assert_eq!(top[0].revenue, Decimal::new(320, 2));
        assert_eq!(top[1].product_name, "Pan");
        assert_eq!(period_total(&ledger), Decimal::new(420, 2));
    }

    #[test]
    fn test_sales_report_for_month() {
        let now = utc(2024, 3, 20, 12);
        let ledger = vec![
            sale("Cola", "1.00", Some(utc(2024, 3, 2, 9))),
            sale("Cola", "1.00", Some(utc(2024, 3, 10, 9))),
            sale("Pan", "0.25", Some(utc(2024, 2, 2, 9))),
        ];
        let report = sales_report(&ledger, SalesWindow::Month, &now);
        assert_eq!(report.sales.len(), 2);
        assert_eq!(report.sales[0].sold_at, Some(utc(2024, 3, 10, 9)));
        assert_eq!(report.total, Decimal::from(2));
        assert_eq!(report.top_products.len(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// `All` never drops or reorders records
        #[test]
        fn prop_all_window_is_identity(hours in prop::collection::vec(prop::option::of(0i64..10_000), 0..30)) {
            let base = utc(2023, 1, 1, 0);
            let ledger: Vec<SaleRecord> = hours
                .iter()
                .enumerate()
                .map(|(i, h)| sale(&format!("p{}", i), "1", h.map(|h| base + Duration::hours(h))))
                .collect();
            let filtered = filter_sales(&ledger, &SalesWindow::All, &utc(2024, 6, 1, 0));
            prop_assert_eq!(filtered, ledger);
        }
    }
}

//! Restock classification

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::SkuSummary;

/// Occupancy at or below which a SKU is critical
pub const CRITICAL_MAX_PERCENT: i64 = 20;
/// Occupancy at or below which a SKU is low
pub const LOW_MAX_PERCENT: i64 = 50;

/// How urgently a SKU needs restocking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestockTier {
    /// 0-20% occupancy
    Critical,
    /// above 20%, up to 50%
    Low,
    /// above 50%
    Normal,
}

impl std::fmt::Display for RestockTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestockTier::Critical => write!(f, "Critical"),
            RestockTier::Low => write!(f, "Low"),
            RestockTier::Normal => write!(f, "Normal"),
        }
    }
}

/// Classify an occupancy percentage (thresholds inclusive)
pub fn classify(occupancy_percent: Decimal) -> RestockTier {
    if occupancy_percent <= Decimal::from(CRITICAL_MAX_PERCENT) {
        RestockTier::Critical
    } else if occupancy_percent <= Decimal::from(LOW_MAX_PERCENT) {
        RestockTier::Low
    } else {
        RestockTier::Normal
    }
}

/// Tier of a summary; `None` when its occupancy cannot be computed
pub fn classify_summary(summary: &SkuSummary) -> Option<RestockTier> {
    summary.occupancy_percent.map(classify)
}

/// A SKU that needs restocking
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockItem {
    pub tier: RestockTier,
    pub occupancy_percent: Decimal,
    pub summary: SkuSummary,
}

/// Critical and low SKUs, most depleted first.
///
/// SKUs without a computable occupancy are left out.
pub fn restock_worklist<'a>(summaries: impl IntoIterator<Item = &'a SkuSummary>) -> Vec<RestockItem> {
    let mut items: Vec<RestockItem> = summaries
        .into_iter()
        .filter_map(|summary| {
            let occupancy_percent = summary.occupancy_percent?;
            let tier = classify(occupancy_percent);
            (tier != RestockTier::Normal).then(|| RestockItem {
                tier,
                occupancy_percent,
                summary: summary.clone(),
            })
        })
        .collect();
    items.sort_by(|a, b| a.occupancy_percent.cmp(&b.occupancy_percent));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SkuKey;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn summary(name: &str, stock: u32, slots: u32) -> SkuSummary {
        let mut s = SkuSummary::empty(&SkuKey::new(name, "X"), Decimal::ONE, slots);
        s.current_stock_count = stock;
        s.refresh_derived();
        s
    }

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(classify(dec("0")), RestockTier::Critical);
        assert_eq!(classify(dec("20")), RestockTier::Critical);
        assert_eq!(classify(dec("20.0001")), RestockTier::Low);
        assert_eq!(classify(dec("50")), RestockTier::Low);
        assert_eq!(classify(dec("50.0001")), RestockTier::Normal);
        assert_eq!(classify(dec("100")), RestockTier::Normal);
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(RestockTier::Critical.to_string(), "Critical");
        assert_eq!(RestockTier::Low.to_string(), "Low");
        assert_eq!(RestockTier::Normal.to_string(), "Normal");
    }

    #[test]
    fn test_worklist_sorted_most_depleted_first() {
        let summaries = vec![
            summary("Low", 4, 10),
            summary("Full", 9, 10),
            summary("Empty", 0, 10),
            summary("Critical", 1, 10),
        ];

        let worklist = restock_worklist(&summaries);
        let names: Vec<&str> = worklist.iter().map(|i| i.summary.product_name.as_str()).collect();
        assert_eq!(names, vec!["Empty", "Critical", "Low"]);
        assert_eq!(worklist[0].tier, RestockTier::Critical);
        assert_eq!(worklist[2].tier, RestockTier::Low);
    }

    #[test]
    fn test_worklist_excludes_unmeasurable_capacity() {
        let summaries = vec![summary("NoShelf", 0, 0)];
        assert!(restock_worklist(&summaries).is_empty());
        assert_eq!(classify_summary(&summaries[0]), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Every occupancy maps to exactly the tier its range implies
        #[test]
        fn prop_tiers_exhaustive_and_exclusive(raw in 0i64..=2_000_000i64) {
            let pct = Decimal::new(raw, 4); // 0.0000 to 200.0000
            let tier = classify(pct);
            let expected = if pct <= Decimal::from(20) {
                RestockTier::Critical
            } else if pct <= Decimal::from(50) {
                RestockTier::Low
            } else {
                RestockTier::Normal
            };
            prop_assert_eq!(tier, expected);
        }
    }
}

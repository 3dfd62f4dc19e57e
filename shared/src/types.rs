//! Common types used across the engine

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Capacity assumed for a SKU that has no catalog entry
pub const DEFAULT_MAX_SLOTS: u32 = 100;

/// Category shown for SKUs registered without one
pub const DEFAULT_CATEGORY: &str = "General";

/// Brand recorded when a product is registered without one
pub const DEFAULT_BRAND: &str = "Genérico";

/// Barcode stamped on sale records whose SKU never had one
pub const MANUAL_BARCODE: &str = "MANUAL";

/// Full-collection snapshot as delivered by the store: identifier -> raw record.
///
/// Keys are ordered the way the store orders them (push identifiers sort
/// chronologically).
pub type Snapshot = BTreeMap<String, serde_json::Value>;

/// Natural key of an inventory line
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuKey {
    pub product_name: String,
    pub brand_name: String,
}

impl SkuKey {
    pub fn new(product_name: impl Into<String>, brand_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            brand_name: brand_name.into(),
        }
    }
}

impl fmt::Display for SkuKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.product_name, self.brand_name)
    }
}

/// How the canonical unit price of a SKU summary is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricePolicy {
    /// Catalog reference price when present, first-seen unit price otherwise
    #[default]
    CatalogReference,
    /// Price of the first stock unit encountered for the SKU
    FirstSeen,
}

/// Knobs for the aggregation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOptions {
    pub price_policy: PricePolicy,
    pub default_max_slots: u32,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            price_policy: PricePolicy::default(),
            default_max_slots: DEFAULT_MAX_SLOTS,
        }
    }
}

impl AggregateOptions {
    pub fn first_seen() -> Self {
        Self {
            price_policy: PricePolicy::FirstSeen,
            ..Self::default()
        }
    }
}

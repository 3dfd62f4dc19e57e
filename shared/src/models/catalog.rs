//! Catalog (SKU template) records

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::SkuKey;

/// A SKU a user has registered.
///
/// Not touched by sales or stock changes; an entry with no stock left still
/// describes a known product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// Store key of the entry, which is also the product's barcode
    #[serde(skip)]
    pub code: String,
    #[serde(rename = "tipoProducto")]
    pub product_name: String,
    #[serde(rename = "marcaFabricante")]
    pub brand_name: String,
    #[serde(
        rename = "precioReferencia",
        with = "rust_decimal::serde::str_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_price: Option<Decimal>,
    #[serde(rename = "categoria")]
    pub category: String,
    /// Shelf capacity used as the occupancy denominator
    #[serde(rename = "slotsMaximos", skip_serializing_if = "Option::is_none")]
    pub max_slots: Option<u32>,
}

impl CatalogEntry {
    pub fn key(&self) -> SkuKey {
        SkuKey::new(&self.product_name, &self.brand_name)
    }

    pub fn matches(&self, key: &SkuKey) -> bool {
        self.product_name == key.product_name && self.brand_name == key.brand_name
    }
}

/// Exact natural-key lookup
pub fn find_catalog_entry<'a>(catalog: &'a [CatalogEntry], key: &SkuKey) -> Option<&'a CatalogEntry> {
    catalog.iter().find(|entry| entry.matches(key))
}

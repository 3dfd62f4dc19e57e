//! Stock unit records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::SkuKey;

/// One physical unit of a product.
///
/// A unit is only ever created or deleted; quantity is the number of units
/// sharing a product/brand pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockUnit {
    /// Store-assigned identifier, empty until the unit is written
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "tipoProducto")]
    pub product_name: String,
    #[serde(rename = "marcaFabricante")]
    pub brand_name: String,
    #[serde(rename = "precio", with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    /// Catalog code the unit was created from
    #[serde(rename = "codigoBarras", skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(rename = "fechaIngreso", skip_serializing_if = "Option::is_none")]
    pub intake_at: Option<DateTime<Utc>>,
}

impl StockUnit {
    pub fn key(&self) -> SkuKey {
        SkuKey::new(&self.product_name, &self.brand_name)
    }

    pub fn matches(&self, key: &SkuKey) -> bool {
        self.product_name == key.product_name && self.brand_name == key.brand_name
    }
}

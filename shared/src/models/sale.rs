//! Sales ledger records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::SkuKey;

/// Append-only ledger entry, one per unit sold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRecord {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "tipoProducto")]
    pub product_name: String,
    #[serde(rename = "marcaFabricante")]
    pub brand_name: String,
    /// Unit price at the time of sale
    #[serde(rename = "precio", with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    #[serde(rename = "codigoBarras")]
    pub barcode: String,
    #[serde(rename = "fechaVenta", skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<DateTime<Utc>>,
}

impl SaleRecord {
    pub fn key(&self) -> SkuKey {
        SkuKey::new(&self.product_name, &self.brand_name)
    }
}

//! Barcode lookup client
//!
//! Queries the Open Food Facts product database to pre-fill registration
//! forms for scanned products.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// What the product database knows about a barcode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub name: String,
    pub brand: String,
    /// First category listed for the product
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Barcode to product information
#[async_trait]
pub trait ProductLookup: Send + Sync {
    /// `Ok(None)` when the product is unknown
    async fn lookup(&self, barcode: &str) -> AppResult<Option<ProductInfo>>;
}

/// Open Food Facts API client
#[derive(Clone)]
pub struct OpenFoodFactsClient {
    client: Client,
    base_url: String,
}

/// Open Food Facts product response
#[derive(Debug, Deserialize)]
struct OFFResponse {
    status: i32,
    product: Option<OFFProduct>,
}

#[derive(Debug, Deserialize)]
struct OFFProduct {
    product_name: Option<String>,
    brands: Option<String>,
    categories: Option<String>,
    image_url: Option<String>,
}

impl OpenFoodFactsClient {
    /// Create a new client against the public API
    pub fn new() -> Self {
        Self::with_base_url("https://world.openfoodfacts.org/api/v0".to_string())
    }

    /// Create a new client with custom base URL (for testing)
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for OpenFoodFactsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductLookup for OpenFoodFactsClient {
    async fn lookup(&self, barcode: &str) -> AppResult<Option<ProductInfo>> {
        let url = format!("{}/product/{}.json", self.base_url, barcode.trim());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Product lookup failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Product lookup error: {} - {}",
                status, body
            )));
        }

        let data: OFFResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse product response: {}", e))
        })?;

        Ok(convert_response(data))
    }
}

fn convert_response(data: OFFResponse) -> Option<ProductInfo> {
    if data.status != 1 {
        return None;
    }
    let product = data.product?;
    Some(ProductInfo {
        name: product.product_name.unwrap_or_default().trim().to_string(),
        brand: product.brands.unwrap_or_default().trim().to_string(),
        category: product
            .categories
            .as_deref()
            .and_then(|c| c.split(',').next())
            .unwrap_or_default()
            .trim()
            .to_string(),
        image_url: product.image_url.filter(|u| !u.is_empty()),
    })
}

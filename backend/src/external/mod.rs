//! External API integrations

pub mod extraction;
pub mod product_lookup;

pub use extraction::{ExtractedProduct, GenerativeExtractionClient, TextExtractor};
pub use product_lookup::{OpenFoodFactsClient, ProductInfo, ProductLookup};

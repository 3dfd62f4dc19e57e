//! Product intake: pre-filling registration drafts from a scan or a voice note

use std::sync::Arc;

use shared::ProductDraft;

use crate::external::{ExtractedProduct, ProductLookup, TextExtractor};

/// Outcome of a barcode scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    /// Whether the product database knew the barcode
    pub found: bool,
    pub draft: ProductDraft,
}

#[derive(Clone)]
pub struct IntakeService {
    lookup: Arc<dyn ProductLookup>,
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl IntakeService {
    pub fn new(lookup: Arc<dyn ProductLookup>, extractor: Option<Arc<dyn TextExtractor>>) -> Self {
        Self { lookup, extractor }
    }

    /// Draft for a scanned barcode.
    ///
    /// Unknown products and lookup failures both give an empty manual-entry
    /// draft carrying the barcode.
    pub async fn scan(&self, barcode: &str) -> ScanResult {
        let mut draft = ProductDraft::manual(barcode.trim());

        match self.lookup.lookup(barcode).await {
            Ok(Some(info)) => {
                tracing::info!("Barcode {} found: {}", barcode, info.name);
                draft.name = info.name;
                draft.brand = info.brand;
                draft.category = info.category;
                ScanResult { found: true, draft }
            }
            Ok(None) => {
                tracing::info!("Barcode {} not in product database", barcode);
                ScanResult { found: false, draft }
            }
            Err(e) => {
                tracing::warn!("Lookup for {} failed, falling back to manual entry: {}", barcode, e);
                ScanResult { found: false, draft }
            }
        }
    }

    /// Draft from a spoken description; `None` when it could not be understood
    pub async fn from_transcript(&self, transcript: &str) -> Option<ProductDraft> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return None;
        }
        let Some(extractor) = &self.extractor else {
            tracing::warn!("Voice intake requested but no extraction service is configured");
            return None;
        };

        match extractor.extract(transcript).await {
            Ok(extracted) => Some(draft_from_extraction(extracted)),
            Err(e) => {
                tracing::warn!("Could not understand transcript: {}", e);
                None
            }
        }
    }
}

fn draft_from_extraction(extracted: ExtractedProduct) -> ProductDraft {
    let mut draft = ProductDraft {
        name: extracted.name,
        brand: extracted.brand,
        price: extracted.price.replace(',', "."),
        category: extracted.category,
        ..ProductDraft::default()
    };
    if !extracted.stock.trim().is_empty() {
        draft.initial_stock = extracted.stock;
    }
    draft
}

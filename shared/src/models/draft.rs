//! Product registration drafts
//!
//! A draft mirrors the registration form: every field is the text the user
//! typed (or a lookup/extraction service pre-filled), and is only turned into
//! typed records once it validates.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation::{validate_not_blank, validate_price_text};

/// Form defaults
pub const FORM_DEFAULT_MAX_SLOTS: &str = "50";
pub const FORM_DEFAULT_INITIAL_STOCK: &str = "1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    /// Scanned or generated code; a fresh one is generated when absent
    #[serde(default)]
    pub barcode: Option<String>,
    #[validate(
        length(min = 1, message = "product name is required"),
        custom = "validate_not_blank"
    )]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[validate(length(min = 1, message = "price is required"), custom = "validate_price_text")]
    pub price: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub initial_stock: String,
    #[serde(default)]
    pub max_slots: String,
}

impl Default for ProductDraft {
    fn default() -> Self {
        Self {
            barcode: None,
            name: String::new(),
            brand: String::new(),
            price: String::new(),
            category: String::new(),
            initial_stock: FORM_DEFAULT_INITIAL_STOCK.to_string(),
            max_slots: FORM_DEFAULT_MAX_SLOTS.to_string(),
        }
    }
}

impl ProductDraft {
    /// Empty manual-entry draft for a code
    pub fn manual(barcode: impl Into<String>) -> Self {
        Self {
            barcode: Some(barcode.into()),
            ..Self::default()
        }
    }

    /// Initial units to create; unparsable or non-positive input means one
    pub fn initial_units(&self) -> u32 {
        self.initial_stock
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(1)
    }
}

//! Supplier helpers: brand picker and reorder message

use std::collections::HashSet;

use crate::models::{CatalogEntry, Contact};

/// Brands registered in the catalog, sorted and deduplicated
pub fn distinct_brands(catalog: &[CatalogEntry]) -> Vec<String> {
    let mut brands: Vec<String> = catalog
        .iter()
        .map(|entry| entry.brand_name.trim())
        .filter(|brand| !brand.is_empty())
        .map(str::to_string)
        .collect();
    brands.sort();
    brands.dedup();
    brands
}

/// Reorder request for the products of the contact's brand.
///
/// `None` when the catalog holds nothing of that brand.
pub fn reorder_message(contact: &Contact, catalog: &[CatalogEntry]) -> Option<String> {
    let brand = contact.represented_brand.trim().to_lowercase();
    let mut seen = HashSet::new();
    let products: Vec<&str> = catalog
        .iter()
        .filter(|entry| entry.brand_name.trim().to_lowercase() == brand)
        .map(|entry| entry.product_name.as_str())
        .filter(|name| seen.insert(*name))
        .collect();
    if products.is_empty() {
        return None;
    }

    let list: Vec<String> = products.iter().map(|p| format!("- {}", p)).collect();
    Some(format!(
        "Hola {}, necesito reponer stock de {}. Mis productos son:\n{}\n\nQuedo atento.",
        contact.name,
        contact.represented_brand,
        list.join("\n")
    ))
}

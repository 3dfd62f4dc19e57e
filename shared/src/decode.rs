//! Decoding boundary between raw store snapshots and typed records
//!
//! The store is schemaless: records arrive as JSON objects written by several
//! client versions, with numbers sometimes stored as text and sometimes as
//! JSON numbers. Every malformed field is resolved here, once:
//!
//! - records that are not objects, or have no product name, are skipped
//! - malformed numbers become zero
//! - malformed timestamps become `None`
//!
//! Each recovery is reported as a [`DecodeIssue`] so callers can log it.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::history::sort_by_recency;
use crate::models::{CatalogEntry, Contact, SaleRecord, StockUnit};
use crate::types::{Snapshot, DEFAULT_CATEGORY};

/// Something that was defaulted or dropped while decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeIssue {
    pub id: String,
    pub field: &'static str,
    pub reason: &'static str,
}

/// Typed records plus what had to be repaired to get them
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    pub issues: Vec<DecodeIssue>,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            issues: Vec::new(),
        }
    }
}

/// Decode the stock collection, in snapshot order
pub fn decode_stock(snapshot: &Snapshot) -> Decoded<StockUnit> {
    decode_each(snapshot, |id, obj, issues| {
        let product_name = required_text(id, obj, "tipoProducto", issues)?;
        Some(StockUnit {
            id: id.to_string(),
            product_name,
            brand_name: text(obj, "marcaFabricante").unwrap_or_default(),
            unit_price: decimal_or_zero(id, obj, &["precio"], issues),
            barcode: text(obj, "codigoBarras").filter(|s| !s.is_empty()),
            intake_at: timestamp(id, obj, "fechaIngreso", issues),
        })
    })
}

/// Decode the catalog collection; the store key becomes the entry code
pub fn decode_catalog(snapshot: &Snapshot) -> Decoded<CatalogEntry> {
    decode_each(snapshot, |id, obj, issues| {
        let product_name = required_text(id, obj, "tipoProducto", issues)?;
        Some(CatalogEntry {
            code: id.to_string(),
            product_name,
            brand_name: text(obj, "marcaFabricante").unwrap_or_default(),
            reference_price: optional_decimal(id, obj, "precioReferencia", issues),
            category: text(obj, "categoria")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            max_slots: optional_integer(id, obj, "slotsMaximos", issues),
        })
    })
}

/// Decode the sales ledger, most recent first
pub fn decode_sales(snapshot: &Snapshot) -> Decoded<SaleRecord> {
    let mut decoded = decode_each(snapshot, |id, obj, issues| {
        let product_name = required_text(id, obj, "tipoProducto", issues)?;
        Some(SaleRecord {
            id: id.to_string(),
            product_name,
            brand_name: text(obj, "marcaFabricante").unwrap_or_default(),
            // older clients only wrote the final sale price
            unit_price: decimal_or_zero(id, obj, &["precio", "precioVentaFinal"], issues),
            barcode: text(obj, "codigoBarras").unwrap_or_default(),
            sold_at: timestamp(id, obj, "fechaVenta", issues),
        })
    });
    sort_by_recency(&mut decoded.records);
    decoded
}

/// Decode the contacts collection
pub fn decode_contacts(snapshot: &Snapshot) -> Decoded<Contact> {
    decode_each(snapshot, |id, obj, issues| {
        let name = required_text(id, obj, "nombre", issues)?;
        Some(Contact {
            id: id.to_string(),
            name,
            company: text(obj, "empresa").unwrap_or_default(),
            phone: text(obj, "telefono").unwrap_or_default(),
            email: text(obj, "email").unwrap_or_default(),
            represented_brand: text(obj, "marcaRepresentada").unwrap_or_default(),
            created_at: timestamp(id, obj, "fechaCreacion", issues),
        })
    })
}

/// Parse a number the way the mobile client always has: leading numeric
/// prefix, surrounding whitespace ignored. `None` when nothing numeric leads.
pub fn parse_decimal_lenient(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if let Ok(value) = Decimal::from_str(trimmed) {
        return Some(value);
    }
    let prefix = numeric_prefix(trimmed, true);
    if prefix.is_empty() {
        return None;
    }
    Decimal::from_str(prefix.trim_end_matches('.')).ok()
}

/// Integer counterpart of [`parse_decimal_lenient`]
pub fn parse_integer_lenient(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    numeric_prefix(trimmed, false).parse::<i64>().ok()
}

fn numeric_prefix(s: &str, allow_fraction: bool) -> &str {
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        let ok = c.is_ascii_digit()
            || (i == 0 && (c == '-' || c == '+'))
            || (allow_fraction && c == '.' && !seen_dot);
        if !ok {
            break;
        }
        seen_dot |= c == '.';
        end = i + c.len_utf8();
    }
    &s[..end]
}

fn decode_each<T>(
    snapshot: &Snapshot,
    mut decode: impl FnMut(&str, &Map<String, Value>, &mut Vec<DecodeIssue>) -> Option<T>,
) -> Decoded<T> {
    let mut decoded = Decoded::default();
    for (id, value) in snapshot {
        let Some(obj) = value.as_object() else {
            decoded.issues.push(DecodeIssue {
                id: id.clone(),
                field: "*",
                reason: "record is not an object",
            });
            continue;
        };
        if let Some(record) = decode(id, obj, &mut decoded.issues) {
            decoded.records.push(record);
        }
    }
    decoded
}

fn text(obj: &Map<String, Value>, field: &str) -> Option<String> {
    match obj.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn required_text(
    id: &str,
    obj: &Map<String, Value>,
    field: &'static str,
    issues: &mut Vec<DecodeIssue>,
) -> Option<String> {
    match text(obj, field).filter(|s| !s.trim().is_empty()) {
        Some(value) => Some(value),
        None => {
            issues.push(DecodeIssue {
                id: id.to_string(),
                field,
                reason: "missing required field, record skipped",
            });
            None
        }
    }
}

fn decimal_or_zero(
    id: &str,
    obj: &Map<String, Value>,
    fields: &[&'static str],
    issues: &mut Vec<DecodeIssue>,
) -> Decimal {
    let raw = fields
        .iter()
        .find_map(|field| text(obj, field).filter(|s| !s.trim().is_empty()).map(|s| (*field, s)));
    match raw {
        Some((field, raw)) => parse_decimal_lenient(&raw).unwrap_or_else(|| {
            issues.push(DecodeIssue {
                id: id.to_string(),
                field,
                reason: "not a number, using 0",
            });
            Decimal::ZERO
        }),
        None => {
            issues.push(DecodeIssue {
                id: id.to_string(),
                field: fields[0],
                reason: "missing, using 0",
            });
            Decimal::ZERO
        }
    }
}

fn optional_decimal(
    id: &str,
    obj: &Map<String, Value>,
    field: &'static str,
    issues: &mut Vec<DecodeIssue>,
) -> Option<Decimal> {
    let raw = text(obj, field).filter(|s| !s.trim().is_empty())?;
    let parsed = parse_decimal_lenient(&raw);
    if parsed.is_none() {
        issues.push(DecodeIssue {
            id: id.to_string(),
            field,
            reason: "not a number, ignored",
        });
    }
    parsed
}

fn optional_integer(
    id: &str,
    obj: &Map<String, Value>,
    field: &'static str,
    issues: &mut Vec<DecodeIssue>,
) -> Option<u32> {
    let raw = text(obj, field).filter(|s| !s.trim().is_empty())?;
    match parse_integer_lenient(&raw).and_then(|n| u32::try_from(n).ok()) {
        Some(value) => Some(value),
        None => {
            issues.push(DecodeIssue {
                id: id.to_string(),
                field,
                reason: "not a whole number, using 0",
            });
            Some(0)
        }
    }
}

fn timestamp(
    id: &str,
    obj: &Map<String, Value>,
    field: &'static str,
    issues: &mut Vec<DecodeIssue>,
) -> Option<DateTime<Utc>> {
    let raw = text(obj, field)?;
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(_) => {
            issues.push(DecodeIssue {
                id: id.to_string(),
                field,
                reason: "not an RFC 3339 timestamp",
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(entries: Vec<(&str, Value)>) -> Snapshot {
        entries
            .into_iter()
            .map(|(id, value)| (id.to_string(), value))
            .collect()
    }

    #[test]
    fn test_decode_stock_unit() {
        let snap = snapshot(vec![(
            "-Nabc",
            json!({
                "tipoProducto": "Cola",
                "marcaFabricante": "BrandX",
                "precio": "1.00",
                "codigoBarras": "7750001",
                "fechaIngreso": "2024-03-01T10:00:00.000Z"
            }),
        )]);

        let decoded = decode_stock(&snap);
        assert!(decoded.issues.is_empty());
        let unit = &decoded.records[0];
        assert_eq!(unit.id, "-Nabc");
        assert_eq!(unit.unit_price, Decimal::new(100, 2));
        assert_eq!(unit.barcode.as_deref(), Some("7750001"));
        assert!(unit.intake_at.is_some());
    }

    #[test]
    fn test_malformed_price_defaults_to_zero() {
        let snap = snapshot(vec![(
            "a",
            json!({"tipoProducto": "Cola", "marcaFabricante": "BrandX", "precio": "gratis"}),
        )]);

        let decoded = decode_stock(&snap);
        assert_eq!(decoded.records[0].unit_price, Decimal::ZERO);
        assert_eq!(decoded.issues.len(), 1);
        assert_eq!(decoded.issues[0].field, "precio");
    }

    #[test]
    fn test_numeric_price_accepted() {
        let snap = snapshot(vec![(
            "a",
            json!({"tipoProducto": "Cola", "marcaFabricante": "BrandX", "precio": 2.5}),
        )]);

        assert_eq!(decode_stock(&snap).records[0].unit_price, Decimal::new(25, 1));
    }

    #[test]
    fn test_record_without_product_name_is_skipped() {
        let snap = snapshot(vec![
            ("a", json!({"marcaFabricante": "BrandX", "precio": "1"})),
            ("b", json!("not an object")),
            ("c", json!({"tipoProducto": "Cola", "marcaFabricante": "BrandX", "precio": "1"})),
        ]);

        let decoded = decode_stock(&snap);
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.records[0].id, "c");
        assert_eq!(decoded.issues.len(), 2);
    }

    #[test]
    fn test_catalog_slots_as_text_or_number() {
        let snap = snapshot(vec![
            ("GEN-1", json!({"tipoProducto": "Cola", "marcaFabricante": "X", "slotsMaximos": "50"})),
            ("GEN-2", json!({"tipoProducto": "Agua", "marcaFabricante": "Y", "slotsMaximos": 12})),
            ("GEN-3", json!({"tipoProducto": "Pan", "marcaFabricante": "Z"})),
            ("GEN-4", json!({"tipoProducto": "Sal", "marcaFabricante": "Z", "slotsMaximos": "muchos"})),
        ]);

        let decoded = decode_catalog(&snap);
        let slots: Vec<Option<u32>> = decoded.records.iter().map(|c| c.max_slots).collect();
        assert_eq!(slots, vec![Some(50), Some(12), None, Some(0)]);
        assert_eq!(decoded.records[0].code, "GEN-1");
        assert_eq!(decoded.records[2].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_sales_fall_back_to_final_price_and_sort_by_recency() {
        let snap = snapshot(vec![
            (
                "a",
                json!({"tipoProducto": "Cola", "marcaFabricante": "X", "precioVentaFinal": "2.00",
                       "fechaVenta": "2024-03-01T10:00:00Z"}),
            ),
            (
                "b",
                json!({"tipoProducto": "Cola", "marcaFabricante": "X", "precio": "1.00",
                       "fechaVenta": "2024-03-02T10:00:00Z"}),
            ),
        ]);

        let decoded = decode_sales(&snap);
        assert_eq!(decoded.records[0].id, "b");
        assert_eq!(decoded.records[1].unit_price, Decimal::from(2));
    }

    #[test]
    fn test_bad_timestamp_becomes_none() {
        let snap = snapshot(vec![(
            "a",
            json!({"tipoProducto": "Cola", "marcaFabricante": "X", "precio": "1", "fechaVenta": "ayer"}),
        )]);

        let decoded = decode_sales(&snap);
        assert_eq!(decoded.records[0].sold_at, None);
        assert_eq!(decoded.issues[0].field, "fechaVenta");
    }

    #[test]
    fn test_parse_decimal_lenient() {
        assert_eq!(parse_decimal_lenient("1.50"), Some(Decimal::new(150, 2)));
        assert_eq!(parse_decimal_lenient(" 3 "), Some(Decimal::from(3)));
        assert_eq!(parse_decimal_lenient("2.5 usd"), Some(Decimal::new(25, 1)));
        assert_eq!(parse_decimal_lenient("7."), Some(Decimal::from(7)));
        assert_eq!(parse_decimal_lenient("abc"), None);
        assert_eq!(parse_decimal_lenient(""), None);
    }

    #[test]
    fn test_parse_integer_lenient() {
        assert_eq!(parse_integer_lenient("50"), Some(50));
        assert_eq!(parse_integer_lenient("12.7"), Some(12));
        assert_eq!(parse_integer_lenient("x"), None);
    }
}

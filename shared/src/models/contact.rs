//! Supplier and distributor contacts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation::{validate_not_blank, validate_optional_email};

/// A stored supplier contact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "empresa")]
    pub company: String,
    /// Digits only
    #[serde(rename = "telefono")]
    pub phone: String,
    pub email: String,
    #[serde(rename = "marcaRepresentada")]
    pub represented_brand: String,
    #[serde(rename = "fechaCreacion", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Input for adding a contact
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewContact {
    #[validate(length(min = 1, message = "name is required"), custom = "validate_not_blank")]
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    #[serde(default)]
    #[validate(custom = "validate_optional_email")]
    pub email: String,
    #[validate(length(min = 1, message = "brand is required"), custom = "validate_not_blank")]
    pub represented_brand: String,
}

//! Supplier contacts and reorder links

use std::sync::Arc;

use chrono::Utc;
use reqwest::Url;
use shared::contacts::{distinct_brands, reorder_message};
use shared::decode::{decode_catalog, decode_contacts};
use shared::{digits_only, normalize_phone, Contact, NewContact};
use validator::Validate;

use super::inventory::log_issues;
use crate::error::{AppError, AppResult};
use crate::store::{OwnerPaths, RecordStore, StoreError};

/// Contacts service bound to one owner's collections
#[derive(Clone)]
pub struct ContactsService {
    store: Arc<dyn RecordStore>,
    paths: OwnerPaths,
    country_code: String,
}

impl ContactsService {
    pub fn new(store: Arc<dyn RecordStore>, paths: OwnerPaths, country_code: &str) -> Self {
        Self {
            store,
            paths,
            country_code: country_code.to_string(),
        }
    }

    /// Save a new contact; the phone number is stored as digits only
    pub async fn add(&self, input: NewContact) -> AppResult<Contact> {
        input.validate()?;

        let phone = digits_only(&input.phone);
        if phone.is_empty() {
            return Err(AppError::validation(
                "phone",
                "Phone number must contain digits",
                "El teléfono debe contener números",
            ));
        }

        let mut contact = Contact {
            id: String::new(),
            name: input.name.trim().to_string(),
            company: input.company.trim().to_string(),
            phone,
            email: input.email.trim().to_string(),
            represented_brand: input.represented_brand.trim().to_string(),
            created_at: Some(Utc::now()),
        };
        let record =
            serde_json::to_value(&contact).map_err(|e| AppError::Internal(e.into()))?;
        contact.id = self.store.append(&self.paths.contacts(), record).await?;

        tracing::info!("Added contact {} for {}", contact.id, contact.represented_brand);
        Ok(contact)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        match self.store.delete(&self.paths.contact(id)).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => Err(AppError::NotFound(format!("Contact {}", id))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list(&self) -> AppResult<Vec<Contact>> {
        let snapshot = self.store.read(&self.paths.contacts()).await?;
        let decoded = decode_contacts(&snapshot);
        log_issues("contacts", &decoded.issues);
        Ok(decoded.records)
    }

    /// Brands the owner has registered products for
    pub async fn brands(&self) -> AppResult<Vec<String>> {
        let snapshot = self.store.read(&self.paths.catalog()).await?;
        Ok(distinct_brands(&decode_catalog(&snapshot).records))
    }

    /// Messaging link asking the contact to restock their brand's products.
    ///
    /// With no products of that brand the link opens an empty chat.
    pub async fn reorder_link(&self, contact: &Contact) -> AppResult<String> {
        let snapshot = self.store.read(&self.paths.catalog()).await?;
        let catalog = decode_catalog(&snapshot).records;
        let message = reorder_message(contact, &catalog).unwrap_or_default();
        whatsapp_link(&contact.phone, &message, &self.country_code)
    }
}

/// `https://wa.me/{phone}?text={message}`
pub fn whatsapp_link(phone: &str, message: &str, country_code: &str) -> AppResult<String> {
    let phone = normalize_phone(phone, country_code);
    if phone.is_empty() {
        return Err(AppError::validation(
            "phone",
            "Contact has no phone number",
            "El contacto no tiene teléfono",
        ));
    }
    let url = Url::parse_with_params(&format!("https://wa.me/{}", phone), &[("text", message)])
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whatsapp_link_normalizes_phone() {
        let link = whatsapp_link("098-765-4321", "Hola", "593").unwrap();
        assert_eq!(link, "https://wa.me/593987654321?text=Hola");
    }

    #[test]
    fn test_whatsapp_link_encodes_message() {
        let link = whatsapp_link("593987654321", "Hola Ana,\n- Cola", "593").unwrap();
        assert!(link.starts_with("https://wa.me/593987654321?text="));
        assert!(!link.contains('\n'));
        assert!(link.contains("%0A"));
    }

    #[test]
    fn test_whatsapp_link_requires_phone() {
        assert!(whatsapp_link("n/a", "", "593").is_err());
    }
}

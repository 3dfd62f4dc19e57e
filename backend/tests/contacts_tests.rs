//! Supplier contact tests
//!
//! - Contacts are stored with digits-only phone numbers
//! - Reorder links list the owner's products of the contact's brand
//! - Deleting an unknown contact is reported as not found

use std::sync::Arc;

use serde_json::json;
use shared::NewContact;
use stockroom_backend::error::AppError;
use stockroom_backend::services::ContactsService;
use stockroom_backend::store::{MemoryStore, OwnerPaths, RecordStore};

const OWNER: &str = "owner-1";

fn service(store: &MemoryStore) -> ContactsService {
    ContactsService::new(Arc::new(store.clone()), OwnerPaths::new(OWNER), "593")
}

fn ana() -> NewContact {
    NewContact {
        name: "Ana".to_string(),
        company: "Distribuidora Norte".to_string(),
        phone: "098 765 4321".to_string(),
        email: "ana@norte.ec".to_string(),
        represented_brand: "BrandX".to_string(),
    }
}

async fn seed_catalog(store: &MemoryStore) {
    let paths = OwnerPaths::new(OWNER);
    for (code, name, brand) in [
        ("1", "Cola", "BrandX"),
        ("2", "Agua", "brandx"),
        ("3", "Pan", "Local"),
        ("4", "Sal", ""),
    ] {
        store
            .write(
                &paths.catalog_entry(code),
                json!({"tipoProducto": name, "marcaFabricante": brand}),
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_add_and_list_contact() {
    let store = MemoryStore::new();
    let service = service(&store);

    let added = service.add(ana()).await.unwrap();
    assert!(!added.id.is_empty());
    assert_eq!(added.phone, "0987654321");
    assert!(added.created_at.is_some());

    let listed = service.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, added.id);
    assert_eq!(listed[0].name, "Ana");
    assert_eq!(listed[0].represented_brand, "BrandX");
}

#[tokio::test]
async fn test_add_rejects_missing_fields() {
    let store = MemoryStore::new();
    let service = service(&store);

    let err = service
        .add(NewContact {
            name: String::new(),
            ..ana()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let err = service
        .add(NewContact {
            phone: "sin teléfono".to_string(),
            ..ana()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    assert!(service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_rejects_blank_name_and_brand() {
    let store = MemoryStore::new();
    let service = service(&store);

    for input in [
        NewContact {
            name: "  ".to_string(),
            ..ana()
        },
        NewContact {
            represented_brand: "\t ".to_string(),
            ..ana()
        },
    ] {
        let err = service.add(input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }), "got {:?}", err);
    }
    assert_eq!(store.mutation_count(), 0);
}

#[tokio::test]
async fn test_delete_contact() {
    let store = MemoryStore::new();
    let service = service(&store);
    let added = service.add(ana()).await.unwrap();

    service.delete(&added.id).await.unwrap();
    assert!(service.list().await.unwrap().is_empty());

    let err = service.delete(&added.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_brands_are_distinct_and_sorted() {
    let store = MemoryStore::new();
    seed_catalog(&store).await;

    let brands = service(&store).brands().await.unwrap();
    assert_eq!(brands, vec!["BrandX", "Local", "brandx"]);
}

#[tokio::test]
async fn test_reorder_link_lists_brand_products() {
    let store = MemoryStore::new();
    seed_catalog(&store).await;
    let service = service(&store);
    let contact = service.add(ana()).await.unwrap();

    let link = service.reorder_link(&contact).await.unwrap();
    assert!(link.starts_with("https://wa.me/593987654321?text="));
    assert!(link.contains("Cola"));
    assert!(link.contains("Agua"));
    assert!(!link.contains("Pan"));
}

#[tokio::test]
async fn test_reorder_link_without_products_opens_empty_chat() {
    let store = MemoryStore::new();
    let service = service(&store);
    let contact = service.add(ana()).await.unwrap();

    let link = service.reorder_link(&contact).await.unwrap();
    assert_eq!(link, "https://wa.me/593987654321?text=");
}

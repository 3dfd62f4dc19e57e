//! Inventory service: product registration and sell/restock/delete batches

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture, FutureExt};
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use shared::decode::{decode_catalog, decode_sales, decode_stock, DecodeIssue};
use shared::{
    aggregate, find_catalog_entry, parse_max_slots, parse_price, parse_quantity, plan_batch,
    restock_worklist, search, summary_for, AggregateOptions, BatchAction, BatchPlan, CatalogEntry,
    ProductDraft, RestockItem, SaleRecord, SkuKey, SkuSummary, StockUnit, SummaryMap, WriteOp,
    DEFAULT_BRAND, DEFAULT_CATEGORY,
};
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::store::{OwnerPaths, RecordStore, StoreError, StoreResult, Updates};

/// How a batch plan reaches the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// Every write is issued on its own, concurrently; no rollback
    #[default]
    Concurrent,
    /// One multi-location update, applied entirely or not at all
    Atomic,
}

/// Inventory service bound to one owner's collections
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn RecordStore>,
    paths: OwnerPaths,
    options: AggregateOptions,
    form_default_max_slots: u32,
    commit_mode: CommitMode,
}

/// Result of a committed batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub action: BatchAction,
    pub sku: SkuKey,
    /// Always the requested quantity
    pub quantity: u32,
    pub writes: usize,
    /// Identifiers of the records the batch created
    pub created_ids: Vec<String>,
}

/// Result of registering a product
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredProduct {
    pub entry: CatalogEntry,
    pub unit_ids: Vec<String>,
}

/// The three collections the engine works on, decoded
#[derive(Debug, Clone, Default)]
pub struct InventoryData {
    pub catalog: Vec<CatalogEntry>,
    pub stock: Vec<StockUnit>,
    pub ledger: Vec<SaleRecord>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn RecordStore>, paths: OwnerPaths, options: AggregateOptions) -> Self {
        Self {
            store,
            paths,
            options,
            form_default_max_slots: 50,
            commit_mode: CommitMode::default(),
        }
    }

    /// Create a service from the application configuration
    pub fn from_config(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        let mode = if config.store.atomic_batches {
            CommitMode::Atomic
        } else {
            CommitMode::Concurrent
        };
        Self::new(
            store,
            OwnerPaths::new(&config.owner.uid),
            config.inventory.aggregate_options(),
        )
        .with_commit_mode(mode)
        .with_form_default_max_slots(config.inventory.form_default_max_slots)
    }

    pub fn with_commit_mode(mut self, mode: CommitMode) -> Self {
        self.commit_mode = mode;
        self
    }

    pub fn with_form_default_max_slots(mut self, slots: u32) -> Self {
        self.form_default_max_slots = slots;
        self
    }

    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    pub fn paths(&self) -> &OwnerPaths {
        &self.paths
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn load_catalog(&self) -> AppResult<Vec<CatalogEntry>> {
        let snapshot = self.store.read(&self.paths.catalog()).await?;
        let decoded = decode_catalog(&snapshot);
        log_issues("catalog", &decoded.issues);
        Ok(decoded.records)
    }

    pub async fn load_stock(&self) -> AppResult<Vec<StockUnit>> {
        let snapshot = self.store.read(&self.paths.stock()).await?;
        let decoded = decode_stock(&snapshot);
        log_issues("stock", &decoded.issues);
        Ok(decoded.records)
    }

    /// Sales ledger, most recent first
    pub async fn load_ledger(&self) -> AppResult<Vec<SaleRecord>> {
        let snapshot = self.store.read(&self.paths.sales()).await?;
        let decoded = decode_sales(&snapshot);
        log_issues("sales", &decoded.issues);
        Ok(decoded.records)
    }

    pub async fn load(&self) -> AppResult<InventoryData> {
        let (catalog, stock, ledger) =
            futures::try_join!(self.load_catalog(), self.load_stock(), self.load_ledger())?;
        Ok(InventoryData {
            catalog,
            stock,
            ledger,
        })
    }

    /// Per-SKU summaries of the current inventory
    pub async fn summaries(&self) -> AppResult<SummaryMap> {
        let data = self.load().await?;
        let summaries = aggregate(&data.catalog, &data.stock, &data.ledger, &self.options);
        tracing::debug!(
            "Aggregated {} units into {} SKUs",
            data.stock.len(),
            summaries.len()
        );
        Ok(summaries)
    }

    /// Summary of one SKU
    pub async fn summary(&self, sku: &SkuKey) -> AppResult<SkuSummary> {
        self.summaries()
            .await?
            .remove(sku)
            .ok_or_else(|| AppError::NotFound(format!("Product {}", sku)))
    }

    /// Inventory lines whose product or brand contains `query`
    pub async fn search(&self, query: &str) -> AppResult<Vec<SkuSummary>> {
        let summaries = self.summaries().await?;
        Ok(search(&summaries, query).into_iter().cloned().collect())
    }

    /// Critical and low SKUs, most depleted first
    pub async fn restock_worklist(&self) -> AppResult<Vec<RestockItem>> {
        let summaries = self.summaries().await?;
        Ok(restock_worklist(summaries.values()))
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a product: writes its catalog entry and its initial units
    pub async fn register_product(&self, draft: ProductDraft) -> AppResult<RegisteredProduct> {
        draft.validate()?;

        let price = parse_price(&draft.price).map_err(|msg| AppError::Validation {
            field: "price".to_string(),
            message: msg.to_string(),
            message_es: "El precio no es válido".to_string(),
        })?;
        let max_slots = parse_max_slots(&draft.max_slots)
            .map_err(|msg| AppError::Validation {
                field: "maxSlots".to_string(),
                message: msg.to_string(),
                message_es: "La capacidad debe ser un número entero".to_string(),
            })?
            .unwrap_or(self.form_default_max_slots);

        let now = Utc::now();
        let code = draft
            .barcode
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| generate_product_code(now));

        let entry = CatalogEntry {
            code: code.clone(),
            product_name: draft.name.trim().to_string(),
            brand_name: non_empty_or(&draft.brand, DEFAULT_BRAND),
            reference_price: Some(price),
            category: non_empty_or(&draft.category, DEFAULT_CATEGORY),
            max_slots: Some(max_slots),
        };
        self.store
            .write(&self.paths.catalog_entry(&code), to_record(&entry)?)
            .await?;

        let unit = StockUnit {
            id: String::new(),
            product_name: entry.product_name.clone(),
            brand_name: entry.brand_name.clone(),
            unit_price: price,
            barcode: Some(code.clone()),
            intake_at: Some(now),
        };
        let record = to_record(&unit)?;
        let stock_path = self.paths.stock();
        let appends = (0..draft.initial_units())
            .map(|_| self.store.append(&stock_path, record.clone()))
            .collect::<Vec<_>>();
        let unit_ids = future::try_join_all(appends).await?;

        tracing::info!(
            "Registered {} ({}) with {} units",
            entry.key(),
            code,
            unit_ids.len()
        );

        Ok(RegisteredProduct { entry, unit_ids })
    }

    // ========================================================================
    // Batches
    // ========================================================================

    /// Sell units of a SKU, booking one ledger entry per unit
    pub async fn sell(&self, sku: &SkuKey, quantity_input: &str) -> AppResult<BatchOutcome> {
        self.apply(BatchAction::Sell, sku, quantity_input).await
    }

    /// Remove units of a SKU without booking a sale
    pub async fn delete_units(&self, sku: &SkuKey, quantity_input: &str) -> AppResult<BatchOutcome> {
        self.apply(BatchAction::Delete, sku, quantity_input).await
    }

    /// Add units of a SKU; works for depleted SKUs that are still in the catalog
    pub async fn restock(&self, sku: &SkuKey, quantity_input: &str) -> AppResult<BatchOutcome> {
        self.apply(BatchAction::Restock, sku, quantity_input).await
    }

    /// Validate, plan and commit one user action
    pub async fn apply(
        &self,
        action: BatchAction,
        sku: &SkuKey,
        quantity_input: &str,
    ) -> AppResult<BatchOutcome> {
        let quantity = parse_quantity(quantity_input)?;

        let data = self.load().await?;
        let summaries = aggregate(&data.catalog, &data.stock, &data.ledger, &self.options);
        let summary = match action {
            BatchAction::Restock => summary_for(&summaries, &data.catalog, sku, &self.options),
            BatchAction::Sell | BatchAction::Delete => summaries.get(sku).cloned(),
        }
        .ok_or_else(|| AppError::NotFound(format!("Product {}", sku)))?;

        let plan = plan_batch(action, quantity, &summary, Utc::now())?;
        let created_ids = self.commit(&plan).await?;

        tracing::info!(
            "Committed {} of {} x{} ({} writes)",
            action.as_str(),
            sku,
            quantity,
            plan.ops.len()
        );

        Ok(BatchOutcome {
            action,
            sku: plan.sku.clone(),
            quantity: plan.quantity,
            writes: plan.ops.len(),
            created_ids,
        })
    }

    /// Write a plan to the store; returns the identifiers of created records
    pub async fn commit(&self, plan: &BatchPlan) -> AppResult<Vec<String>> {
        match self.commit_mode {
            CommitMode::Concurrent => self.commit_concurrent(plan).await,
            CommitMode::Atomic => self.commit_atomic(plan).await,
        }
    }

    async fn commit_concurrent(&self, plan: &BatchPlan) -> AppResult<Vec<String>> {
        let mut writes: Vec<BoxFuture<'_, StoreResult<Option<String>>>> =
            Vec::with_capacity(plan.ops.len());

        for op in &plan.ops {
            let write = match op {
                WriteOp::RemoveStock { id } => {
                    let path = self.paths.stock_unit(id);
                    async move { self.store.delete(&path).await.map(|_| None) }.boxed()
                }
                WriteOp::AppendStock { unit } => {
                    let record = to_record(unit)?;
                    let path = self.paths.stock();
                    async move { self.store.append(&path, record).await.map(Some) }.boxed()
                }
                WriteOp::AppendSale { sale } => {
                    let record = to_record(sale)?;
                    let path = self.paths.sales();
                    async move { self.store.append(&path, record).await.map(Some) }.boxed()
                }
            };
            writes.push(write);
        }

        let results = future::join_all(writes).await;
        let attempted = results.len();

        let mut created = Vec::new();
        let mut errors: Vec<StoreError> = Vec::new();
        for result in results {
            match result {
                Ok(Some(id)) => created.push(id),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }

        if let Some(first_error) = errors.first().cloned() {
            tracing::warn!(
                "Batch {} on {}: {} of {} writes failed, first: {}",
                plan.action.as_str(),
                plan.sku,
                errors.len(),
                attempted,
                first_error
            );
            return Err(AppError::PartialBatch {
                attempted,
                failed: errors.len(),
                first_error,
            });
        }

        Ok(created)
    }

    async fn commit_atomic(&self, plan: &BatchPlan) -> AppResult<Vec<String>> {
        let mut updates = Updates::new();
        let mut created = Vec::new();

        for op in &plan.ops {
            match op {
                WriteOp::RemoveStock { id } => {
                    updates.insert(self.paths.stock_unit(id), None);
                }
                WriteOp::AppendStock { unit } => {
                    let id = self.store.new_push_id();
                    updates.insert(self.paths.stock_unit(&id), Some(to_record(unit)?));
                    created.push(id);
                }
                WriteOp::AppendSale { sale } => {
                    let id = self.store.new_push_id();
                    updates.insert(self.paths.sale(&id), Some(to_record(sale)?));
                    created.push(id);
                }
            }
        }

        self.store.update_many(updates).await?;
        Ok(created)
    }

    /// Catalog entry of a SKU, if registered
    pub async fn catalog_entry(&self, sku: &SkuKey) -> AppResult<Option<CatalogEntry>> {
        let catalog = self.load_catalog().await?;
        Ok(find_catalog_entry(&catalog, sku).cloned())
    }
}

/// Code for a product registered without a barcode
pub fn generate_product_code(now: DateTime<Utc>) -> String {
    format!("GEN-{}", now.timestamp_millis())
}

/// Code offered when adding a product by hand from the inventory screen
pub fn generate_manual_code() -> String {
    format!("MAN-{}", rand::thread_rng().gen_range(0..10_000))
}

fn non_empty_or(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

fn to_record<T: Serialize>(record: &T) -> AppResult<Value> {
    serde_json::to_value(record).map_err(|e| AppError::Internal(e.into()))
}

pub(crate) fn log_issues(collection: &str, issues: &[DecodeIssue]) {
    for issue in issues {
        tracing::warn!(
            "Repaired {} record {}: {} {}",
            collection,
            issue.id,
            issue.field,
            issue.reason
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generated_codes() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(generate_product_code(now), "GEN-1709251200000");

        let manual = generate_manual_code();
        let number: u32 = manual.strip_prefix("MAN-").unwrap().parse().unwrap();
        assert!(number < 10_000);
    }

    #[test]
    fn test_non_empty_or() {
        assert_eq!(non_empty_or("  ", DEFAULT_BRAND), "Genérico");
        assert_eq!(non_empty_or(" Andes ", DEFAULT_BRAND), "Andes");
    }

    #[test]
    fn test_records_use_store_field_names() {
        let unit = StockUnit {
            id: String::new(),
            product_name: "Cola".to_string(),
            brand_name: "BrandX".to_string(),
            unit_price: "1.00".parse().unwrap(),
            barcode: Some("GEN-1".to_string()),
            intake_at: None,
        };
        let record = to_record(&unit).unwrap();
        assert_eq!(record["tipoProducto"], "Cola");
        assert_eq!(record["marcaFabricante"], "BrandX");
        assert_eq!(record["precio"], "1.00");
        assert_eq!(record["codigoBarras"], "GEN-1");
        assert!(record.get("id").is_none());
    }
}

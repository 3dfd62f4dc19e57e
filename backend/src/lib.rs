//! Stockroom backend
//!
//! Store client, services and external integrations for a small-business
//! inventory: barcode intake, point-of-sale deduction, sales history and
//! supplier contacts on top of a remote realtime database.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod external;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult, UserMessage};

use external::{GenerativeExtractionClient, OpenFoodFactsClient, TextExtractor};
use services::{ContactsService, DashboardFeed, HistoryService, IntakeService, InventoryService};
use store::{OwnerPaths, RecordStore};

/// Application state shared across services
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn paths(&self) -> OwnerPaths {
        OwnerPaths::new(&self.config.owner.uid)
    }

    pub fn inventory(&self) -> InventoryService {
        InventoryService::from_config(self.store.clone(), &self.config)
    }

    pub fn history(&self) -> HistoryService {
        HistoryService::new(self.store.clone(), self.paths())
    }

    pub fn contacts(&self) -> ContactsService {
        ContactsService::new(
            self.store.clone(),
            self.paths(),
            &self.config.contacts.default_country_code,
        )
    }

    /// Intake service; voice intake is disabled when no extraction key is set
    pub fn intake(&self) -> IntakeService {
        let lookup = Arc::new(OpenFoodFactsClient::with_base_url(
            self.config.lookup.base_url.clone(),
        ));
        let extractor = match GenerativeExtractionClient::from_config(&self.config.extraction) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn TextExtractor>),
            Err(e) => {
                tracing::warn!("Voice intake disabled: {}", e);
                None
            }
        };
        IntakeService::new(lookup, extractor)
    }

    /// Live dashboard for the configured owner
    pub async fn dashboard_feed(&self) -> AppResult<DashboardFeed> {
        DashboardFeed::start(
            self.store.clone(),
            &self.paths(),
            self.config.inventory.aggregate_options(),
        )
        .await
    }
}

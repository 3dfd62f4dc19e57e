//! Configuration management for the Stockroom backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with STOCKROOM_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{AggregateOptions, PricePolicy};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Remote record store
    pub store: StoreConfig,

    /// The signed-in owner whose data is read and written
    pub owner: OwnerConfig,

    /// Inventory engine settings
    pub inventory: InventoryConfig,

    /// Barcode lookup service
    pub lookup: LookupConfig,

    /// Text extraction service
    pub extraction: ExtractionConfig,

    /// Supplier contacts
    pub contacts: ContactsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Realtime database base URL
    pub database_url: String,

    /// Auth token appended to every request
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Commit batches as one multi-location update
    pub atomic_batches: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OwnerConfig {
    pub uid: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Capacity for SKUs without a catalog entry
    pub default_max_slots: u32,

    /// Capacity pre-filled in the registration form
    pub form_default_max_slots: u32,

    /// How a summary's unit price is chosen
    pub price_policy: PricePolicy,
}

impl InventoryConfig {
    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            price_policy: self.price_policy,
            default_max_slots: self.default_max_slots,
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            default_max_slots: shared::DEFAULT_MAX_SLOTS,
            form_default_max_slots: 50,
            price_policy: PricePolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LookupConfig {
    /// Product database API base URL
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Generative model API endpoint
    pub endpoint: String,

    /// API key
    #[serde(default)]
    pub api_key: String,

    /// Model name
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContactsConfig {
    /// Country calling code added to national phone numbers
    pub default_country_code: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("STOCKROOM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("store.request_timeout_secs", 30)?
            .set_default("store.atomic_batches", false)?
            .set_default("inventory.default_max_slots", i64::from(shared::DEFAULT_MAX_SLOTS))?
            .set_default("inventory.form_default_max_slots", 50)?
            .set_default("inventory.price_policy", "catalog_reference")?
            .set_default("lookup.base_url", "https://world.openfoodfacts.org/api/v0")?
            .set_default(
                "extraction.endpoint",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("extraction.model", "gemini-2.5-flash")?
            .set_default("contacts.default_country_code", "593")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (STOCKROOM_ prefix)
            .add_source(
                Environment::with_prefix("STOCKROOM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

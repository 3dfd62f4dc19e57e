//! Stockroom watcher
//!
//! Follows one owner's inventory live and logs the restock worklist whenever
//! it changes.

use std::sync::Arc;

use shared::{RestockItem, SkuKey};
use stockroom_backend::store::RealtimeDbStore;
use stockroom_backend::{AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stockroom_backend=debug,stockroom_watcher=debug,reqwest=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Stockroom watcher");
    tracing::info!("Environment: {}", config.environment);

    let store = RealtimeDbStore::from_config(&config.store)?;
    let state = AppState::new(Arc::new(store), config);

    tracing::info!("Watching inventory of {}", state.config.owner.uid);
    let mut feed = state.dashboard_feed().await?;
    let mut last: Option<Vec<(SkuKey, String)>> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            view = feed.changed() => {
                let Some(view) = view else {
                    tracing::warn!("Dashboard feed ended");
                    break;
                };
                let current = worklist_signature(&view.restock);
                if last.as_ref() != Some(&current) {
                    log_worklist(&view.restock);
                    last = Some(current);
                }
            }
        }
    }

    feed.stop().await;
    Ok(())
}

fn worklist_signature(items: &[RestockItem]) -> Vec<(SkuKey, String)> {
    items
        .iter()
        .map(|item| (item.summary.key(), item.occupancy_percent.to_string()))
        .collect()
}

fn log_worklist(items: &[RestockItem]) {
    if items.is_empty() {
        tracing::info!("Nothing needs restocking");
        return;
    }
    tracing::info!("{} products need restocking", items.len());
    for item in items {
        tracing::info!(
            "  [{}] {} - {} units of {} ({}%)",
            item.tier,
            item.summary.key(),
            item.summary.current_stock_count,
            item.summary.max_slots,
            item.occupancy_percent.round_dp(1)
        );
    }
}

//! Live dashboard feed
//!
//! Subscribes to the catalog, stock and sales collections, replaces each one
//! wholesale when a new snapshot arrives and republishes the full dashboard
//! view. Nothing is published until all three collections have been seen once.

use std::sync::Arc;

use shared::decode::{decode_catalog, decode_sales, decode_stock};
use shared::{build_dashboard, AggregateOptions, DashboardView};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use super::inventory::{log_issues, InventoryData};
use crate::error::AppResult;
use crate::store::{OwnerPaths, RecordStore, Subscription};

pub struct DashboardFeed {
    receiver: watch::Receiver<Option<DashboardView>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl DashboardFeed {
    /// Subscribe to the owner's collections and start publishing
    pub async fn start(
        store: Arc<dyn RecordStore>,
        paths: &OwnerPaths,
        options: AggregateOptions,
    ) -> AppResult<Self> {
        let catalog = store.subscribe(&paths.catalog()).await?;
        let stock = store.subscribe(&paths.stock()).await?;
        let sales = store.subscribe(&paths.sales()).await?;

        let (tx, receiver) = watch::channel(None);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(catalog, stock, sales, options, tx, shutdown_rx));

        Ok(Self {
            receiver,
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    /// Most recently published view
    pub fn latest(&self) -> Option<DashboardView> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published view; `None` once the feed has stopped
    pub async fn changed(&mut self) -> Option<DashboardView> {
        self.receiver.changed().await.ok()?;
        self.receiver.borrow_and_update().clone()
    }

    /// Another handle on the published views
    pub fn watch(&self) -> watch::Receiver<Option<DashboardView>> {
        self.receiver.clone()
    }

    /// Stop publishing and release the subscriptions
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for DashboardFeed {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn run(
    mut catalog: Subscription,
    mut stock: Subscription,
    mut sales: Subscription,
    options: AggregateOptions,
    tx: watch::Sender<Option<DashboardView>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut data = InventoryData::default();
    let mut seen = [false; 3];

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            snapshot = catalog.next() => {
                let Some(snapshot) = snapshot else { break };
                let decoded = decode_catalog(&snapshot);
                log_issues("catalog", &decoded.issues);
                data.catalog = decoded.records;
                seen[0] = true;
            }
            snapshot = stock.next() => {
                let Some(snapshot) = snapshot else { break };
                let decoded = decode_stock(&snapshot);
                log_issues("stock", &decoded.issues);
                data.stock = decoded.records;
                seen[1] = true;
            }
            snapshot = sales.next() => {
                let Some(snapshot) = snapshot else { break };
                let decoded = decode_sales(&snapshot);
                log_issues("sales", &decoded.issues);
                data.ledger = decoded.records;
                seen[2] = true;
            }
        }

        if seen.iter().all(|s| *s) {
            let view = build_dashboard(&data.catalog, &data.stock, &data.ledger, &options);
            tracing::debug!(
                "Dashboard recomputed: {} units, {} to restock",
                view.metrics.total_stock,
                view.restock.len()
            );
            if tx.send(Some(view)).is_err() {
                break;
            }
        }
    }

    catalog.unsubscribe();
    stock.unsubscribe();
    sales.unsubscribe();
    tracing::debug!("Dashboard feed stopped");
}

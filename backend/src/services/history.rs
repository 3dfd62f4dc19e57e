//! Sales history reports

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use shared::decode::decode_sales;
use shared::{sales_report, SalesReport, SalesWindow};

use super::inventory::log_issues;
use crate::error::AppResult;
use crate::store::{OwnerPaths, RecordStore};

#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn RecordStore>,
    paths: OwnerPaths,
}

impl HistoryService {
    pub fn new(store: Arc<dyn RecordStore>, paths: OwnerPaths) -> Self {
        Self { store, paths }
    }

    /// Report for `window`, relative to the local clock
    pub async fn report(&self, window: SalesWindow) -> AppResult<SalesReport> {
        self.report_at(window, &Local::now()).await
    }

    /// Report for `window`, relative to `now` in its time zone
    pub async fn report_at<Tz: TimeZone>(
        &self,
        window: SalesWindow,
        now: &DateTime<Tz>,
    ) -> AppResult<SalesReport> {
        let snapshot = self.store.read(&self.paths.sales()).await?;
        let decoded = decode_sales(&snapshot);
        log_issues("sales", &decoded.issues);

        let report = sales_report(&decoded.records, window, now);
        tracing::debug!(
            "Sales report {}: {} of {} sales, total {}",
            window,
            report.sales.len(),
            decoded.records.len(),
            report.total
        );
        Ok(report)
    }
}

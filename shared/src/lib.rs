//! Shared types and engine for the Stockroom inventory platform
//!
//! This crate contains the record types, the decoding boundary for raw store
//! records and the pure inventory engine (aggregation, restock tiers, batch
//! planning, sales history). It is used by the backend and by the mobile
//! client through WASM.

pub mod aggregation;
pub mod contacts;
pub mod dashboard;
pub mod decode;
pub mod history;
pub mod models;
pub mod planner;
pub mod restock;
pub mod types;
pub mod validation;

pub use aggregation::{aggregate, search, summary_for, total_stock_value, SummaryMap};
pub use dashboard::{build_dashboard, DashboardMetrics, DashboardView};
pub use decode::{DecodeIssue, Decoded};
pub use history::{sales_report, ProductSales, SalesReport, SalesWindow};
pub use models::*;
pub use planner::{parse_quantity, plan_batch, BatchAction, BatchPlan, PlanError, WriteOp};
pub use restock::{classify, restock_worklist, RestockItem, RestockTier};
pub use types::*;
pub use validation::*;

//! Business logic services for the Stockroom backend

pub mod contacts;
pub mod dashboard;
pub mod history;
pub mod intake;
pub mod inventory;

pub use contacts::ContactsService;
pub use dashboard::DashboardFeed;
pub use history::HistoryService;
pub use intake::{IntakeService, ScanResult};
pub use inventory::{BatchOutcome, CommitMode, InventoryData, InventoryService, RegisteredProduct};

//! Record types for the inventory store

mod catalog;
mod contact;
mod draft;
mod sale;
mod stock;
mod summary;

pub use catalog::*;
pub use contact::*;
pub use draft::*;
pub use sale::*;
pub use stock::*;
pub use summary::*;

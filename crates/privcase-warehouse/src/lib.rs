//! Privcase Warehouse
//!
//! Warehouse persistence for the privcase pipeline: partition reads,
//! append-only prediction writes with bounded-backoff retry, and the
//! monitoring run logger.

pub mod monitoring;
pub mod retry;
pub mod warehouse;

pub use monitoring::{RunLogger, RunParams};
pub use retry::with_backoff;
pub use warehouse::{JsonlWarehouse, Warehouse};

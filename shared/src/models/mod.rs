//! Data models
//!
//! Shared between the order processing engine and the transport layer.
//! Monetary fields are `rust_decimal::Decimal`; timestamps are Unix
//! milliseconds (`i64`); all record IDs are `i64`.

pub mod customer;
pub mod discount;
pub mod history;
pub mod order;
pub mod stock;

// Re-exports
pub use customer::*;
pub use discount::*;
pub use history::*;
pub use order::*;
pub use stock::*;

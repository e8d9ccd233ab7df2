//! Shared types for the commerce backend
//!
//! Domain models, monetary helpers, and the structured result types
//! exchanged between the order processing engine and its callers.

pub mod models;
pub mod money;
pub mod request;
pub mod response;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

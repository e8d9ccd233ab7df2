//! Customer Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Customer entity, served by the customer directory collaborator.
///
/// The engine never owns customer records; it resolves them at order
/// creation, copies a [`crate::models::CustomerSnapshot`] onto the
/// order, and pushes aggregate stats back through the directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub orders_count: i64,
    pub total_spent: Decimal,
}

//! Request payloads for the order processing service

use crate::models::{OrderSource, OrderStatus, ProductSnapshot, ShippingInfo};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One requested line in an order creation call.
///
/// The caller (transport layer) resolves the catalog entry and supplies
/// the price and product snapshot; the engine captures them as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    pub variant_id: i64,
    pub location_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub product: ProductSnapshot,
    /// Shipping package for the regional fee lookup; falls back to the
    /// workspace default package when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_package_id: Option<i64>,
}

/// Order creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: i64,
    pub shipping: ShippingInfo,
    pub items: Vec<OrderItemRequest>,
    pub payment_method: String,
    #[serde(default)]
    pub source: OrderSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    /// Explicit shipping cost; when absent the per-line package fees are
    /// summed instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_cost: Option<Decimal>,
    /// Tax is computed upstream; defaults to zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<Decimal>,
}

/// One item of a bulk status update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub order_number: String,
    pub new_status: OrderStatus,
}

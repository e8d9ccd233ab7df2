//! Order Model
//!
//! The order aggregate: header, customer/product snapshots, and line
//! items. Snapshot fields are captured once at creation time and are
//! deliberately not live references: an order must stay readable after
//! the catalog entry or customer record behind it changes or disappears.

use crate::money::round_money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    OnHold,
    Processing,
    Unfulfilled,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
    Returned,
}

impl OrderStatus {
    /// All statuses, for exhaustive table checks
    pub const ALL: [OrderStatus; 10] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::OnHold,
        OrderStatus::Processing,
        OrderStatus::Unfulfilled,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
        OrderStatus::Returned,
    ];

    /// Fulfilled statuses trigger fulfillment side effects on entry/exit
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }

    /// Terminal statuses: no further forward progress expected
    /// (corrective reversals are still permitted by the transition table)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered
                | OrderStatus::Cancelled
                | OrderStatus::Refunded
                | OrderStatus::Returned
        )
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Where the order came from. One creation path, parameterized by source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSource {
    #[default]
    Storefront,
    ChatChannel,
    Manual,
}

/// Customer data copied onto the order at creation time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CustomerSnapshot {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Product data copied onto a line item at creation time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProductSnapshot {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// Shipping destination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShippingInfo {
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Region key used for shipping-fee lookup
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// One product/variant line within an order.
///
/// Immutable after creation: `unit_price` and `product` are point-in-time
/// snapshots, immune to later catalog changes. The variant/location refs
/// are weak (the variant may be deleted later); `location_id` is kept so
/// cancellation can restore stock to the exact location it was reserved
/// from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    pub variant_id: i64,
    pub location_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub product: ProductSnapshot,
    /// Shipping package used for the regional fee lookup at creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_package_id: Option<i64>,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Opaque unique order number (generated, collision-checked)
    pub order_number: String,
    pub workspace_id: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,

    // === Monetary fields ===
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    /// `subtotal + shipping_cost + tax_amount - discount_amount`,
    /// re-established by [`Order::recompute_total`] after every mutation
    pub total_amount: Decimal,
    pub currency: String,

    // === Discount reference ===
    /// Weak reference to the applied rule (code lookup, not ownership)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_discount: Option<String>,
    /// Code snapshot for audit, survives rule deletion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,

    // === Customer ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    pub customer: CustomerSnapshot,

    pub shipping: ShippingInfo,
    pub source: OrderSource,
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,

    // === Archival ===
    #[serde(default)]
    pub is_archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,

    pub items: Vec<OrderLineItem>,
}

impl Order {
    /// Restore the totals invariant. The single place where
    /// `total_amount` is derived.
    pub fn recompute_total(&mut self) {
        self.subtotal = round_money(self.items.iter().map(|i| i.line_total).sum());
        self.total_amount = round_money(
            self.subtotal + self.shipping_cost + self.tax_amount - self.discount_amount,
        );
    }

    /// Check the totals invariant without mutating
    pub fn totals_consistent(&self) -> bool {
        self.total_amount
            == round_money(
                self.subtotal + self.shipping_cost + self.tax_amount - self.discount_amount,
            )
    }

    /// Cancellation is only permitted before fulfilment starts and
    /// before money has changed hands.
    pub fn can_be_cancelled(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Confirmed)
            && self.payment_status != PaymentStatus::Paid
    }

    /// Archiving is only permitted from settled terminal states
    pub fn can_be_archived(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }
}

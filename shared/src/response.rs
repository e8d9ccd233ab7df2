//! Structured results returned by the order processing service
//!
//! Every mutating call returns a decidable outcome: a success flag plus
//! either data or a coded error. Partial-failure operations carry
//! itemized detail instead of a single opaque failure.

use crate::models::Order;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Codes are grouped by category:
/// - 0xxx: general / validation
/// - 2xxx: permission
/// - 4xxx: order
/// - 5xxx: payment
/// - 6xxx: stock
/// - 7xxx: discount
/// - 8xxx: customer
/// - 9xxx: system (the only retryable category)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Transition not present in the state machine table
    InvalidTransition = 4002,
    /// Order cannot be cancelled in its current state
    NotCancellable = 4003,
    /// Order is not in an archivable state
    NotArchivable = 4004,
    /// Bulk batch exceeds the hard cap
    BatchTooLarge = 4005,

    // ==================== 5xxx: Payment ====================
    /// Payment already confirmed
    AlreadyPaid = 5001,
    /// Payment is not pending
    PaymentNotPending = 5002,

    // ==================== 6xxx: Stock ====================
    /// Not enough available stock
    InsufficientStock = 6001,

    // ==================== 7xxx: Discount ====================
    /// Discount code unknown
    DiscountNotFound = 7001,
    /// Discount code rejected (expired, ineligible, minimum not met...)
    DiscountRejected = 7002,
    /// Usage limit reached
    DiscountUsageExceeded = 7003,

    // ==================== 8xxx: Customer ====================
    /// Customer not found
    CustomerNotFound = 8001,

    // ==================== 9xxx: System ====================
    /// Storage unavailable or transaction failed (retryable)
    StorageUnavailable = 9001,
    /// Unclassified internal error
    Internal = 9002,
}

impl ErrorCode {
    /// Only infrastructure failures are safe to retry unchanged: the
    /// atomic unit of work guarantees no partial effect was committed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::StorageUnavailable)
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> u16 {
        code as u16
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        use ErrorCode::*;
        let code = match value {
            0 => Success,
            2 => ValidationFailed,
            3 => NotFound,
            7 => RequiredField,
            8 => ValueOutOfRange,
            2001 => PermissionDenied,
            4001 => OrderNotFound,
            4002 => InvalidTransition,
            4003 => NotCancellable,
            4004 => NotArchivable,
            4005 => BatchTooLarge,
            5001 => AlreadyPaid,
            5002 => PaymentNotPending,
            6001 => InsufficientStock,
            7001 => DiscountNotFound,
            7002 => DiscountRejected,
            7003 => DiscountUsageExceeded,
            8001 => CustomerNotFound,
            9001 => StorageUnavailable,
            9002 => Internal,
            other => return Err(format!("unknown error code: {}", other)),
        };
        Ok(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u16)
    }
}

/// Coded error detail carried in a structured result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// One line the stock check could not satisfy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnavailableItem {
    pub variant_id: i64,
    pub location_id: i64,
    pub name: String,
    pub requested: i64,
    pub available: i64,
}

/// Result of a single-order mutating operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    /// Itemized stock shortfalls (order creation only); every
    /// unavailable line is reported, not just the first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_items: Vec<UnavailableItem>,
}

impl OrderResult {
    pub fn ok(order: Order) -> Self {
        Self {
            success: true,
            order: Some(order),
            error: None,
            unavailable_items: Vec::new(),
        }
    }

    pub fn failure(error: ErrorBody) -> Self {
        Self {
            success: false,
            order: None,
            error: Some(error),
            unavailable_items: Vec::new(),
        }
    }

    pub fn insufficient_stock(error: ErrorBody, items: Vec<UnavailableItem>) -> Self {
        Self {
            success: false,
            order: None,
            error: Some(error),
            unavailable_items: items,
        }
    }
}

/// Per-item failure inside a bulk operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkFailure {
    pub order_number: String,
    pub error: ErrorBody,
}

/// Result of a bulk status update: partial success is allowed and
/// reported per item. `error` is set only when the whole batch was
/// rejected (oversized batches are refused outright, never truncated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResult {
    pub successful_count: usize,
    pub failed: Vec<BulkFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl BulkResult {
    pub fn rejected(error: ErrorBody) -> Self {
        Self {
            successful_count: 0,
            failed: Vec::new(),
            error: Some(error),
        }
    }
}

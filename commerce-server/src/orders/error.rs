//! Service error taxonomy
//!
//! Validation, conflict, not-found and authorization errors are
//! business outcomes: they are converted into structured results at
//! the service boundary so callers always receive a decidable answer.
//! Storage errors are the only retryable class and propagate as `Err`
//! to the transport layer: the atomic unit of work guarantees a
//! failed operation committed nothing.

use crate::stock::StockError;
use crate::storage::StorageError;
use shared::models::{OrderStatus, PaymentStatus};
use shared::response::{ErrorBody, ErrorCode, UnavailableItem};
use thiserror::Error;

/// Order processing service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("permission denied for {action}")]
    PermissionDenied { action: String },

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("customer not found: {0}")]
    CustomerNotFound(i64),

    #[error("discount code not found: {0}")]
    DiscountNotFound(String),

    #[error("discount code rejected: {0}")]
    DiscountRejected(String),

    #[error("discount usage limit reached for {code}")]
    DiscountUsageExceeded { code: String },

    #[error("insufficient stock for {} line(s)", .0.len())]
    InsufficientStock(Vec<UnavailableItem>),

    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error(
        "order {order_number} cannot be cancelled (status {status:?}, payment {payment_status:?})"
    )]
    NotCancellable {
        order_number: String,
        status: OrderStatus,
        payment_status: PaymentStatus,
    },

    #[error("order {order_number} is already paid")]
    AlreadyPaid { order_number: String },

    #[error("payment for {order_number} is {payment_status:?}, expected pending")]
    PaymentNotPending {
        order_number: String,
        payment_status: PaymentStatus,
    },

    #[error("order {order_number} is not archivable in status {status:?}")]
    NotArchivable {
        order_number: String,
        status: OrderStatus,
    },

    #[error("batch of {size} exceeds the cap of {cap}")]
    BatchTooLarge { size: usize, cap: usize },
}

impl ServiceError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Map to the wire-level error code
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Storage(_) => ErrorCode::StorageUnavailable,
            ServiceError::Validation { .. } => ErrorCode::ValidationFailed,
            ServiceError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            ServiceError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            ServiceError::CustomerNotFound(_) => ErrorCode::CustomerNotFound,
            ServiceError::DiscountNotFound(_) => ErrorCode::DiscountNotFound,
            ServiceError::DiscountRejected(_) => ErrorCode::DiscountRejected,
            ServiceError::DiscountUsageExceeded { .. } => ErrorCode::DiscountUsageExceeded,
            ServiceError::InsufficientStock(_) => ErrorCode::InsufficientStock,
            ServiceError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            ServiceError::NotCancellable { .. } => ErrorCode::NotCancellable,
            ServiceError::AlreadyPaid { .. } => ErrorCode::AlreadyPaid,
            ServiceError::PaymentNotPending { .. } => ErrorCode::PaymentNotPending,
            ServiceError::NotArchivable { .. } => ErrorCode::NotArchivable,
            ServiceError::BatchTooLarge { .. } => ErrorCode::BatchTooLarge,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody::new(self.code(), self.to_string())
    }
}

impl From<StockError> for ServiceError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Insufficient {
                variant_id,
                location_id,
                requested,
                available,
            } => ServiceError::InsufficientStock(vec![UnavailableItem {
                variant_id,
                location_id,
                name: String::new(),
                requested,
                available,
            }]),
            StockError::NonPositiveQuantity(q) => {
                ServiceError::validation("quantity", format!("must be positive, got {}", q))
            }
            StockError::Storage(e) => ServiceError::Storage(e),
        }
    }
}

impl From<crate::discounts::usage::UsageError> for ServiceError {
    fn from(err: crate::discounts::usage::UsageError) -> Self {
        match err {
            crate::discounts::usage::UsageError::Exceeded { code } => {
                ServiceError::DiscountUsageExceeded { code }
            }
            crate::discounts::usage::UsageError::Storage(e) => ServiceError::Storage(e),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        let err = ServiceError::OrderNotFound("SO1".to_string());
        assert_eq!(err.code(), ErrorCode::OrderNotFound);
        assert!(!err.code().is_retryable());

        let err = ServiceError::validation("items", "must not be empty");
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_stock_error_conversion_keeps_detail() {
        let err: ServiceError = StockError::Insufficient {
            variant_id: 5,
            location_id: 1,
            requested: 3,
            available: 1,
        }
        .into();
        match err {
            ServiceError::InsufficientStock(items) => {
                assert_eq!(items[0].requested, 3);
                assert_eq!(items[0].available, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}

//! Discount Usage Tracker
//!
//! The only mutator of `usage_count` / `total_discount_amount` on a
//! discount rule. Consumption happens at payment confirmation, not at
//! order creation: an unpaid order must never exhaust a limited-use
//! promotion. The increment re-reads the rule inside the caller's
//! write transaction, so two concurrent payments cannot both pass the
//! `usage_count < usage_limit` check before either commits.

use crate::storage::{CommerceStore, StorageError};
use redb::WriteTransaction;
use shared::models::{DiscountRule, DiscountUsage, Order};
use thiserror::Error;

/// Usage tracker errors
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("discount usage limit reached for {code}")]
    Exceeded { code: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Per-customer usage check, backed by the audit rows.
///
/// Returns `(can_use, usage_count)`.
pub fn check_customer_limit(
    store: &CommerceStore,
    rule: &DiscountRule,
    customer_id: i64,
) -> Result<(bool, i64), StorageError> {
    let used = store.count_customer_usage(&rule.code, customer_id)?;
    let can_use = match rule.usage_limit_per_customer {
        Some(limit) => used < limit,
        None => true,
    };
    Ok((can_use, used))
}

/// Consume one use of the order's applied discount.
///
/// Runs inside the payment-confirmation transaction: the audit row and
/// the counter increment commit together with the payment flip, or not
/// at all. In strict mode an exhausted limit is an error; in lenient
/// mode (payment auto-confirmed by a delivery transition) the increment
/// is skipped with a warning and the counter stays capped.
///
/// Returns the updated rule, or `None` when the order has no applied
/// discount, the rule was deleted since creation, or a lenient skip
/// occurred.
pub fn record_usage(
    store: &CommerceStore,
    txn: &WriteTransaction,
    order: &Order,
    now: i64,
    strict: bool,
) -> Result<Option<DiscountRule>, UsageError> {
    let Some(code) = order.applied_discount.as_deref() else {
        return Ok(None);
    };

    // Re-read under the write lock: check-then-act must see the latest
    // committed count.
    let Some(mut rule) = store.get_rule_txn(txn, code)? else {
        // The rule was deleted after the order was created. The order
        // keeps its discount_code snapshot for audit; there is nothing
        // left to count against.
        tracing::warn!(code, order_number = %order.order_number, "applied discount rule no longer exists");
        return Ok(None);
    };

    if let Some(limit) = rule.usage_limit
        && rule.usage_count >= limit
    {
        if strict {
            return Err(UsageError::Exceeded {
                code: code.to_string(),
            });
        }
        tracing::warn!(
            code,
            order_number = %order.order_number,
            usage_count = rule.usage_count,
            "usage limit already reached, skipping increment"
        );
        return Ok(None);
    }

    if let Some(limit) = rule.usage_limit_per_customer
        && let Some(customer_id) = order.customer_id
    {
        let used = store.count_customer_usage_txn(txn, code, customer_id)?;
        if used >= limit {
            if strict {
                return Err(UsageError::Exceeded {
                    code: code.to_string(),
                });
            }
            tracing::warn!(
                code,
                customer_id,
                order_number = %order.order_number,
                "per-customer usage limit already reached, skipping increment"
            );
            return Ok(None);
        }
    }

    rule.usage_count += 1;
    rule.total_discount_amount += order.discount_amount;
    store.put_rule_txn(txn, &rule)?;

    store.append_usage_txn(
        txn,
        &DiscountUsage {
            rule_code: rule.code.clone(),
            order_number: order.order_number.clone(),
            customer_id: order.customer_id,
            order_amount: order.total_amount + order.discount_amount,
            discount_amount: order.discount_amount,
            final_amount: order.total_amount,
            applied_at: now,
        },
    )?;

    Ok(Some(rule))
}

//! Stock Ledger
//!
//! Per (variant, location) quantity records with floor-at-zero
//! protection. Every operation runs inside the caller's write
//! transaction: the check and the conditional write execute under the
//! same lock, and an aborted transaction rolls the whole batch back.

use crate::storage::{CommerceStore, StorageError};
use redb::WriteTransaction;
use shared::models::StockRecord;
use shared::util::now_millis;
use thiserror::Error;

/// Stock ledger errors
#[derive(Debug, Error)]
pub enum StockError {
    #[error("insufficient stock for variant {variant_id} at location {location_id}: requested {requested}, available {available}")]
    Insufficient {
        variant_id: i64,
        location_id: i64,
        requested: i64,
        available: i64,
    },

    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type StockResult<T> = Result<T, StockError>;

/// Load the record for (variant, location), creating a zero-initialized
/// one on first touch
pub fn get_or_create(
    store: &CommerceStore,
    txn: &WriteTransaction,
    variant_id: i64,
    location_id: i64,
) -> StockResult<StockRecord> {
    match store.get_stock_txn(txn, variant_id, location_id)? {
        Some(record) => Ok(record),
        None => {
            let record = StockRecord::new(variant_id, location_id, now_millis());
            store.put_stock_txn(txn, &record)?;
            Ok(record)
        }
    }
}

/// Reserve `quantity` units: fails if available < quantity, otherwise
/// decrements and returns the new available balance.
///
/// Never clamps: a reservation that would drive the balance negative
/// is rejected and leaves the record unchanged.
pub fn reserve(
    store: &CommerceStore,
    txn: &WriteTransaction,
    variant_id: i64,
    location_id: i64,
    quantity: i64,
) -> StockResult<i64> {
    if quantity <= 0 {
        return Err(StockError::NonPositiveQuantity(quantity));
    }
    let mut record = get_or_create(store, txn, variant_id, location_id)?;
    if record.available < quantity {
        return Err(StockError::Insufficient {
            variant_id,
            location_id,
            requested: quantity,
            available: record.available,
        });
    }
    record.available -= quantity;
    record.updated_at = now_millis();
    store.put_stock_txn(txn, &record)?;
    Ok(record.available)
}

/// Restore `quantity` units (cancellation path). Always succeeds and
/// returns the new available balance.
pub fn restore(
    store: &CommerceStore,
    txn: &WriteTransaction,
    variant_id: i64,
    location_id: i64,
    quantity: i64,
) -> StockResult<i64> {
    if quantity <= 0 {
        return Err(StockError::NonPositiveQuantity(quantity));
    }
    let mut record = get_or_create(store, txn, variant_id, location_id)?;
    record.available += quantity;
    record.updated_at = now_millis();
    store.put_stock_txn(txn, &record)?;
    Ok(record.available)
}

/// Inventory adjustment: set the physical on-hand count, preserving
/// outstanding reservations. Uses the same transaction discipline as
/// reserve/restore.
pub fn set_level(
    store: &CommerceStore,
    txn: &WriteTransaction,
    variant_id: i64,
    location_id: i64,
    on_hand: i64,
) -> StockResult<StockRecord> {
    if on_hand < 0 {
        return Err(StockError::NonPositiveQuantity(on_hand));
    }
    let mut record = get_or_create(store, txn, variant_id, location_id)?;
    let reserved = record.reserved();
    record.on_hand = on_hand;
    record.available = (on_hand - reserved).max(0);
    record.updated_at = now_millis();
    store.put_stock_txn(txn, &record)?;
    Ok(record)
}

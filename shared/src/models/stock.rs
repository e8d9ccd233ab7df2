//! Stock Record Model

use serde::{Deserialize, Serialize};

/// Condition tag for a stock record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockCondition {
    #[default]
    Sellable,
    Damaged,
}

/// Quantity of one variant at one location.
///
/// Invariants: `available <= on_hand`, both non-negative. Reservations
/// decrement `available` only; the physical count drops when the goods
/// actually leave the warehouse, which is outside this ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockRecord {
    pub variant_id: i64,
    pub location_id: i64,
    /// Physical on-hand quantity
    pub on_hand: i64,
    /// Quantity still available to sell (on_hand minus reservations)
    pub available: i64,
    pub condition: StockCondition,
    pub updated_at: i64,
}

impl StockRecord {
    /// Zero-initialized record, created lazily on first touch
    pub fn new(variant_id: i64, location_id: i64, now: i64) -> Self {
        Self {
            variant_id,
            location_id,
            on_hand: 0,
            available: 0,
            condition: StockCondition::Sellable,
            updated_at: now,
        }
    }

    /// Units currently reserved against this record
    pub fn reserved(&self) -> i64 {
        self.on_hand - self.available
    }
}

//! redb-based storage layer for the order processing engine
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_number` | `Order` | Order aggregate (line items embedded) |
//! | `stock` | `"{variant}:{location}"` | `StockRecord` | Stock ledger |
//! | `discount_rules` | normalized code | `DiscountRule` | Promotional rules |
//! | `discount_usage` | `(code, seq)` | `DiscountUsage` | Usage audit rows (append-only) |
//! | `history` | `(order_number, seq)` | `HistoryEntry` | Order history (append-only) |
//! | `comments` | `(order_number, seq)` | `OrderComment` | Free-text comments |
//! | `counters` | name | `u64` | Order/history/usage counters |
//!
//! # Atomicity
//!
//! One `WriteTransaction` per service operation is the atomic unit of
//! work. redb allows a single writer at a time, so every
//! check-then-act sequence inside a transaction runs while holding the
//! write lock; two concurrent callers can never both observe the same
//! stale balance. A transaction dropped without `commit()` leaves zero
//! observable side effects.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::models::{
    DiscountRule, DiscountUsage, HistoryAction, HistoryEntry, Order, OrderComment, StockRecord,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Orders: key = order_number, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Stock ledger: key = "{variant_id}:{location_id}", value = JSON-serialized StockRecord
const STOCK_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("stock");

/// Discount rules: key = normalized code, value = JSON-serialized DiscountRule
const DISCOUNT_RULES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("discount_rules");

/// Discount usage audit rows: key = (rule code, usage seq), append-only
const DISCOUNT_USAGE_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("discount_usage");

/// Order history: key = (order_number, seq), append-only
const HISTORY_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("history");

/// Order comments: key = (order_number, seq)
const COMMENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("comments");

/// Counters: key = counter name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const ORDER_COUNT_KEY: &str = "order_count";
/// History and comments share one sequence so the merged timeline has
/// a total order even inside the same millisecond
const TIMELINE_SEQ_KEY: &str = "timeline_seq";
const USAGE_SEQ_KEY: &str = "usage_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Composite key for the stock ledger
fn stock_key(variant_id: i64, location_id: i64) -> String {
    format!("{}:{}", variant_id, location_id)
}

/// Commerce store backed by redb
#[derive(Clone)]
pub struct CommerceStore {
    db: Arc<Database>,
}

impl CommerceStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Create all tables so later read transactions never see a missing table
    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(STOCK_TABLE)?;
            let _ = write_txn.open_table(DISCOUNT_RULES_TABLE)?;
            let _ = write_txn.open_table(DISCOUNT_USAGE_TABLE)?;
            let _ = write_txn.open_table(HISTORY_TABLE)?;
            let _ = write_txn.open_table(COMMENTS_TABLE)?;
            let _ = write_txn.open_table(COUNTERS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction: the atomic unit of work.
    ///
    /// Blocks until any other writer commits or aborts.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Counters ==========

    /// Increment and return the named counter (within a transaction)
    fn next_counter(&self, txn: &WriteTransaction, key: &str) -> StorageResult<u64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table.get(key)?.map(|g| g.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(key, next)?;
        Ok(next)
    }

    /// Next order counter value, used for order number generation
    pub fn next_order_count(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        self.next_counter(txn, ORDER_COUNT_KEY)
    }

    // ========== Orders ==========

    /// Load an order inside a write transaction
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_number: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_number)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Persist an order inside a write transaction
    pub fn put_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let bytes = serde_json::to_vec(order)?;
        let mut table = txn.open_table(ORDERS_TABLE)?;
        table.insert(order.order_number.as_str(), bytes.as_slice())?;
        Ok(())
    }

    /// Check order number existence (collision check on generation)
    pub fn order_exists_txn(
        &self,
        txn: &WriteTransaction,
        order_number: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(ORDERS_TABLE)?;
        Ok(table.get(order_number)?.is_some())
    }

    /// Load an order (read-only)
    pub fn get_order(&self, order_number: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_number)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Stock ==========

    /// Load a stock record inside a write transaction
    pub fn get_stock_txn(
        &self,
        txn: &WriteTransaction,
        variant_id: i64,
        location_id: i64,
    ) -> StorageResult<Option<StockRecord>> {
        let key = stock_key(variant_id, location_id);
        let table = txn.open_table(STOCK_TABLE)?;
        match table.get(key.as_str())? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Persist a stock record inside a write transaction
    pub fn put_stock_txn(&self, txn: &WriteTransaction, record: &StockRecord) -> StorageResult<()> {
        let key = stock_key(record.variant_id, record.location_id);
        let bytes = serde_json::to_vec(record)?;
        let mut table = txn.open_table(STOCK_TABLE)?;
        table.insert(key.as_str(), bytes.as_slice())?;
        Ok(())
    }

    /// Load a stock record (read-only)
    pub fn get_stock(
        &self,
        variant_id: i64,
        location_id: i64,
    ) -> StorageResult<Option<StockRecord>> {
        let key = stock_key(variant_id, location_id);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STOCK_TABLE)?;
        match table.get(key.as_str())? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Discount rules ==========

    /// Load a rule by normalized code inside a write transaction
    pub fn get_rule_txn(
        &self,
        txn: &WriteTransaction,
        code: &str,
    ) -> StorageResult<Option<DiscountRule>> {
        let table = txn.open_table(DISCOUNT_RULES_TABLE)?;
        match table.get(code)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Persist a rule inside a write transaction
    pub fn put_rule_txn(&self, txn: &WriteTransaction, rule: &DiscountRule) -> StorageResult<()> {
        let bytes = serde_json::to_vec(rule)?;
        let mut table = txn.open_table(DISCOUNT_RULES_TABLE)?;
        table.insert(rule.code.as_str(), bytes.as_slice())?;
        Ok(())
    }

    /// Persist a rule in its own transaction (administrative seeding)
    pub fn put_rule(&self, rule: &DiscountRule) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.put_rule_txn(&txn, rule)?;
        txn.commit()?;
        Ok(())
    }

    /// Load a rule by normalized code (read-only)
    pub fn get_rule(&self, code: &str) -> StorageResult<Option<DiscountRule>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DISCOUNT_RULES_TABLE)?;
        match table.get(code)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Discount usage ==========

    /// Append a usage audit row inside a write transaction
    pub fn append_usage_txn(
        &self,
        txn: &WriteTransaction,
        usage: &DiscountUsage,
    ) -> StorageResult<()> {
        let seq = self.next_counter(txn, USAGE_SEQ_KEY)?;
        let bytes = serde_json::to_vec(usage)?;
        let mut table = txn.open_table(DISCOUNT_USAGE_TABLE)?;
        table.insert((usage.rule_code.as_str(), seq), bytes.as_slice())?;
        Ok(())
    }

    /// Count usage rows for (rule, customer) inside a write transaction
    pub fn count_customer_usage_txn(
        &self,
        txn: &WriteTransaction,
        code: &str,
        customer_id: i64,
    ) -> StorageResult<i64> {
        let table = txn.open_table(DISCOUNT_USAGE_TABLE)?;
        let mut count = 0;
        for entry in table.range((code, 0)..=(code, u64::MAX))? {
            let (_, value) = entry?;
            let usage: DiscountUsage = serde_json::from_slice(value.value())?;
            if usage.customer_id == Some(customer_id) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// All usage rows for a rule (read-only, audit views and tests)
    pub fn usage_for_rule(&self, code: &str) -> StorageResult<Vec<DiscountUsage>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DISCOUNT_USAGE_TABLE)?;
        let mut rows = Vec::new();
        for entry in table.range((code, 0)..=(code, u64::MAX))? {
            let (_, value) = entry?;
            rows.push(serde_json::from_slice(value.value())?);
        }
        Ok(rows)
    }

    /// Count usage rows for (rule, customer) (read-only)
    pub fn count_customer_usage(&self, code: &str, customer_id: i64) -> StorageResult<i64> {
        Ok(self
            .usage_for_rule(code)?
            .iter()
            .filter(|u| u.customer_id == Some(customer_id))
            .count() as i64)
    }

    // ========== History and comments ==========

    /// Append a history entry inside a write transaction
    pub fn append_history_txn(
        &self,
        txn: &WriteTransaction,
        order_number: &str,
        action: HistoryAction,
        details: serde_json::Value,
        actor: Option<String>,
        now: i64,
    ) -> StorageResult<HistoryEntry> {
        let seq = self.next_counter(txn, TIMELINE_SEQ_KEY)?;
        let entry = HistoryEntry {
            seq,
            order_number: order_number.to_string(),
            action,
            details,
            actor,
            created_at: now,
        };
        let bytes = serde_json::to_vec(&entry)?;
        let mut table = txn.open_table(HISTORY_TABLE)?;
        table.insert((order_number, seq), bytes.as_slice())?;
        Ok(entry)
    }

    /// All history entries for an order (read-only, ascending seq)
    pub fn history_for_order(&self, order_number: &str) -> StorageResult<Vec<HistoryEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORY_TABLE)?;
        let mut rows = Vec::new();
        for entry in table.range((order_number, 0)..=(order_number, u64::MAX))? {
            let (_, value) = entry?;
            rows.push(serde_json::from_slice(value.value())?);
        }
        Ok(rows)
    }

    /// Append a comment inside a write transaction
    pub fn append_comment_txn(
        &self,
        txn: &WriteTransaction,
        order_number: &str,
        author: String,
        body: String,
        now: i64,
    ) -> StorageResult<OrderComment> {
        let seq = self.next_counter(txn, TIMELINE_SEQ_KEY)?;
        let comment = OrderComment {
            seq,
            order_number: order_number.to_string(),
            author,
            body,
            created_at: now,
        };
        let bytes = serde_json::to_vec(&comment)?;
        let mut table = txn.open_table(COMMENTS_TABLE)?;
        table.insert((order_number, seq), bytes.as_slice())?;
        Ok(comment)
    }

    /// All comments for an order (read-only, ascending seq)
    pub fn comments_for_order(&self, order_number: &str) -> StorageResult<Vec<OrderComment>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COMMENTS_TABLE)?;
        let mut rows = Vec::new();
        for entry in table.range((order_number, 0)..=(order_number, u64::MAX))? {
            let (_, value) = entry?;
            rows.push(serde_json::from_slice(value.value())?);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::StockRecord;

    #[test]
    fn test_uncommitted_transaction_leaves_no_trace() {
        let store = CommerceStore::open_in_memory().unwrap();
        {
            let txn = store.begin_write().unwrap();
            let record = StockRecord {
                variant_id: 1,
                location_id: 1,
                on_hand: 5,
                available: 5,
                condition: Default::default(),
                updated_at: 0,
            };
            store.put_stock_txn(&txn, &record).unwrap();
            // txn dropped without commit
        }
        assert!(store.get_stock(1, 1).unwrap().is_none());
    }

    #[test]
    fn test_stock_roundtrip() {
        let store = CommerceStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let record = StockRecord {
            variant_id: 7,
            location_id: 2,
            on_hand: 10,
            available: 8,
            condition: Default::default(),
            updated_at: 123,
        };
        store.put_stock_txn(&txn, &record).unwrap();
        txn.commit().unwrap();

        let loaded = store.get_stock(7, 2).unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(store.get_stock(7, 3).unwrap().is_none());
    }

    #[test]
    fn test_counters_are_monotonic() {
        let store = CommerceStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let a = store.next_order_count(&txn).unwrap();
        let b = store.next_order_count(&txn).unwrap();
        txn.commit().unwrap();
        assert_eq!(b, a + 1);
    }

    #[test]
    fn test_usage_rows_scoped_by_rule() {
        let store = CommerceStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        for (code, customer) in [("A", 1), ("A", 2), ("B", 1)] {
            let usage = shared::models::DiscountUsage {
                rule_code: code.to_string(),
                order_number: "SO1".to_string(),
                customer_id: Some(customer),
                order_amount: Decimal::ZERO,
                discount_amount: Decimal::ZERO,
                final_amount: Decimal::ZERO,
                applied_at: 0,
            };
            store.append_usage_txn(&txn, &usage).unwrap();
        }
        txn.commit().unwrap();

        assert_eq!(store.usage_for_rule("A").unwrap().len(), 2);
        assert_eq!(store.usage_for_rule("B").unwrap().len(), 1);
        assert_eq!(store.count_customer_usage("A", 1).unwrap(), 1);
        assert_eq!(store.count_customer_usage("C", 1).unwrap(), 0);
    }
}

//! Order History Model
//!
//! Append-only audit trail per order, plus free-text comments. The
//! timeline view merges both, newest first.

use serde::{Deserialize, Serialize};

/// History entry action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Created,
    StatusChanged,
    Fulfilled,
    Unfulfilled,
    Cancelled,
    PaymentConfirmed,
    Archived,
    Unarchived,
}

/// One append-only history row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// Per-order sequence, assigned by the store
    pub seq: u64,
    pub order_number: String,
    pub action: HistoryAction,
    /// Action-specific details blob
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub created_at: i64,
}

/// Free-text comment attached to an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderComment {
    pub seq: u64,
    pub order_number: String,
    pub author: String,
    pub body: String,
    pub created_at: i64,
}

/// Merged timeline view: history entries and comments, sorted
/// descending by time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind")]
pub enum TimelineEntry {
    History(HistoryEntry),
    Comment(OrderComment),
}

impl TimelineEntry {
    pub fn created_at(&self) -> i64 {
        match self {
            TimelineEntry::History(h) => h.created_at,
            TimelineEntry::Comment(c) => c.created_at,
        }
    }

    /// Tiebreaker for entries created in the same millisecond
    pub fn seq(&self) -> u64 {
        match self {
            TimelineEntry::History(h) => h.seq,
            TimelineEntry::Comment(c) => c.seq,
        }
    }
}

//! Order timeline
//!
//! History entries are append-only audit rows; comments are free text.
//! The timeline view merges both, newest first, with the append
//! sequence as a tiebreaker inside the same millisecond.

use shared::models::{HistoryEntry, OrderComment, TimelineEntry};

/// Merge history entries and comments into a descending timeline
pub fn merge_timeline(
    history: Vec<HistoryEntry>,
    comments: Vec<OrderComment>,
) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = history
        .into_iter()
        .map(TimelineEntry::History)
        .chain(comments.into_iter().map(TimelineEntry::Comment))
        .collect();
    entries.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then(b.seq().cmp(&a.seq()))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::HistoryAction;

    fn history(seq: u64, at: i64) -> HistoryEntry {
        HistoryEntry {
            seq,
            order_number: "SO1".to_string(),
            action: HistoryAction::Created,
            details: serde_json::json!({}),
            actor: None,
            created_at: at,
        }
    }

    fn comment(seq: u64, at: i64) -> OrderComment {
        OrderComment {
            seq,
            order_number: "SO1".to_string(),
            author: "ops".to_string(),
            body: "note".to_string(),
            created_at: at,
        }
    }

    #[test]
    fn test_merged_timeline_is_descending() {
        let merged = merge_timeline(
            vec![history(1, 100), history(3, 300)],
            vec![comment(2, 200)],
        );
        let times: Vec<i64> = merged.iter().map(|e| e.created_at()).collect();
        assert_eq!(times, vec![300, 200, 100]);
    }

    #[test]
    fn test_same_millisecond_breaks_by_seq() {
        let merged = merge_timeline(vec![history(1, 100)], vec![comment(2, 100)]);
        assert_eq!(merged[0].seq(), 2);
        assert_eq!(merged[1].seq(), 1);
    }
}

//! Order lifecycle state machine
//!
//! The transition table is authoritative: any (from, to) pair not
//! listed fails with `InvalidTransition` and leaves the order
//! untouched. Several edges deliberately reverse "terminal" states -
//! operator error-correction paths (a mistaken refund can be walked
//! back to delivered). Reversals never re-run stock or refund side
//! effects; only the fulfillment history events follow from the
//! fulfilled/unfulfilled boundary crossing.

use shared::models::OrderStatus;

/// Allowed targets per source status
pub fn allowed_targets(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        Pending => &[
            Confirmed,
            Processing,
            OnHold,
            Cancelled,
            Delivered,
            Unfulfilled,
            Shipped,
        ],
        Confirmed => &[Processing, OnHold, Cancelled, Unfulfilled],
        Processing => &[Shipped, Delivered, OnHold, Cancelled, Unfulfilled],
        // Reversible to processing: correction path
        Shipped => &[Delivered, OnHold, Cancelled, Unfulfilled, Processing],
        Delivered => &[Refunded, Returned, Unfulfilled, OnHold, Shipped],
        OnHold => &[
            Pending,
            Confirmed,
            Processing,
            Shipped,
            Delivered,
            Cancelled,
            Unfulfilled,
        ],
        Unfulfilled => &[
            Pending,
            Confirmed,
            Processing,
            Shipped,
            Delivered,
            OnHold,
            Cancelled,
        ],
        // Explicit "undo mistake" paths
        Cancelled => &[Unfulfilled, Pending],
        Refunded => &[Unfulfilled, Delivered, Returned],
        Returned => &[Unfulfilled, Delivered, Refunded],
    }
}

/// Is `from -> to` present in the transition table?
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    allowed_targets(from).contains(&to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OrderStatus::*;

    #[test]
    fn test_forward_progression() {
        assert!(can_transition(Pending, Confirmed));
        assert!(can_transition(Confirmed, Processing));
        assert!(can_transition(Processing, Shipped));
        assert!(can_transition(Shipped, Delivered));
    }

    #[test]
    fn test_pending_can_skip_straight_to_shipped() {
        assert!(can_transition(Pending, Shipped));
        assert!(can_transition(Pending, Delivered));
    }

    #[test]
    fn test_correction_paths() {
        assert!(can_transition(Shipped, Processing));
        assert!(can_transition(Delivered, Shipped));
        assert!(can_transition(Refunded, Delivered));
        assert!(can_transition(Returned, Refunded));
        assert!(can_transition(Cancelled, Pending));
    }

    #[test]
    fn test_rejected_edges() {
        assert!(!can_transition(Cancelled, Shipped));
        assert!(!can_transition(Delivered, Pending));
        assert!(!can_transition(Confirmed, Shipped));
        assert!(!can_transition(Refunded, Pending));
        assert!(!can_transition(Shipped, Confirmed));
    }

    #[test]
    fn test_no_self_transitions() {
        for status in OrderStatus::ALL {
            assert!(
                !can_transition(status, status),
                "{status:?} must not transition to itself"
            );
        }
    }

    #[test]
    fn test_every_status_has_an_exit() {
        for status in OrderStatus::ALL {
            assert!(
                !allowed_targets(status).is_empty(),
                "{status:?} has no outgoing edges"
            );
        }
    }
}

//! Small helpers for identifier generation and the remark audit trail.
use chrono::Utc;

use crate::db_types::OrderId;

/// Generates a fresh, human-readable order id, e.g. `ORD-1718020800123-9F3A1C07`.
///
/// The millisecond timestamp keeps ids roughly sortable; the random suffix makes collisions within the same
/// millisecond vanishingly unlikely.
pub fn generate_order_id() -> OrderId {
    let millis = Utc::now().timestamp_millis();
    let suffix = format!("{:08X}", rand::random::<u32>());
    OrderId(format!("ORD-{millis}-{suffix}"))
}

/// Generates an opaque identifier for a line item.
pub fn generate_item_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Appends an entry to the `|`-delimited remark trail. The existing trail is never rewritten.
pub fn append_remark(existing: &str, entry: &str) -> String {
    if existing.is_empty() {
        entry.to_string()
    } else {
        format!("{existing} | {entry}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_ids_are_unique_and_prefixed() {
        let a = generate_order_id();
        let b = generate_order_id();
        assert!(a.as_str().starts_with("ORD-"));
        assert_ne!(a, b);
    }

    #[test]
    fn remark_trail_is_pipe_delimited() {
        let trail = append_remark("", "Payment Status: processing");
        assert_eq!(trail, "Payment Status: processing");
        let trail = append_remark(&trail, "Payment Status: succeeded");
        assert_eq!(trail, "Payment Status: processing | Payment Status: succeeded");
    }
}

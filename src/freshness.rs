//! Staleness guard for batch timestamps.
//!
//! Slow or backlogged downstream processing makes later arrivals
//! self-discard instead of queueing: every stage checks the batch's
//! embedded `timestamp` against its own expiry window and drops the
//! batch when the age exceeds it. Dropping is throttling, not an error.

use crate::event::{timestamp_of, ValueEntry};

/// Check a batch against an expiry window, stamping a timestamp if absent.
///
/// A batch without a `timestamp` entry gets one appended (equal to
/// `now_ms`) and is always fresh on first sight. Otherwise the batch is
/// fresh iff its age is within `max_age_ms`.
pub fn check_fresh(values: &mut Vec<ValueEntry>, now_ms: i64, max_age_ms: i64) -> bool {
    match timestamp_of(values) {
        None => {
            values.push(ValueEntry::new("timestamp", now_ms));
            true
        }
        Some(timestamp) => now_ms - timestamp <= max_age_ms,
    }
}

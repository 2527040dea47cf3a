use crate::dispatch::Decision;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatch outcome counters.
///
/// Injected into the dispatcher (shared via `Arc`) rather than living
/// in process-wide mutable state; informational only, nothing in the
/// pipeline depends on these values.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    geolocate: AtomicU64,
    transform: AtomicU64,
    deliver: AtomicU64,
    expired: AtomicU64,
    skipped: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one dispatcher decision.
    pub fn record(&self, decision: Decision) {
        let counter = match decision {
            Decision::Geolocate => &self.geolocate,
            Decision::Transform => &self.transform,
            Decision::Deliver => &self.deliver,
            Decision::Expired => &self.expired,
            Decision::Skip => &self.skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            geolocate: self.geolocate.load(Ordering::Relaxed),
            transform: self.transform.load(Ordering::Relaxed),
            deliver: self.deliver.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatch counters at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub geolocate: u64,
    pub transform: u64,
    pub deliver: u64,
    pub expired: u64,
    pub skipped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_record_per_decision() {
        let metrics = DispatchMetrics::new();
        metrics.record(Decision::Geolocate);
        metrics.record(Decision::Transform);
        metrics.record(Decision::Transform);
        metrics.record(Decision::Expired);

        let snap = metrics.snapshot();
        assert_eq!(snap.geolocate, 1);
        assert_eq!(snap.transform, 2);
        assert_eq!(snap.deliver, 0);
        assert_eq!(snap.expired, 1);
        assert_eq!(snap.skipped, 0);
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = Arc::new(DispatchMetrics::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let metrics = Arc::clone(&metrics);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    metrics.record(Decision::Deliver);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.snapshot().deliver, 800);
    }
}

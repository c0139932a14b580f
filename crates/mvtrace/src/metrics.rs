//! Tracer health counters.
//!
//! All counters are atomic for lock-free updates from the hot path. They
//! count what the tracer did with operations, not what the transactions did;
//! the trace itself is the only record of the latter.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::op::OpKind;

#[derive(Debug, Default)]
pub struct TraceMetrics {
    /// BEGIN records written to the sink.
    pub begins: AtomicU64,
    /// COMMIT records written to the sink.
    pub commits: AtomicU64,
    /// READ records written to the sink.
    pub reads: AtomicU64,
    /// WRITE records written to the sink.
    pub writes: AtomicU64,
    /// Reads/writes dropped because their row id was never bound.
    pub dropped_unknown_row: AtomicU64,
    /// Operations dropped because an allocation failed.
    pub dropped_oom: AtomicU64,
    /// Complete operations released without output (emission disabled).
    pub suppressed: AtomicU64,
    /// Lines the sink failed to accept.
    pub sink_errors: AtomicU64,
    /// Lines whose value or body was cut short at its capacity.
    pub truncated: AtomicU64,
}

impl TraceMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a record written to the sink.
    pub fn record_emitted(&self, kind: OpKind) {
        let counter = match kind {
            OpKind::Begin => &self.begins,
            OpKind::Commit => &self.commits,
            OpKind::Read => &self.reads,
            OpKind::Write => &self.writes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Total records written to the sink.
    #[must_use]
    pub fn emitted_total(&self) -> u64 {
        self.begins.load(Ordering::Relaxed)
            + self.commits.load(Ordering::Relaxed)
            + self.reads.load(Ordering::Relaxed)
            + self.writes.load(Ordering::Relaxed)
    }


    #[must_use]
    pub fn snapshot(&self) -> TraceMetricsSnapshot {
        TraceMetricsSnapshot {
            begins: self.begins.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            dropped_unknown_row: self.dropped_unknown_row.load(Ordering::Relaxed),
            dropped_oom: self.dropped_oom.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
        }
    }
}

/// Serializable snapshot of [`TraceMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceMetricsSnapshot {
    pub begins: u64,
    pub commits: u64,
    pub reads: u64,
    pub writes: u64,
    pub dropped_unknown_row: u64,
    pub dropped_oom: u64,
    pub suppressed: u64,
    pub sink_errors: u64,
    pub truncated: u64,
}

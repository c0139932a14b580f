//! Destructive emission of operation records.
//!
//! [`Emitter::emit`] is the only place a [`TransactionOp`] is released. It
//! takes the record by value, renders it into a fixed stack buffer, hands the
//! complete line to the sink in one call, and drops the record together with
//! any [`Value`](crate::Value) it owns. Every outcome, written or not,
//! consumes the record.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mvtrace_error::Result;
use tracing::{debug, info, warn};

use crate::config::TraceConfig;
use crate::metrics::TraceMetrics;
use crate::op::TransactionOp;
use crate::render::{BoundedBuf, LINE_CAPACITY};
use crate::sink::{NoOpSink, TraceSink};

/// What happened to an emitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// The line reached the sink.
    Written,
    /// Output is disabled; the record was released unwritten.
    Suppressed,
    /// The record lacked its row id and was released unwritten.
    DroppedUnknownRow,
    /// The sink rejected the line.
    SinkError,
}

pub struct Emitter {
    sink: Arc<dyn TraceSink>,
    enabled: AtomicBool,
    metrics: TraceMetrics,
}

impl Emitter {
    /// An enabled emitter writing to `sink`.
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self {
            sink,
            enabled: AtomicBool::new(true),
            metrics: TraceMetrics::new(),
        }
    }

    /// The default emitter: no-op sink, output disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            sink: Arc::new(NoOpSink),
            enabled: AtomicBool::new(false),
            metrics: TraceMetrics::new(),
        }
    }

    /// Build the sink described by `config` and wrap it.
    pub fn from_config(config: &TraceConfig) -> Result<Self> {
        let sink = config.build_sink()?;
        info!(
            target: "mvtrace",
            output = config.output.label(),
            enabled = config.enabled,
            "trace emitter configured"
        );
        let emitter = Self::new(sink);
        emitter.set_enabled(config.enabled);
        Ok(emitter)
    }

    /// Turn output on or off. Meant to be set once at startup; flipping it
    /// while sessions run only affects emissions that start afterwards.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed) && !self.sink.is_noop()
    }

    #[must_use]
    pub fn sink(&self) -> &Arc<dyn TraceSink> {
        &self.sink
    }

    #[must_use]
    pub fn metrics(&self) -> &TraceMetrics {
        &self.metrics
    }

    /// Render `op` to the sink and release it.
    pub fn emit(&self, op: TransactionOp) -> EmitOutcome {
        if !op.is_reportable() {
            TraceMetrics::bump(&self.metrics.dropped_unknown_row);
            debug!(
                target: "mvtrace",
                txn = op.txn().get(),
                kind = %op.kind(),
                "dropping operation with unbound row id"
            );
            return EmitOutcome::DroppedUnknownRow;
        }
        if !self.is_enabled() {
            TraceMetrics::bump(&self.metrics.suppressed);
            return EmitOutcome::Suppressed;
        }

        let mut line = BoundedBuf::<LINE_CAPACITY>::new();
        if op.render_line(&mut line) {
            TraceMetrics::bump(&self.metrics.truncated);
        }

        match self.sink.write_line(line.as_str()) {
            Ok(()) => {
                self.metrics.record_emitted(op.kind());
                EmitOutcome::Written
            }
            Err(e) => {
                TraceMetrics::bump(&self.metrics.sink_errors);
                warn!(target: "mvtrace", error = %e, kind = %op.kind(), "trace sink write failed");
                EmitOutcome::SinkError
            }
        }
    }

    /// Flush the sink, logging rather than returning failures.
    pub fn flush(&self) {
        if let Err(e) = self.sink.flush() {
            TraceMetrics::bump(&self.metrics.sink_errors);
            warn!(target: "mvtrace", error = %e, "trace sink flush failed");
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("enabled", &self.is_enabled())
            .field("emitted", &self.metrics.emitted_total())
            .finish_non_exhaustive()
    }
}

//! Transaction-history tracer for a bytecode-driven storage engine.
//!
//! The engine reports every instruction it executes; the tracer turns that
//! low-level stream into one line per logical operation:
//!
//! ```text
//! Op: BEGIN	 Tx: 1
//! Op: READ	 Tx: 1	 Obj: 2
//! Op: WRITE	 Tx: 1	 Obj: 2 	 wVal: 76000
//! Op: COMMIT	 Tx: 1
//! ```
//!
//! Layers, bottom up:
//!
//! - [`Value`] and [`TransactionOp`]: owned operation records built by the
//!   `track_*` factory functions.
//! - [`Emitter`]: the single place a record is rendered and released.
//! - [`is_cursor_movement`] and its siblings: the four instruction predicates.
//! - [`TraceState`] / [`SessionTable`]: per-session buffering of the
//!   current row's read and write.
//! - [`Interceptor`]: the engine-facing hooks tying these together.
//!
//! Tracing is observational. Nothing here returns an error into the engine's
//! instruction loop; allocation failures, unknown row ids, and sink errors
//! become dropped operations, visible through [`TraceMetrics`] and `tracing`
//! events under the `mvtrace` target.

pub mod classify;
pub mod config;
pub mod emitter;
pub mod interceptor;
pub mod metrics;
pub mod op;
pub mod record;
pub mod render;
pub mod sink;
pub mod state;
pub mod value;

pub use classify::{
    CURSOR_MOVEMENTS, InstructionClass, NamedInstruction, classify, is_autocommit_op,
    is_column_op, is_cursor_movement, is_row_id_op,
};
pub use config::{TraceConfig, TraceOutput};
pub use emitter::{EmitOutcome, Emitter};
pub use interceptor::{Interceptor, SessionTracer};
pub use metrics::{TraceMetrics, TraceMetricsSnapshot};
pub use mvtrace_error::{Result, TraceError};
pub use mvtrace_types::{Instruction, Opcode, RowId, TxnId, VdbeOp};
pub use op::{OpKind, TransactionOp, track_begin, track_end, track_read, track_write};
pub use record::TraceRecord;
pub use render::{BoundedBuf, Escaped, LINE_CAPACITY, VALUE_CAPACITY};
pub use sink::{NoOpSink, RingBufferSink, StdStreamSink, TraceSink, WriterSink};
pub use state::{SessionTable, TraceState};
pub use value::Value;

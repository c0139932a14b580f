//! The engine-facing entry point.
//!
//! The engine calls [`Interceptor::on_instruction`] once per executed
//! instruction, [`Interceptor::on_row_id_bound`] whenever the active cursor's
//! row id becomes known, and [`Interceptor::intercept_write`] from its
//! insert/update path. Every call runs synchronously on the engine's thread,
//! never blocks on anything but a per-shard session lock and the sink, and
//! never returns an error: failures degrade to dropped operations that are
//! logged and counted.
//!
//! Per-instruction behavior:
//!
//! | Instruction      | Action                                                    |
//! |------------------|-----------------------------------------------------------|
//! | cursor movement  | take the session's state, emit pending READ then WRITE    |
//! | column           | ensure state, start a READ unless one is pending          |
//! | autocommit       | emit COMMIT (`p1 != 0`) or BEGIN (`p1 == 0`) immediately  |
//! | rowid            | ensure state                                              |
//! | anything else    | nothing                                                   |

use mvtrace_error::Result;
use mvtrace_types::{Instruction, RowId, TxnId};
use tracing::{debug, warn};

use crate::classify::{InstructionClass, classify};
use crate::config::TraceConfig;
use crate::emitter::Emitter;
use crate::metrics::TraceMetrics;
use crate::op::{track_begin, track_end, track_write};
use crate::state::{SessionTable, TraceState};
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Interceptor {
    sessions: SessionTable,
    emitter: Emitter,
}

impl Interceptor {
    #[must_use]
    pub fn new(emitter: Emitter) -> Self {
        Self {
            sessions: SessionTable::new(),
            emitter,
        }
    }

    pub fn from_config(config: &TraceConfig) -> Result<Self> {
        Ok(Self::new(Emitter::from_config(config)?))
    }

    #[must_use]
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    #[must_use]
    pub fn metrics(&self) -> &TraceMetrics {
        self.emitter.metrics()
    }

    /// Sessions currently holding buffered state.
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.sessions.live_sessions()
    }

    /// Observe one executed instruction of session `txn`.
    pub fn on_instruction<I: Instruction + ?Sized>(&self, txn: TxnId, insn: &I) {
        match classify(insn) {
            InstructionClass::CursorMovement => {
                if let Some(state) = self.sessions.take(txn) {
                    self.flush(state);
                }
            }
            InstructionClass::Column => {
                self.sessions.with_state(txn, |state| state.begin_read(txn));
            }
            InstructionClass::AutoCommit { enabled } => {
                let op = if enabled {
                    track_end(txn)
                } else {
                    track_begin(txn)
                };
                self.emitter.emit(op);
            }
            InstructionClass::RowId => {
                self.sessions.with_state(txn, |_| ());
            }
            InstructionClass::Other => {}
        }
    }

    /// The engine established which row session `txn`'s cursor refers to.
    pub fn on_row_id_bound(&self, txn: TxnId, row: RowId) {
        self.sessions
            .with_state(txn, |state| state.bind_row_id(row));
    }

    /// Emit a WRITE of `rendered` to `object` immediately, bypassing any
    /// buffered state of the session.
    pub fn intercept_write<I: Instruction + ?Sized>(
        &self,
        txn: TxnId,
        insn: &I,
        object: RowId,
        rendered: &str,
    ) {
        match Value::try_text(rendered) {
            Ok(value) => {
                self.emitter.emit(track_write(txn, object, value));
            }
            Err(e) => {
                TraceMetrics::bump(&self.metrics().dropped_oom);
                warn!(
                    target: "mvtrace",
                    txn = txn.get(),
                    object = object.get(),
                    opcode = ?insn.opcode(),
                    error = %e,
                    "dropping write"
                );
            }
        }
    }

    /// Buffer a WRITE of `value` to session `txn`'s current row, flushed
    /// after the pending READ at the next cursor movement.
    pub fn stage_write(&self, txn: TxnId, value: Value) {
        let displaced = self
            .sessions
            .with_state(txn, |state| state.stage_write(txn, value));
        if let Some(op) = displaced {
            self.emitter.emit(op);
        }
    }

    /// End session `txn`: pending operations are flushed under the same
    /// rule as a cursor movement, then the state is discarded.
    pub fn end_session(&self, txn: TxnId) {
        if let Some(state) = self.sessions.take(txn) {
            debug!(target: "mvtrace", txn = txn.get(), "ending session with buffered state");
            self.flush(state);
        }
    }

    /// A handle scoping session `txn`; dropping it ends the session.
    pub fn session(&self, txn: TxnId) -> SessionTracer<'_> {
        SessionTracer {
            interceptor: self,
            txn,
        }
    }

    fn flush(&self, state: TraceState) {
        for op in state.into_pending() {
            self.emitter.emit(op);
        }
    }
}

impl Drop for Interceptor {
    fn drop(&mut self) {
        for (_, state) in self.sessions.drain() {
            self.flush(state);
        }
        self.emitter.flush();
    }
}

/// Interceptor hooks bound to one session.
#[derive(Debug)]
pub struct SessionTracer<'a> {
    interceptor: &'a Interceptor,
    txn: TxnId,
}

impl SessionTracer<'_> {
    #[must_use]
    pub const fn txn(&self) -> TxnId {
        self.txn
    }

    pub fn on_instruction<I: Instruction + ?Sized>(&self, insn: &I) {
        self.interceptor.on_instruction(self.txn, insn);
    }

    pub fn on_row_id_bound(&self, row: RowId) {
        self.interceptor.on_row_id_bound(self.txn, row);
    }

    pub fn intercept_write<I: Instruction + ?Sized>(&self, insn: &I, object: RowId, rendered: &str) {
        self.interceptor
            .intercept_write(self.txn, insn, object, rendered);
    }

    pub fn stage_write(&self, value: Value) {
        self.interceptor.stage_write(self.txn, value);
    }
}

impl Drop for SessionTracer<'_> {
    fn drop(&mut self) {
        self.interceptor.end_session(self.txn);
    }
}

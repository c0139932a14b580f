//! Per-session buffering state and the table that owns it.
//!
//! A [`TraceState`] holds at most one pending READ and one pending WRITE for
//! the row a session's cursor currently points at, plus the most recently
//! bound row id. It lives from the first relevant instruction until the next
//! cursor movement, then is taken out of the [`SessionTable`] whole and its
//! operations are handed to the emitter.
//!
//! Sessions never share a `TraceState`: the table is keyed by [`TxnId`], and
//! each session only ever touches its own entry.

use std::collections::HashMap;

use mvtrace_types::{RowId, TxnId};
use parking_lot::Mutex;

use crate::op::{TransactionOp, track_read, track_write};
use crate::value::Value;

/// Number of shards in the session table (power of 2 for fast modular
/// indexing).
pub const SESSION_SHARDS: usize = 64;

/// Buffered operations for one session's current row.
#[derive(Debug, Default)]
pub struct TraceState {
    read_op: Option<TransactionOp>,
    write_op: Option<TransactionOp>,
    row_id: Option<RowId>,
}

impl TraceState {
    /// Fresh state: nothing pending, row id unknown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently bound row id.
    #[must_use]
    pub const fn row_id(&self) -> Option<RowId> {
        self.row_id
    }

    #[must_use]
    pub const fn has_pending_read(&self) -> bool {
        self.read_op.is_some()
    }

    #[must_use]
    pub const fn has_pending_write(&self) -> bool {
        self.write_op.is_some()
    }

    /// Record the row the cursor now refers to. Only the latest binding is
    /// kept.
    pub fn bind_row_id(&mut self, row: RowId) {
        self.row_id = Some(row);
    }

    /// Start a READ unless one is already pending. Returns whether a read
    /// was started.
    pub fn begin_read(&mut self, txn: TxnId) -> bool {
        if self.read_op.is_some() {
            return false;
        }
        self.read_op = Some(track_read(txn, self.row_id));
        true
    }

    /// Buffer a WRITE of `value` to the current row.
    ///
    /// Returns the write it displaced, if one was already pending; the
    /// caller must release it through the emitter.
    #[must_use = "a displaced write must be emitted"]
    pub fn stage_write(&mut self, txn: TxnId, value: Value) -> Option<TransactionOp> {
        let displaced = self.write_op.take().map(|op| self.resolved(op));
        self.write_op = Some(track_write(txn, self.row_id, value));
        displaced
    }

    /// Consume the state, yielding the pending READ then the pending WRITE.
    ///
    /// Operations started before the row id was bound take the row id known
    /// now. If it is still unknown they come back unresolved, and the
    /// emitter drops them instead of writing an invalid identity.
    pub fn into_pending(mut self) -> impl Iterator<Item = TransactionOp> {
        let read = self.read_op.take().map(|op| self.resolved(op));
        let write = self.write_op.take().map(|op| self.resolved(op));
        read.into_iter().chain(write)
    }

    fn resolved(&self, mut op: TransactionOp) -> TransactionOp {
        if let Some(row) = self.row_id {
            op.resolve_object(row);
        }
        op
    }
}

/// Session id to [`TraceState`] map.
///
/// Sharded into [`SESSION_SHARDS`] buckets so concurrent sessions do not
/// contend on one lock. Each shard maps `TxnId -> TraceState`.
pub struct SessionTable {
    shards: Box<[Mutex<HashMap<TxnId, TraceState>>; SESSION_SHARDS]>,
}

impl SessionTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: Box::new(std::array::from_fn(|_| Mutex::new(HashMap::new()))),
        }
    }

    /// Run `f` on `txn`'s state, creating it if absent.
    pub fn with_state<R>(&self, txn: TxnId, f: impl FnOnce(&mut TraceState) -> R) -> R {
        let mut map = self.shards[shard_index(txn)].lock();
        f(map.entry(txn).or_default())
    }

    /// Remove and return `txn`'s state.
    pub fn take(&self, txn: TxnId) -> Option<TraceState> {
        self.shards[shard_index(txn)].lock().remove(&txn)
    }

    /// Number of sessions currently holding state.
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    /// Remove every state, across all shards.
    pub fn drain(&self) -> Vec<(TxnId, TraceState)> {
        self.shards
            .iter()
            .flat_map(|s| s.lock().drain().collect::<Vec<_>>())
            .collect()
    }
}

fn shard_index(txn: TxnId) -> usize {
    (txn.get() as usize) & (SESSION_SHARDS - 1)
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTable")
            .field("live_sessions", &self.live_sessions())
            .finish()
    }
}

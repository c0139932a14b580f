//! Transaction operation records and the factory functions that build them.
//!
//! A [`TransactionOp`] is neither `Clone` nor `Copy`: it is created once by
//! one of the `track_*` functions and consumed once by
//! [`Emitter::emit`](crate::Emitter::emit), which takes it by value. After
//! emission the record and its attached [`Value`] are gone; there is no
//! handle left to render twice.

use std::fmt::{self, Write as _};

use mvtrace_types::{RowId, TxnId};
use serde::{Deserialize, Serialize};

use crate::render::BoundedBuf;
use crate::value::Value;

/// Kind of a logical transaction operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpKind {
    Begin,
    Commit,
    Write,
    Read,
}

impl OpKind {
    /// Token used in the trace line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Write => "WRITE",
            Self::Read => "READ",
        }
    }

    /// Parse a trace-line token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "BEGIN" => Some(Self::Begin),
            "COMMIT" => Some(Self::Commit),
            "WRITE" => Some(Self::Write),
            "READ" => Some(Self::Read),
            _ => None,
        }
    }

    /// Whether records of this kind reference an object.
    #[must_use]
    pub const fn has_object(self) -> bool {
        matches!(self, Self::Read | Self::Write)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical BEGIN/COMMIT/READ/WRITE attributed to one transaction.
#[must_use = "a TransactionOp must be handed to Emitter::emit"]
#[derive(Debug)]
pub struct TransactionOp {
    kind: OpKind,
    txn: TxnId,
    object: Option<RowId>,
    value: Value,
}

impl TransactionOp {
    #[must_use]
    pub const fn kind(&self) -> OpKind {
        self.kind
    }

    #[must_use]
    pub const fn txn(&self) -> TxnId {
        self.txn
    }

    /// Object id, `None` for BEGIN/COMMIT and for a read or write whose row
    /// was not yet bound.
    #[must_use]
    pub const fn object(&self) -> Option<RowId> {
        self.object
    }

    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Stamp the row id if none was known when the record was started.
    /// A row id captured at creation is kept.
    pub(crate) fn resolve_object(&mut self, row: RowId) {
        if self.kind.has_object() && self.object.is_none() {
            self.object = Some(row);
        }
    }

    /// Whether the record carries every identifier its kind requires.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        !self.kind.has_object() || self.object.is_some()
    }

    /// Render the trace line, newline-terminated, into `out`.
    ///
    /// Layout: `Op: <KIND>\t Tx: <txn>[\t Obj: <obj>][ \t wVal: <value>]`.
    /// Returns `true` if the value or the line had to be truncated.
    pub fn render_line<const N: usize>(&self, out: &mut BoundedBuf<N>) -> bool {
        let mut value_truncated = false;
        // Writes into a BoundedBuf cannot fail.
        let _ = write!(out, "Op: {}\t Tx: {}", self.kind, self.txn.get());
        if self.kind.has_object()
            && let Some(object) = self.object
        {
            let _ = write!(out, "\t Obj: {}", object.get());
        }
        if self.kind == OpKind::Write
            && let Some(rendered) = self.value.render()
        {
            value_truncated = rendered.is_truncated();
            let _ = write!(out, " \t wVal: {}", rendered.as_str());
        }
        out.terminate_line();
        value_truncated || out.is_truncated()
    }
}

/// Start a READ of `object` (which may still be unknown).
pub fn track_read(txn: TxnId, object: impl Into<Option<RowId>>) -> TransactionOp {
    TransactionOp {
        kind: OpKind::Read,
        txn,
        object: object.into(),
        value: Value::None,
    }
}

/// Build a WRITE of `object` that owns `value` until emission.
pub fn track_write(txn: TxnId, object: impl Into<Option<RowId>>, value: Value) -> TransactionOp {
    TransactionOp {
        kind: OpKind::Write,
        txn,
        object: object.into(),
        value,
    }
}

/// Build a BEGIN.
pub fn track_begin(txn: TxnId) -> TransactionOp {
    TransactionOp {
        kind: OpKind::Begin,
        txn,
        object: None,
        value: Value::None,
    }
}

/// Build a COMMIT.
pub fn track_end(txn: TxnId) -> TransactionOp {
    TransactionOp {
        kind: OpKind::Commit,
        txn,
        object: None,
        value: Value::None,
    }
}

//! Output sinks for rendered trace lines.
//!
//! Every sink receives complete, newline-terminated lines, one `write_line`
//! call per operation. Sinks MUST NOT block on anything but their own output:
//! they are called inline on the engine's execution thread.

use std::collections::VecDeque;
use std::io::{self, Write};

use mvtrace_error::Result;
use parking_lot::Mutex;

use crate::record::TraceRecord;

/// Destination for rendered trace lines.
pub trait TraceSink: Send + Sync {
    /// Write one complete line (including its trailing newline).
    fn write_line(&self, line: &str) -> io::Result<()>;

    /// Flush buffered output, if any.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Whether this sink discards everything.
    fn is_noop(&self) -> bool {
        false
    }

    /// Downcast hook for in-memory sinks.
    fn as_ring_buffer(&self) -> Option<&RingBufferSink> {
        None
    }
}

// ---------------------------------------------------------------------------
// NoOpSink
// ---------------------------------------------------------------------------

/// The "no output" sentinel. Emission into it still consumes the record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl TraceSink for NoOpSink {
    #[inline(always)]
    fn write_line(&self, _line: &str) -> io::Result<()> {
        Ok(())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// StdStreamSink
// ---------------------------------------------------------------------------

/// Process stdout or stderr.
///
/// Each line goes out as a single `write_all` with no extra lock around it,
/// so concurrent sessions interleave at line granularity on a best-effort
/// basis only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStreamSink {
    Stdout,
    Stderr,
}

impl StdStreamSink {
    #[must_use]
    pub const fn stdout() -> Self {
        Self::Stdout
    }

    #[must_use]
    pub const fn stderr() -> Self {
        Self::Stderr
    }
}

impl TraceSink for StdStreamSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        match self {
            Self::Stdout => io::stdout().write_all(line.as_bytes()),
            Self::Stderr => io::stderr().write_all(line.as_bytes()),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self {
            Self::Stdout => io::stdout().flush(),
            Self::Stderr => io::stderr().flush(),
        }
    }
}

// ---------------------------------------------------------------------------
// WriterSink
// ---------------------------------------------------------------------------

/// Any writer (typically a file) behind a mutex.
///
/// Writes are serialized, so lines from concurrent sessions never interleave.
pub struct WriterSink<W: Write + Send> {
    inner: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W: Write + Send> TraceSink for WriterSink<W> {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.inner.lock().write_all(line.as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<W: Write + Send> std::fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterSink").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// RingBufferSink
// ---------------------------------------------------------------------------

/// Fixed-capacity in-memory sink keeping the most recent lines.
///
/// When full, the oldest line is evicted. Lines are stored without their
/// trailing newline. A capacity of zero stores nothing.
pub struct RingBufferSink {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl RingBufferSink {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// All stored lines, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    /// All stored lines, decoded.
    pub fn records(&self) -> Result<Vec<TraceRecord>> {
        self.lines
            .lock()
            .iter()
            .map(|line| TraceRecord::parse_line(line))
            .collect()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl TraceSink for RingBufferSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }
        let line = line.strip_suffix('\n').unwrap_or(line).to_owned();
        let mut lines = self.lines.lock();
        if lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
        Ok(())
    }

    fn as_ring_buffer(&self) -> Option<&RingBufferSink> {
        Some(self)
    }
}

impl std::fmt::Debug for RingBufferSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBufferSink")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

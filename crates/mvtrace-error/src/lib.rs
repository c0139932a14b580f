use thiserror::Error;

/// Primary error type for the transaction tracer.
///
/// None of these ever reach the host engine: the interceptor entry points
/// log and count them, then drop the affected operation. They surface only
/// from setup paths (configuration, opening a sink) and from the trace-line
/// parser used by downstream consumers.
#[derive(Error, Debug)]
pub enum TraceError {
    /// Allocation for a record or its attached value failed.
    #[error("out of memory")]
    OutOfMemory,

    /// Trace output could not be opened or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration key carried a value that cannot be interpreted.
    #[error("invalid value for {key}: '{value}'")]
    InvalidConfig { key: String, value: String },

    /// A configuration document could not be deserialized.
    #[error("malformed trace configuration: {detail}")]
    MalformedConfig { detail: String },

    /// A trace line did not follow the `Op: .. Tx: ..` layout.
    #[error("malformed trace line '{line}': {detail}")]
    MalformedTraceLine { line: String, detail: String },
}

impl TraceError {
    /// Create an invalid-config error.
    pub fn invalid_config(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a malformed-trace-line error.
    pub fn malformed_line(line: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedTraceLine {
            line: line.into(),
            detail: detail.into(),
        }
    }
}

/// Result type alias using `TraceError`.
pub type Result<T> = std::result::Result<T, TraceError>;

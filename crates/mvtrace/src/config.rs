//! Trace output configuration.
//!
//! Output defaults to disabled. An embedding harness sets it once at startup
//! from the environment (`MVTRACE_OUTPUT`, `MVTRACE_ENABLED`) or from a JSON
//! document, then builds the [`Emitter`](crate::Emitter) from it.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use mvtrace_error::{Result, TraceError};
use serde::{Deserialize, Serialize};

use crate::sink::{NoOpSink, RingBufferSink, StdStreamSink, TraceSink, WriterSink};

/// Environment variable selecting the output.
pub const ENV_OUTPUT: &str = "MVTRACE_OUTPUT";
/// Environment variable toggling emission.
pub const ENV_ENABLED: &str = "MVTRACE_ENABLED";
/// Ring capacity used for `memory` without an explicit size.
pub const DEFAULT_MEMORY_CAPACITY: usize = 1024;

/// Where rendered trace lines go.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutput {
    /// The no-output sentinel.
    #[default]
    Disabled,
    Stdout,
    Stderr,
    /// File output; an existing file is truncated.
    File(PathBuf),
    /// Bounded in-memory ring.
    Memory { capacity: usize },
}

impl TraceOutput {
    /// Parse the `MVTRACE_OUTPUT` syntax:
    /// `off | stdout | stderr | memory[:N] | <path>`.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        match spec {
            "" => Err(TraceError::invalid_config(ENV_OUTPUT, spec)),
            "off" | "none" | "disabled" => Ok(Self::Disabled),
            "stdout" | "-" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            "memory" => Ok(Self::Memory {
                capacity: DEFAULT_MEMORY_CAPACITY,
            }),
            _ => {
                if let Some(capacity) = spec.strip_prefix("memory:") {
                    let capacity = capacity
                        .parse::<usize>()
                        .map_err(|_| TraceError::invalid_config(ENV_OUTPUT, spec))?;
                    return Ok(Self::Memory { capacity });
                }
                Ok(Self::File(PathBuf::from(spec)))
            }
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::File(_) => "file",
            Self::Memory { .. } => "memory",
        }
    }
}

/// Tracer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Process-wide emission flag.
    pub enabled: bool,
    pub output: TraceOutput,
}

impl TraceConfig {
    /// Enabled configuration writing to `output`.
    #[must_use]
    pub fn enabled(output: TraceOutput) -> Self {
        Self {
            enabled: true,
            output,
        }
    }

    /// Read `MVTRACE_OUTPUT` and `MVTRACE_ENABLED` from the process
    /// environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an explicit lookup.
    ///
    /// Setting an output enables emission unless `MVTRACE_ENABLED` says
    /// otherwise.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let output = lookup(ENV_OUTPUT)
            .map(|spec| TraceOutput::parse(&spec))
            .transpose()?
            .unwrap_or_default();

        let enabled = match lookup(ENV_ENABLED) {
            Some(flag) => parse_flag(&flag)?,
            None => output != TraceOutput::Disabled,
        };

        Ok(Self { enabled, output })
    }

    /// Decode a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TraceError::MalformedConfig {
            detail: e.to_string(),
        })
    }

    /// Open the configured sink.
    pub fn build_sink(&self) -> Result<Arc<dyn TraceSink>> {
        let sink: Arc<dyn TraceSink> = match &self.output {
            TraceOutput::Disabled => Arc::new(NoOpSink),
            TraceOutput::Stdout => Arc::new(StdStreamSink::stdout()),
            TraceOutput::Stderr => Arc::new(StdStreamSink::stderr()),
            TraceOutput::File(path) => {
                let file = File::create(path)?;
                Arc::new(WriterSink::new(BufWriter::new(file)))
            }
            TraceOutput::Memory { capacity } => Arc::new(RingBufferSink::new(*capacity)),
        };
        Ok(sink)
    }
}

fn parse_flag(flag: &str) -> Result<bool> {
    match flag.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(TraceError::invalid_config(ENV_ENABLED, flag)),
    }
}

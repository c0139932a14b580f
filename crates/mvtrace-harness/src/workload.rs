//! Concurrent workload: N sessions, one thread each, sharing one table and
//! one interceptor.
//!
//! Every worker runs the same script:
//!
//! ```sql
//! BEGIN TRANSACTION;
//! UPDATE employees SET salary = salary + 1000 WHERE department = 'Engineering';
//! COMMIT;
//! SELECT * FROM employees LIMIT 2;
//! ```

use std::thread;

use mvtrace::{Interceptor, TraceMetricsSnapshot};
use mvtrace_error::{Result, TraceError};
use mvtrace_types::{RowId, TxnId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::{Employee, Employees, Statement, StatementResult, ToyEngine};

/// Upper bound on worker threads.
pub const MAX_THREADS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub threads: usize,
    pub department: String,
    pub salary_delta: i64,
    pub select_limit: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            threads: 5,
            department: String::from("Engineering"),
            salary_delta: 1000,
            select_limit: 2,
        }
    }
}

impl WorkloadConfig {
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(TraceError::invalid_config(
                "threads",
                self.threads.to_string(),
            ));
        }
        Ok(())
    }

    /// The statements each worker runs, in order.
    #[must_use]
    pub fn script(&self) -> Vec<Statement> {
        vec![
            Statement::Begin,
            Statement::RaiseSalary {
                department: self.department.clone(),
                delta: self.salary_delta,
            },
            Statement::Commit,
            Statement::SelectAll {
                limit: self.select_limit,
            },
        ]
    }

    /// Session id of worker `index` (zero-based).
    pub fn worker_txn(index: usize) -> Result<TxnId> {
        u64::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(1))
            .and_then(TxnId::new)
            .ok_or_else(|| TraceError::invalid_config("threads", index.to_string()))
    }
}

/// What one worker did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub txn: TxnId,
    pub rows_updated: usize,
    pub rows_selected: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    pub sessions: Vec<SessionReport>,
    pub final_rows: Vec<(RowId, Employee)>,
    pub metrics: TraceMetricsSnapshot,
}

impl WorkloadReport {
    #[must_use]
    pub fn rows_updated(&self) -> usize {
        self.sessions.iter().map(|s| s.rows_updated).sum()
    }

    #[must_use]
    pub fn rows_selected(&self) -> usize {
        self.sessions.iter().map(|s| s.rows_selected).sum()
    }
}

/// Seed a fresh table and run `config.threads` sessions against it.
///
/// Each session is ended (and its buffered operations flushed) when its
/// worker finishes; the sink is flushed before returning.
pub fn run_workload(config: &WorkloadConfig, interceptor: &Interceptor) -> Result<WorkloadReport> {
    config.validate()?;
    let txns = (0..config.threads)
        .map(WorkloadConfig::worker_txn)
        .collect::<Result<Vec<_>>>()?;

    let table = Employees::seeded();
    let engine = ToyEngine::new(&table);
    let script = config.script();

    info!(
        target: "mvtrace",
        threads = config.threads,
        department = %config.department,
        delta = config.salary_delta,
        "starting workload"
    );

    let sessions = thread::scope(|s| {
        let handles: Vec<_> = txns
            .iter()
            .map(|&txn| {
                let script = &script;
                s.spawn(move || run_session(engine, interceptor, txn, script))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect::<Vec<_>>()
    });

    interceptor.emitter().flush();

    let report = WorkloadReport {
        sessions,
        final_rows: table.rows(),
        metrics: interceptor.metrics().snapshot(),
    };
    info!(
        target: "mvtrace",
        rows_updated = report.rows_updated(),
        rows_selected = report.rows_selected(),
        emitted = interceptor.metrics().emitted_total(),
        "workload finished"
    );
    Ok(report)
}

fn run_session(
    engine: ToyEngine<'_>,
    interceptor: &Interceptor,
    txn: TxnId,
    script: &[Statement],
) -> SessionReport {
    let session = interceptor.session(txn);
    let mut report = SessionReport {
        txn,
        rows_updated: 0,
        rows_selected: 0,
    };
    for statement in script {
        match engine.execute(&session, statement) {
            StatementResult::Done => {}
            StatementResult::Updated(n) => report.rows_updated += n,
            StatementResult::Rows(rows) => report.rows_selected += rows.len(),
        }
    }
    debug!(target: "mvtrace", txn = txn.get(), "session finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_workload() {
        let config = WorkloadConfig::default();
        assert_eq!(config.threads, 5);
        assert_eq!(config.script().len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_thread_counts() {
        for threads in [0, MAX_THREADS + 1] {
            let config = WorkloadConfig {
                threads,
                ..WorkloadConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(TraceError::InvalidConfig { .. })
            ));
        }
    }

    #[test]
    fn worker_txns_start_at_one() {
        assert_eq!(WorkloadConfig::worker_txn(0).unwrap().get(), 1);
        assert_eq!(WorkloadConfig::worker_txn(4).unwrap().get(), 5);
    }

    #[test]
    fn config_json_defaults() {
        let config: WorkloadConfig = serde_json::from_str(r#"{"threads":2}"#).unwrap();
        assert_eq!(config.threads, 2);
        assert_eq!(config.department, "Engineering");
    }

    #[test]
    fn untraced_run_still_updates() {
        let interceptor = Interceptor::default();
        let report = run_workload(&WorkloadConfig::default(), &interceptor).unwrap();
        assert_eq!(report.rows_updated(), 5);
        assert_eq!(report.rows_selected(), 10);
        let bob = &report.final_rows[1].1;
        assert_eq!(bob.salary, 80_000);
        assert_eq!(report.metrics.suppressed, 40);
        assert_eq!(interceptor.live_sessions(), 0);
    }
}

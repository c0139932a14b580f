//! End-to-end: the concurrent employees workload produces a well-formed,
//! per-session history.

use std::collections::BTreeSet;
use std::sync::Arc;

use mvtrace::{
    Emitter, Interceptor, OpKind, RingBufferSink, TraceConfig, TraceOutput, TraceRecord,
};
use mvtrace_harness::{WorkloadConfig, run_workload};
use proptest::prelude::*;

fn traced(capacity: usize) -> (Arc<RingBufferSink>, Interceptor) {
    let ring = Arc::new(RingBufferSink::new(capacity));
    (ring.clone(), Interceptor::new(Emitter::new(ring)))
}

fn history(records: &[TraceRecord], txn: u64) -> Vec<(OpKind, Option<i64>)> {
    records
        .iter()
        .filter(|r| r.txn == txn)
        .map(|r| (r.kind, r.object))
        .collect()
}

#[test]
fn reference_workload_history() {
    let (ring, interceptor) = traced(1024);
    let report = run_workload(&WorkloadConfig::default(), &interceptor).unwrap();

    let records = ring.records().unwrap();
    assert_eq!(records.len(), 40);
    assert_eq!(interceptor.live_sessions(), 0);

    for txn in 1..=5 {
        assert_eq!(
            history(&records, txn),
            vec![
                (OpKind::Begin, None),
                (OpKind::Read, Some(1)),
                (OpKind::Write, Some(2)),
                (OpKind::Read, Some(2)),
                (OpKind::Read, Some(3)),
                (OpKind::Commit, None),
                (OpKind::Read, Some(1)),
                (OpKind::Read, Some(2)),
            ],
            "txn {txn}"
        );
    }

    // The update runs under the table lock, so every session writes a
    // distinct salary.
    let written: BTreeSet<_> = records
        .iter()
        .filter(|r| r.kind == OpKind::Write)
        .map(|r| r.value.clone().unwrap())
        .collect();
    let expected: BTreeSet<_> = (1..=5).map(|n| (75_000 + n * 1000).to_string()).collect();
    assert_eq!(written, expected);

    assert_eq!(report.final_rows[1].1.salary, 80_000);
    assert_eq!(report.metrics.begins, 5);
    assert_eq!(report.metrics.commits, 5);
    assert_eq!(report.metrics.reads, 25);
    assert_eq!(report.metrics.writes, 5);
    assert_eq!(report.metrics.dropped_unknown_row, 0);
}

#[test]
fn unmatched_department_only_reads() {
    let (ring, interceptor) = traced(256);
    let config = WorkloadConfig {
        threads: 2,
        department: String::from("Legal"),
        ..WorkloadConfig::default()
    };
    let report = run_workload(&config, &interceptor).unwrap();

    assert_eq!(report.rows_updated(), 0);
    let records = ring.records().unwrap();
    assert!(records.iter().all(|r| r.kind != OpKind::Write));
    assert_eq!(report.metrics.reads, 10);
}

#[test]
fn file_output_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workload.trace");
    {
        let interceptor =
            Interceptor::from_config(&TraceConfig::enabled(TraceOutput::File(path.clone())))
                .unwrap();
        run_workload(
            &WorkloadConfig {
                threads: 3,
                ..WorkloadConfig::default()
            },
            &interceptor,
        )
        .unwrap();
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let records: Vec<_> = text
        .lines()
        .map(|line| TraceRecord::parse_line(line).unwrap())
        .collect();
    assert_eq!(records.len(), 24);
    let txns: BTreeSet<_> = records.iter().map(|r| r.txn).collect();
    assert_eq!(txns, BTreeSet::from([1, 2, 3]));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn every_session_is_bracketed(threads in 1usize..12, limit in 0usize..5) {
        let (ring, interceptor) = traced(4096);
        let config = WorkloadConfig {
            threads,
            select_limit: limit,
            ..WorkloadConfig::default()
        };
        let report = run_workload(&config, &interceptor).unwrap();

        let records = ring.records().unwrap();
        let per_session = 6 + limit.min(3);
        prop_assert_eq!(records.len(), threads * per_session);
        prop_assert_eq!(report.rows_selected(), threads * limit.min(3));

        for txn in 1..=threads as u64 {
            let mine = history(&records, txn);
            prop_assert_eq!(mine.len(), per_session);
            prop_assert_eq!(mine[0].0, OpKind::Begin);
            prop_assert_eq!(mine[5].0, OpKind::Commit);
            prop_assert!(mine[6..].iter().all(|(kind, _)| *kind == OpKind::Read));
        }
    }
}

//! Sessions on different threads never see each other's buffered state.

use std::sync::{Arc, Barrier};
use std::thread;

use mvtrace::{
    Emitter, Interceptor, OpKind, Opcode, RingBufferSink, RowId, TraceConfig, TraceOutput,
    TraceRecord, TxnId, VdbeOp, WriterSink,
};

fn txn(n: u64) -> TxnId {
    TxnId::new(n).unwrap()
}

fn insn(kind: Opcode) -> VdbeOp {
    VdbeOp::new(kind, 0, 0, 0)
}

/// One session: bind `row`, issue many column reads, then move the cursor.
/// The barrier lines up both threads so their instruction streams interleave.
fn column_run(tracer: &Interceptor, barrier: &Barrier, t: TxnId, row: i64, columns: usize) {
    barrier.wait();
    tracer.on_instruction(t, &insn(Opcode::Rowid));
    tracer.on_row_id_bound(t, RowId::new(row));
    for _ in 0..columns {
        tracer.on_instruction(t, &insn(Opcode::Column));
        thread::yield_now();
    }
    tracer.on_instruction(t, &insn(Opcode::Next));
}

#[test]
fn reads_keep_their_own_rows() {
    for _ in 0..50 {
        let ring = Arc::new(RingBufferSink::new(16));
        let tracer = Interceptor::new(Emitter::new(ring.clone()));
        let barrier = Barrier::new(2);

        thread::scope(|s| {
            s.spawn(|| column_run(&tracer, &barrier, txn(1), 7, 20));
            s.spawn(|| column_run(&tracer, &barrier, txn(2), 9, 20));
        });

        let mut records = ring.records().unwrap();
        records.sort_by_key(|r| r.txn);
        assert_eq!(
            records,
            vec![
                TraceRecord {
                    kind: OpKind::Read,
                    txn: 1,
                    object: Some(7),
                    value: None,
                },
                TraceRecord {
                    kind: OpKind::Read,
                    txn: 2,
                    object: Some(9),
                    value: None,
                },
            ]
        );
        assert_eq!(tracer.live_sessions(), 0);
    }
}

#[test]
fn many_sessions_one_writer_sink() {
    const SESSIONS: u64 = 16;
    const ROWS: i64 = 25;

    let writer = Arc::new(WriterSink::new(Vec::<u8>::new()));
    let tracer = Interceptor::new(Emitter::new(writer.clone()));

    thread::scope(|s| {
        for n in 1..=SESSIONS {
            let tracer = &tracer;
            s.spawn(move || {
                let session = tracer.session(txn(n));
                session.on_instruction(&VdbeOp::new(Opcode::AutoCommit, 0, 0, 0));
                session.on_instruction(&insn(Opcode::Rewind));
                for row in 1..=ROWS {
                    session.on_row_id_bound(RowId::new(row));
                    session.on_instruction(&insn(Opcode::Column));
                    session.intercept_write(&insn(Opcode::Insert), RowId::new(row), "x");
                    session.on_instruction(&insn(Opcode::Next));
                }
                session.on_instruction(&VdbeOp::new(Opcode::AutoCommit, 1, 0, 0));
            });
        }
    });
    drop(tracer);

    let writer = Arc::into_inner(writer).unwrap();
    let text = String::from_utf8(writer.into_inner()).unwrap();
    let records: Vec<_> = text
        .lines()
        .map(|line| TraceRecord::parse_line(line).unwrap())
        .collect();

    let per_session = 2 + 2 * ROWS as usize;
    assert_eq!(records.len(), SESSIONS as usize * per_session);

    for n in 1..=SESSIONS {
        let mine: Vec<_> = records.iter().filter(|r| r.txn == n).collect();
        assert_eq!(mine.len(), per_session);
        assert_eq!(mine.first().unwrap().kind, OpKind::Begin);
        assert_eq!(mine.last().unwrap().kind, OpKind::Commit);
        let reads: Vec<_> = mine
            .iter()
            .filter(|r| r.kind == OpKind::Read)
            .map(|r| r.object.unwrap())
            .collect();
        assert_eq!(reads, (1..=ROWS).collect::<Vec<_>>());
    }
}

#[test]
fn config_driven_file_trace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.log");
    let config = TraceConfig::enabled(TraceOutput::File(path.clone()));

    {
        let tracer = Interceptor::from_config(&config).unwrap();
        let t = txn(3);
        tracer.on_instruction(t, &VdbeOp::new(Opcode::AutoCommit, 0, 0, 0));
        tracer.intercept_write(t, &insn(Opcode::Insert), RowId::new(2), "76000");
        tracer.on_instruction(t, &VdbeOp::new(Opcode::AutoCommit, 1, 0, 0));
    }

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "Op: BEGIN\t Tx: 3\nOp: WRITE\t Tx: 3\t Obj: 2 \t wVal: 76000\nOp: COMMIT\t Tx: 3\n"
    );
}

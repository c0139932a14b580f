//! A scripted stand-in for a bytecode database engine.
//!
//! [`ToyEngine`] runs a handful of fixed statements against the in-memory
//! [`Employees`] table and reports, for each one, the instruction sequence a
//! SQLite VDBE program for that statement would execute: the autocommit
//! toggle for `BEGIN`/`COMMIT`, and for scans a `Rewind`/`Next` loop with
//! `Column` reads, a `Rowid` where the program needs the key, and an
//! `Insert` on the write path. The row id is bound every time the cursor
//! lands on a row.

use std::collections::BTreeMap;

use mvtrace::SessionTracer;
use mvtrace_types::{Opcode, RowId, VdbeOp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Cursor index used by every generated program.
const CURSOR: i32 = 0;
/// Root page of the employees table.
const ROOT_PAGE: i32 = 2;

// Column positions in the stored record. `id` is the rowid alias.
const COL_NAME: i32 = 1;
const COL_DEPARTMENT: i32 = 2;
const COL_SALARY: i32 = 3;

// Jump targets of the scan loop.
const ADDR_LOOP: i32 = 4;
const ADDR_NEXT: i32 = 15;
const ADDR_END: i32 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    pub department: String,
    pub salary: i64,
}

impl Employee {
    pub fn new(name: impl Into<String>, department: impl Into<String>, salary: i64) -> Self {
        Self {
            name: name.into(),
            department: department.into(),
            salary,
        }
    }
}

/// The `employees` table, keyed by rowid.
#[derive(Debug, Default)]
pub struct Employees {
    rows: RwLock<BTreeMap<i64, Employee>>,
}

impl Employees {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The three-row table every workload starts from.
    #[must_use]
    pub fn seeded() -> Self {
        let table = Self::new();
        table.insert(Employee::new("Alice", "HR", 50_000));
        table.insert(Employee::new("Bob", "Engineering", 75_000));
        table.insert(Employee::new("Charlie", "Marketing", 60_000));
        table
    }

    /// Append a row under the next free rowid.
    pub fn insert(&self, employee: Employee) -> RowId {
        let mut rows = self.rows.write();
        let id = rows.last_key_value().map_or(1, |(&id, _)| id + 1);
        rows.insert(id, employee);
        RowId::new(id)
    }

    #[must_use]
    pub fn get(&self, row: RowId) -> Option<Employee> {
        self.rows.read().get(&row.get()).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All rows in rowid order.
    #[must_use]
    pub fn rows(&self) -> Vec<(RowId, Employee)> {
        self.rows
            .read()
            .iter()
            .map(|(&id, e)| (RowId::new(id), e.clone()))
            .collect()
    }
}

/// Statements the toy engine understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    /// `BEGIN TRANSACTION`
    Begin,
    /// `COMMIT`
    Commit,
    /// `UPDATE employees SET salary = salary + delta WHERE department = ?`
    RaiseSalary { department: String, delta: i64 },
    /// `SELECT * FROM employees LIMIT ?`
    SelectAll { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementResult {
    Done,
    Updated(usize),
    Rows(Vec<(RowId, Employee)>),
}

/// Executes statements for one session at a time, reporting every
/// instruction to that session's tracer.
#[derive(Debug, Clone, Copy)]
pub struct ToyEngine<'t> {
    table: &'t Employees,
}

impl<'t> ToyEngine<'t> {
    #[must_use]
    pub const fn new(table: &'t Employees) -> Self {
        Self { table }
    }

    pub fn execute(&self, session: &SessionTracer<'_>, statement: &Statement) -> StatementResult {
        match statement {
            Statement::Begin => {
                autocommit(session, false);
                StatementResult::Done
            }
            Statement::Commit => {
                autocommit(session, true);
                StatementResult::Done
            }
            Statement::RaiseSalary { department, delta } => {
                StatementResult::Updated(self.raise_salary(session, department, *delta))
            }
            Statement::SelectAll { limit } => StatementResult::Rows(self.select_all(session, *limit)),
        }
    }

    /// One-pass update scan. Holds the table's write lock for the whole
    /// statement.
    fn raise_salary(&self, session: &SessionTracer<'_>, department: &str, delta: i64) -> usize {
        let mut rows = self.table.rows.write();
        let mut updated = 0;

        step(session, Opcode::Init, 0, 1, 0);
        step(session, Opcode::Transaction, 0, 1, 0);
        step(session, Opcode::OpenWrite, CURSOR, ROOT_PAGE, 0);
        step(session, Opcode::String8, 0, 1, 0);
        step(session, Opcode::Rewind, CURSOR, ADDR_END, 0);

        for (&id, employee) in rows.iter_mut() {
            session.on_row_id_bound(RowId::new(id));
            step(session, Opcode::Column, CURSOR, COL_DEPARTMENT, 2);
            step(session, Opcode::Ne, 1, ADDR_NEXT, 2);
            if employee.department == department {
                step(session, Opcode::Rowid, CURSOR, 3, 0);
                step(session, Opcode::Column, CURSOR, COL_NAME, 4);
                step(session, Opcode::Column, CURSOR, COL_SALARY, 5);
                step(session, Opcode::Integer, 0, 6, 0);
                step(session, Opcode::Add, 6, 5, 5);
                employee.salary = employee.salary.saturating_add(delta);
                step(session, Opcode::MakeRecord, 3, 3, 7);
                let insert = step(session, Opcode::Insert, CURSOR, 7, 3);
                session.intercept_write(&insert, RowId::new(id), &employee.salary.to_string());
                updated += 1;
            }
            step(session, Opcode::Next, CURSOR, ADDR_LOOP, 0);
        }

        step(session, Opcode::Close, CURSOR, 0, 0);
        step(session, Opcode::Halt, 0, 0, 0);
        updated
    }

    /// Full-table scan stopping after `limit` result rows. The read of the
    /// last returned row stays buffered until the session's next cursor
    /// movement or its end.
    fn select_all(&self, session: &SessionTracer<'_>, limit: usize) -> Vec<(RowId, Employee)> {
        let rows = self.table.rows.read();
        let mut out = Vec::with_capacity(limit.min(rows.len()));

        step(session, Opcode::Init, 0, 1, 0);
        step(session, Opcode::Integer, i32::try_from(limit).unwrap_or(i32::MAX), 1, 0);
        if limit == 0 {
            step(session, Opcode::Halt, 0, 0, 0);
            return out;
        }
        step(session, Opcode::Transaction, 0, 0, 0);
        step(session, Opcode::OpenRead, CURSOR, ROOT_PAGE, 0);
        step(session, Opcode::Rewind, CURSOR, ADDR_END, 0);

        for (&id, employee) in rows.iter() {
            session.on_row_id_bound(RowId::new(id));
            step(session, Opcode::Rowid, CURSOR, 2, 0);
            step(session, Opcode::Column, CURSOR, COL_NAME, 3);
            step(session, Opcode::Column, CURSOR, COL_DEPARTMENT, 4);
            step(session, Opcode::Column, CURSOR, COL_SALARY, 5);
            step(session, Opcode::ResultRow, 2, 4, 0);
            out.push((RowId::new(id), employee.clone()));
            step(session, Opcode::DecrJumpZero, 1, ADDR_END, 0);
            if out.len() == limit {
                break;
            }
            step(session, Opcode::Next, CURSOR, ADDR_LOOP, 0);
        }

        step(session, Opcode::Halt, 0, 0, 0);
        out
    }
}

fn autocommit(session: &SessionTracer<'_>, enabled: bool) {
    step(session, Opcode::Init, 0, 1, 0);
    step(session, Opcode::AutoCommit, i32::from(enabled), 0, 0);
    step(session, Opcode::Halt, 0, 0, 0);
}

fn step(session: &SessionTracer<'_>, kind: Opcode, p1: i32, p2: i32, p3: i32) -> VdbeOp {
    let insn = VdbeOp::new(kind, p1, p2, p3);
    session.on_instruction(&insn);
    insn
}

//! Drives the mvtrace interceptor with a toy engine and a concurrent
//! workload, standing in for an instrumented SQLite build.

pub mod engine;
pub mod workload;

pub use engine::{Employee, Employees, Statement, StatementResult, ToyEngine};
pub use workload::{
    MAX_THREADS, SessionReport, WorkloadConfig, WorkloadReport, run_workload,
};

//! Execution tracing hooks.
//!
//! The executor is silent by default; hosts that want visibility attach a
//! tracer for a run. The recording tracer backs tests, the stderr tracer is
//! for interactive debugging.

use crate::{
    compiler::Operation,
    error::ExecResult,
    value::Value,
};

/// Observation hooks on executor runs.
pub trait Tracer {
    /// Called before each operation executes.
    fn operation(&mut self, index: usize, operation: &Operation, frame_depth: usize);

    /// Called once when execution completes or aborts.
    fn finished(&mut self, result: &ExecResult<Value>) {
        let _ = result;
    }
}

/// Tracer that observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn operation(&mut self, _index: usize, _operation: &Operation, _frame_depth: usize) {}
}

/// One recorded operation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub index: usize,
    pub operation: &'static str,
    pub frame_depth: usize,
}

/// Tracer that records every operation, for tests and offline inspection.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    pub entries: Vec<TraceEntry>,
}

impl Tracer for RecordingTracer {
    fn operation(&mut self, index: usize, operation: &Operation, frame_depth: usize) {
        self.entries.push(TraceEntry {
            index,
            operation: operation.into(),
            frame_depth,
        });
    }
}

/// Tracer that prints each operation to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrTracer;

impl Tracer for StderrTracer {
    fn operation(&mut self, index: usize, operation: &Operation, frame_depth: usize) {
        eprintln!("[{index:>4}] depth={frame_depth} {operation:?}");
    }

    fn finished(&mut self, result: &ExecResult<Value>) {
        match result {
            Ok(value) => eprintln!("=> {value}"),
            Err(interrupt) => eprintln!("!! {interrupt}"),
        }
    }
}

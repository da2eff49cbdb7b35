//! Hooks for observing evaluation.
//!
//! A tracer receives callbacks as the interpreter walks the tree. The
//! default [`NoopTracer`] compiles away; [`StderrTracer`] prints a line per
//! event and is what the CLI's `--trace` flag installs.

use crate::error::CodeLoc;

/// Observer for interpreter events. All methods default to no-ops so
/// implementations only override what they need.
pub trait EvalTracer {
    /// A statement is about to execute.
    fn on_stmt(&mut self, _position: CodeLoc, _kind: &'static str) {}

    /// A function call is entering `name`.
    fn on_call(&mut self, _name: &str, _position: CodeLoc) {}

    /// A function call to `name` returned.
    fn on_return(&mut self, _name: &str) {}

    /// A breakpoint published a snapshot at `position`.
    fn on_breakpoint(&mut self, _position: CodeLoc) {}
}

/// Tracer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl EvalTracer for NoopTracer {}

/// Tracer that logs every event to stderr, prefixed with the event kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrTracer;

impl EvalTracer for StderrTracer {
    fn on_stmt(&mut self, position: CodeLoc, kind: &'static str) {
        eprintln!("trace: stmt {kind} at {position}");
    }

    fn on_call(&mut self, name: &str, position: CodeLoc) {
        eprintln!("trace: call {name} at {position}");
    }

    fn on_return(&mut self, name: &str) {
        eprintln!("trace: return from {name}");
    }

    fn on_breakpoint(&mut self, position: CodeLoc) {
        eprintln!("trace: breakpoint hit at {position}");
    }
}

//! The breakpoint protocol: cooperative suspension of the evaluator.
//!
//! Two threads participate. The evaluator owns memory and, at every
//! instrumented node, asks its [`DebugHook`] whether the node's position is a
//! breakpoint. On a hit it publishes a deep snapshot of memory to a bounded
//! queue, closes the gate, and blocks until the controller reopens it. The
//! controller side holds the queue receiver and the gate; snapshots are the
//! only data crossing the thread boundary.
//!
//! Ordering: the snapshot is published (and accepted by the queue) before the
//! hit node's side effect becomes observable, and the evaluator cannot resume
//! until the controller opens the gate. A controller that never resumes
//! deadlocks the evaluator intentionally; hosts wanting timeouts impose them
//! externally.

use std::collections::HashSet;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use parking_lot::{Condvar, Mutex};

use crate::{error::CodeLoc, memory::Memory};

/// Default capacity of the snapshot queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// A breakpoint hit delivered to the controller: the position of the node
/// that triggered it, and a structurally independent copy of memory.
///
/// Serializable so hosts can persist or forward frozen memory views.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BreakpointHit {
    pub position: CodeLoc,
    pub memory: Memory,
}

/// Binary suspend/resume primitive: "open" permits execution, "closed"
/// blocks the evaluator at its next instrumented node.
#[derive(Debug)]
struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    fn new() -> Self {
        Self {
            open: Mutex::new(true),
            cond: Condvar::new(),
        }
    }

    fn open(&self) {
        let mut open = self.open.lock();
        *open = true;
        self.cond.notify_all();
    }

    fn close(&self) {
        *self.open.lock() = false;
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }
}

/// Creates a connected hook/controller pair.
///
/// # Example
/// ```
/// use minic::{Debugger, Runner, NoPrint, StrInput};
///
/// let source = "int main() { int a = 1; a = a + 1; return a; }";
/// let (runner, _warnings) = Runner::new(source.to_owned(), "demo.c").unwrap();
/// let (hook, controller) = Debugger::new(&[(1, 25)], None);
/// std::thread::scope(|scope| {
///     let handle = scope.spawn(move || {
///         runner.run_debug(&hook, &mut NoPrint, &mut StrInput::new(""))
///     });
///     let hit = controller.recv().unwrap();
///     assert_eq!((hit.position.line, hit.position.column), (1, 25));
///     controller.resume();
///     assert_eq!(handle.join().unwrap().unwrap().value(), 2);
/// });
/// ```
#[derive(Debug)]
pub struct Debugger;

impl Debugger {
    /// Builds a hook for the evaluator thread and a controller for the host,
    /// with the given breakpoint positions and an optional queue capacity
    /// (defaults to [`DEFAULT_QUEUE_CAPACITY`]).
    #[must_use]
    pub fn new(breakpoints: &[(u32, u32)], queue_capacity: Option<usize>) -> (DebugHook, DebugController) {
        let gate = Arc::new(Gate::new());
        let (sender, receiver) = bounded(queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY));
        let hook = DebugHook {
            breakpoints: breakpoints
                .iter()
                .map(|&(line, column)| CodeLoc::new(line, column))
                .collect(),
            gate: Arc::clone(&gate),
            sender,
        };
        let controller = DebugController { gate, receiver };
        (hook, controller)
    }
}

/// The evaluator-side half of the protocol.
#[derive(Debug, Clone)]
pub struct DebugHook {
    breakpoints: HashSet<CodeLoc>,
    gate: Arc<Gate>,
    sender: Sender<BreakpointHit>,
}

impl DebugHook {
    /// The pre-execution check: publish a snapshot on a hit, then wait for
    /// the gate regardless (so a controller-initiated pause takes effect at
    /// the next instrumented node).
    ///
    /// Returns whether a snapshot was published, so post-hooks can avoid
    /// publishing a second snapshot for the same node visit.
    pub(crate) fn pre(&self, position: CodeLoc, memory: &Memory) -> bool {
        let hit = self.breakpoints.contains(&position);
        if hit {
            self.publish(position, memory);
        }
        self.gate.wait();
        hit
    }

    /// The post-execution re-check used by assignments, binary operations,
    /// the while body, and return: publishes the post-state unless the
    /// pre-hook already published during this visit.
    pub(crate) fn post(&self, position: CodeLoc, memory: &Memory, already_published: bool) {
        if !already_published && self.breakpoints.contains(&position) {
            self.publish(position, memory);
        }
        self.gate.wait();
    }

    /// Closes the gate, then publishes a snapshot. The gate closes first so
    /// a controller that receives the hit and resumes immediately cannot race
    /// the close; the send blocks until the queue accepts the snapshot, so
    /// resume cannot occur before delivery. A detached controller (dropped
    /// receiver) reopens the gate and the program keeps running.
    fn publish(&self, position: CodeLoc, memory: &Memory) {
        self.gate.close();
        let hit = BreakpointHit {
            position,
            memory: memory.snapshot(),
        };
        if self.sender.send(hit).is_err() {
            self.gate.open();
        }
    }
}

/// The host-side half of the protocol.
#[derive(Debug)]
pub struct DebugController {
    gate: Arc<Gate>,
    receiver: Receiver<BreakpointHit>,
}

impl DebugController {
    /// Blocks until the next breakpoint hit is published.
    ///
    /// # Errors
    /// Fails when the evaluator has finished and dropped its hook.
    pub fn recv(&self) -> Result<BreakpointHit, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&self) -> Result<BreakpointHit, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Reopens the gate, resuming a suspended evaluator.
    pub fn resume(&self) {
        self.gate.open();
    }

    /// Closes the gate; the evaluator suspends at its next instrumented node
    /// without publishing a snapshot. Use [`resume`](Self::resume) to
    /// continue.
    pub fn pause(&self) {
        self.gate.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::Number;
    use crate::value::Value;

    #[test]
    fn snapshots_are_independent_of_later_mutation() {
        let (hook, controller) = Debugger::new(&[(1, 1)], None);
        std::thread::scope(|scope| {
            let handle = scope.spawn(|| {
                let mut memory = Memory::new();
                memory.declare("a", Value::Num(Number::new(1)));
                assert!(hook.pre(CodeLoc::new(1, 1), &memory));
                assert!(memory.set("a", Value::Num(Number::new(2))));
            });
            let hit = controller.recv().unwrap();
            controller.resume();
            handle.join().unwrap();
            assert_eq!(hit.memory.get("a"), Some(&Value::Num(Number::new(1))));
        });
    }

    #[test]
    fn non_breakpoint_positions_do_not_publish_or_block() {
        let (hook, controller) = Debugger::new(&[(5, 1)], None);
        let memory = Memory::new();
        assert!(!hook.pre(CodeLoc::new(1, 1), &memory));
        assert!(matches!(controller.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn post_hook_suppresses_double_publish() {
        let (hook, controller) = Debugger::new(&[(1, 1)], None);
        std::thread::scope(|scope| {
            let handle = scope.spawn(|| {
                let memory = Memory::new();
                let published = hook.pre(CodeLoc::new(1, 1), &memory);
                hook.post(CodeLoc::new(1, 1), &memory, published);
            });
            controller.recv().unwrap();
            controller.resume();
            handle.join().unwrap();
            assert!(matches!(controller.try_recv(), Err(TryRecvError::Empty)));
        });
    }

    #[test]
    fn pause_suspends_until_resumed() {
        let (hook, controller) = Debugger::new(&[], None);
        controller.pause();
        std::thread::scope(|scope| {
            let handle = scope.spawn(|| {
                let memory = Memory::new();
                // Blocks at the closed gate without publishing anything.
                hook.pre(CodeLoc::new(1, 1), &memory);
            });
            controller.resume();
            handle.join().unwrap();
        });
        assert!(matches!(controller.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn detached_controller_does_not_block_the_evaluator() {
        let (hook, controller) = Debugger::new(&[(1, 1)], None);
        drop(controller);
        let memory = Memory::new();
        // Must not deadlock even though the position is a breakpoint.
        hook.pre(CodeLoc::new(1, 1), &memory);
    }
}

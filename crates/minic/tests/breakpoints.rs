//! The breakpoint protocol, driven from a controller thread.

use std::thread;

use minic::{CodeLoc, Debugger, NoPrint, Runner, StrInput};

fn build(source: &str) -> Runner {
    let (runner, _warnings) = Runner::new(source.to_owned(), "test.c").unwrap();
    runner
}

/// A breakpoint on the accumulation statement of a five-iteration loop
/// delivers exactly five snapshots, each frozen before the assignment's
/// side effect.
#[test]
fn loop_breakpoint_sees_pre_assignment_states() {
    let source = "int main() {\n    int s = 0;\n    for (int i = 0; i < 5; i = i + 1)\n        s = s + i;\n    return s;\n}\n";
    let runner = build(source);
    // `s = s + i;` starts at line 4, column 9.
    let (hook, controller) = Debugger::new(&[(4, 9)], None);

    thread::scope(|scope| {
        let handle = scope.spawn(|| {
            let mut print = NoPrint;
            let mut input = StrInput::new("");
            runner.run_debug(&hook, &mut print, &mut input)
        });

        let mut observed = vec![];
        for _ in 0..5 {
            let hit = controller.recv().unwrap();
            assert_eq!(hit.position, CodeLoc::new(4, 9));
            let s = hit.memory.get("s").unwrap().as_number().unwrap();
            observed.push(s.value());
            controller.resume();
        }

        let status = handle.join().unwrap().unwrap();
        assert_eq!(status.value(), 10);
        assert_eq!(observed, vec![0, 0, 1, 3, 6]);
        assert!(controller.recv().is_err(), "no sixth snapshot may exist");
    });
}

#[test]
fn snapshots_are_frozen_copies() {
    let source = "int main() {\n    int a = 1;\n    a = 2;\n    a = 3;\n    return a;\n}\n";
    let runner = build(source);
    // Break on `a = 2;` (line 3, column 5) and hold the snapshot while the
    // program runs to completion.
    let (hook, controller) = Debugger::new(&[(3, 5)], None);

    thread::scope(|scope| {
        let handle = scope.spawn(|| {
            let mut print = NoPrint;
            let mut input = StrInput::new("");
            runner.run_debug(&hook, &mut print, &mut input)
        });

        let hit = controller.recv().unwrap();
        controller.resume();
        let status = handle.join().unwrap().unwrap();
        assert_eq!(status.value(), 3);
        // The held snapshot still shows memory as it was before `a = 2`.
        assert_eq!(hit.memory.get("a").unwrap().as_number().unwrap().value(), 1);
    });
}

#[test]
fn while_body_publishes_each_iteration() {
    let source = "int main() {\n    int n = 3;\n    while (n) n = n - 1;\n    return n;\n}\n";
    let runner = build(source);
    // The while statement starts at line 3, column 5; its hook wraps the body.
    let (hook, controller) = Debugger::new(&[(3, 5)], None);

    thread::scope(|scope| {
        let handle = scope.spawn(|| {
            let mut print = NoPrint;
            let mut input = StrInput::new("");
            runner.run_debug(&hook, &mut print, &mut input)
        });

        let mut observed = vec![];
        while let Ok(hit) = controller.recv() {
            observed.push(hit.memory.get("n").unwrap().as_number().unwrap().value());
            controller.resume();
        }
        assert_eq!(handle.join().unwrap().unwrap().value(), 0);
        // One pre-body snapshot per iteration, each before the decrement.
        assert_eq!(observed, vec![3, 2, 1]);
    });
}

#[test]
fn binary_operation_breakpoint_shows_operand_state() {
    let source = "int main() {\n    int a = 5;\n    a = a + 1;\n    return a;\n}\n";
    let runner = build(source);
    // Line 3 `a = a + 1;`: the right-hand `a` (and therefore the binary
    // production) starts at column 9. Both the variable's pre-hook and the
    // binary operation's post-hook fire there, and both precede the store.
    let (hook, controller) = Debugger::new(&[(3, 9)], None);

    thread::scope(|scope| {
        let handle = scope.spawn(|| {
            let mut print = NoPrint;
            let mut input = StrInput::new("");
            runner.run_debug(&hook, &mut print, &mut input)
        });

        let mut observed = vec![];
        while let Ok(hit) = controller.recv() {
            observed.push(hit.memory.get("a").unwrap().as_number().unwrap().value());
            controller.resume();
        }
        assert_eq!(handle.join().unwrap().unwrap().value(), 6);
        assert_eq!(observed, vec![5, 5]);
    });
}

#[test]
fn hits_arrive_in_program_order() {
    let source = "int main() {\n    int a = 0;\n    a = 1;\n    a = 2;\n    return a;\n}\n";
    let runner = build(source);
    let (hook, controller) = Debugger::new(&[(3, 5), (4, 5)], None);

    thread::scope(|scope| {
        let handle = scope.spawn(|| {
            let mut print = NoPrint;
            let mut input = StrInput::new("");
            runner.run_debug(&hook, &mut print, &mut input)
        });

        let mut positions = vec![];
        while let Ok(hit) = controller.recv() {
            positions.push((hit.position.line, hit.position.column));
            controller.resume();
        }
        handle.join().unwrap().unwrap();
        assert_eq!(positions, vec![(3, 5), (4, 5)]);
    });
}

#[test]
fn breakpoints_inside_called_functions_fire() {
    let source = "int double_it(int x) {\n    return x + x;\n}\nint main() {\n    return double_it(21);\n}\n";
    let runner = build(source);
    // `return x + x;` starts at line 2, column 5.
    let (hook, controller) = Debugger::new(&[(2, 5)], None);

    thread::scope(|scope| {
        let handle = scope.spawn(|| {
            let mut print = NoPrint;
            let mut input = StrInput::new("");
            runner.run_debug(&hook, &mut print, &mut input)
        });

        let hit = controller.recv().unwrap();
        // The callee's frame is live in the snapshot, with the bound parameter.
        assert_eq!(hit.memory.get("x").unwrap().as_number().unwrap().value(), 21);
        controller.resume();
        assert_eq!(handle.join().unwrap().unwrap().value(), 42);
    });
}

#[test]
fn call_frames_unwind_after_return() {
    let source = "int id(int x) {\n    return x;\n}\nint main() {\n    int a = 0;\n    a = id(5);\n    a = a + 1;\n    return a;\n}\n";
    let runner = build(source);
    // Break on `a = a + 1;` (line 7, column 5), after `id` has returned.
    let (hook, controller) = Debugger::new(&[(7, 5)], None);

    thread::scope(|scope| {
        let handle = scope.spawn(|| {
            let mut print = NoPrint;
            let mut input = StrInput::new("");
            runner.run_debug(&hook, &mut print, &mut input)
        });

        let hit = controller.recv().unwrap();
        // The stack depth is back to just main's frame.
        let names: Vec<&str> = hit.memory.frames().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["main"]);
        controller.resume();
        assert_eq!(handle.join().unwrap().unwrap().value(), 6);
    });
}

#[test]
fn memory_dump_renders_frames_and_scopes() {
    let source = "int main() {\n    int alpha = 7;\n    alpha = 8;\n    return alpha;\n}\n";
    let runner = build(source);
    let (hook, controller) = Debugger::new(&[(3, 5)], None);

    thread::scope(|scope| {
        let handle = scope.spawn(|| {
            let mut print = NoPrint;
            let mut input = StrInput::new("");
            runner.run_debug(&hook, &mut print, &mut input)
        });

        let hit = controller.recv().unwrap();
        let dump = hit.memory.to_string();
        assert!(dump.contains("GLOBAL_MEMORY"));
        assert!(dump.contains("Frame: main"));
        assert!(dump.contains("alpha:7"));
        controller.resume();
        handle.join().unwrap().unwrap();
    });
}

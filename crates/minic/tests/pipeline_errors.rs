//! Diagnostics across the three pipeline stages, plus runtime failures.

use minic::{CollectStringPrint, ErrorKind, NoPrint, ResourceLimits, Runner, StrInput};

fn build_err(source: &str) -> minic::Exception {
    Runner::new(source.to_owned(), "test.c").unwrap_err()
}

fn run_err(source: &str, input: &str) -> minic::Exception {
    let (runner, _warnings) = Runner::new(source.to_owned(), "test.c").unwrap();
    let mut out = CollectStringPrint::new();
    let mut stdin = StrInput::new(input);
    runner.run(&mut out, &mut stdin).unwrap_err()
}

#[test]
fn unrecognized_character_fails_lexically() {
    let err = build_err("int main() { int a @ 3; return a; }");
    assert_eq!(err.kind, ErrorKind::LexicalError);
    assert!(err.position.is_some());
}

#[test]
fn token_mismatch_fails_syntactically() {
    let err = build_err("int main() { return 0 }");
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    assert_eq!(err.to_string(), "[SyntaxError] Expected token <SEMICOLON> but found <RBRACE> at line 1.");
}

#[test]
fn undeclared_identifier_fails_semantically() {
    let err = build_err("int main() { return nope; }");
    assert_eq!(err.kind, ErrorKind::SemanticError);
}

#[test]
fn missing_main_fails_semantically() {
    let err = build_err("int helper() { return 1; }");
    assert_eq!(err.kind, ErrorKind::SemanticError);
    assert!(err.message.contains("main"));
}

#[test]
fn warnings_do_not_block_execution() {
    let (runner, warnings) =
        Runner::new("int main() { char c; c = 1000; return c; }".to_owned(), "test.c").unwrap();
    assert_eq!(warnings.len(), 1);
    let status = runner.run(&mut NoPrint, &mut StrInput::new("")).unwrap();
    assert_eq!(status.value(), 1000);
}

#[test]
fn division_by_zero_aborts_with_position() {
    let err = run_err("int main() {\n    int a = 0;\n    return 1 / a;\n}", "");
    assert_eq!(err.kind, ErrorKind::RuntimeError);
    assert!(err.message.contains("Division by zero"));
    assert_eq!(err.position.map(|p| p.line), Some(3));
}

#[test]
fn modulo_by_zero_aborts() {
    let err = run_err("int main() { int a = 0; return 1 % a; }", "");
    assert!(err.message.contains("Modulo by zero"));
}

#[test]
fn compound_division_by_zero_aborts() {
    let err = run_err("int main() { int a = 4; int b = 0; a /= b; return a; }", "");
    assert!(err.message.contains("Division by zero"));
}

#[test]
fn scanf_argument_count_mismatch_aborts() {
    let err = run_err(
        "#include <stdio.h>\nint main() { int a; scanf(\"%d %d\", &a); return a; }",
        "1 2\n",
    );
    assert_eq!(err.kind, ErrorKind::RuntimeError);
    assert!(err.message.contains("positional arguments"));
}

#[test]
fn scanf_non_d_conversion_aborts() {
    let err = run_err(
        "#include <stdio.h>\nint main() { int a; scanf(\"%f\", &a); return a; }",
        "1.5\n",
    );
    assert!(err.message.contains("not allowed"));
}

#[test]
fn scanf_bad_field_aborts() {
    let err = run_err(
        "#include <stdio.h>\nint main() { int a; scanf(\"%d\", &a); return a; }",
        "twelve\n",
    );
    assert!(err.message.contains("invalid input"));
}

#[test]
fn printf_bad_conversion_aborts() {
    let err = run_err("#include <stdio.h>\nint main() { printf(\"%q\", 1); return 0; }", "");
    assert!(err.message.contains("unsupported conversion"));
}

#[test]
fn runaway_recursion_hits_the_depth_limit() {
    let source = "int loop_forever(int n) { return loop_forever(n + 1); }\nint main() { return loop_forever(0); }";
    let (runner, _warnings) = Runner::new(source.to_owned(), "test.c").unwrap();
    let limits = ResourceLimits { max_stack_depth: 16 };
    let err = runner
        .run_with(None, limits, &mut NoPrint, &mut StrInput::new(""), &mut minic::NoopTracer)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RuntimeError);
    assert!(err.message.contains("call depth"));
}

#[test]
fn break_outside_a_loop_aborts() {
    let err = run_err("int main() { break; return 0; }", "");
    assert_eq!(err.kind, ErrorKind::RuntimeError);
}

#[test]
fn runners_survive_a_dump_load_round_trip() {
    let source = "int main(){ int s=0; for (int i=0;i<5;i=i+1) s=s+i; return s; }";
    let (runner, _warnings) = Runner::new(source.to_owned(), "test.c").unwrap();
    let bytes = runner.dump().unwrap();
    let restored = Runner::load(&bytes).unwrap();
    assert_eq!(restored.code(), source);
    let status = restored.run(&mut NoPrint, &mut StrInput::new("")).unwrap();
    assert_eq!(status.value(), 10);
}

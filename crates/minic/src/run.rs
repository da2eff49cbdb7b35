//! Public interface for running C-subset programs.

use serde::{Deserialize, Serialize};

use crate::{
    analyze,
    ast::Program,
    debug::DebugHook,
    error::{Exception, TypeWarning},
    interp::Interpreter,
    io::{InputReader, PrintWriter},
    number::Number,
    parse,
    resource::ResourceLimits,
    tracer::{EvalTracer, NoopTracer},
};

/// A parsed and semantically checked program, ready to execute.
///
/// Construction runs the front half of the pipeline (lexer, parser,
/// analyzer); lexical, syntactic, and semantic errors are reported before
/// anything executes. Each `run_*` call then interprets the tree from a
/// fresh memory.
///
/// The AST is immutable after parsing, so a `Runner` can be shared by
/// reference across threads, which is how the breakpoint protocol's
/// evaluator thread receives it.
///
/// # Example
/// ```
/// use minic::{CollectStringPrint, Runner, StrInput};
///
/// let source = r#"
/// #include <stdio.h>
/// int main() { printf("hi"); return 0; }
/// "#;
/// let (runner, warnings) = Runner::new(source.to_owned(), "hello.c").unwrap();
/// assert!(warnings.is_empty());
/// let mut out = CollectStringPrint::new();
/// let status = runner.run(&mut out, &mut StrInput::new("")).unwrap();
/// assert_eq!(status.value(), 0);
/// assert_eq!(out.output(), "hi");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runner {
    code: String,
    script_name: String,
    program: Program,
}

impl Runner {
    /// Parses and analyzes `code`.
    ///
    /// # Errors
    /// Returns the first lexical, syntax, or semantic error. On success the
    /// analyzer's non-fatal type warnings are returned alongside the runner;
    /// the host decides whether to print them.
    pub fn new(code: String, script_name: &str) -> Result<(Self, Vec<TypeWarning>), Exception> {
        let program = parse::parse(&code)?;
        let warnings = analyze::analyze(&program)?;
        Ok((
            Self {
                code,
                script_name: script_name.to_owned(),
                program,
            },
            warnings,
        ))
    }

    /// The source text this runner was built from.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// The parsed tree, for external consumers such as AST dumpers.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Executes the program to completion and returns `main`'s value.
    ///
    /// # Errors
    /// Returns a `RuntimeError` diagnostic if execution aborts.
    pub fn run(&self, print: &mut impl PrintWriter, input: &mut impl InputReader) -> Result<Number, Exception> {
        self.run_with(None, ResourceLimits::default(), print, input, &mut NoopTracer)
    }

    /// Executes with a tracer observing evaluation.
    pub fn run_traced(
        &self,
        print: &mut impl PrintWriter,
        input: &mut impl InputReader,
        tracer: &mut impl EvalTracer,
    ) -> Result<Number, Exception> {
        self.run_with(None, ResourceLimits::default(), print, input, tracer)
    }

    /// Executes under a breakpoint hook. The caller typically moves this call
    /// onto its own thread and drives the matching
    /// [`DebugController`](crate::DebugController) from the host thread; see
    /// the [`Debugger`](crate::Debugger) example.
    pub fn run_debug(
        &self,
        hook: &DebugHook,
        print: &mut impl PrintWriter,
        input: &mut impl InputReader,
    ) -> Result<Number, Exception> {
        self.run_with(Some(hook), ResourceLimits::default(), print, input, &mut NoopTracer)
    }

    /// Fully parameterized execution: optional breakpoint hook, resource
    /// limits, and tracer.
    pub fn run_with(
        &self,
        hook: Option<&DebugHook>,
        limits: ResourceLimits,
        print: &mut impl PrintWriter,
        input: &mut impl InputReader,
        tracer: &mut impl EvalTracer,
    ) -> Result<Number, Exception> {
        Interpreter::new(&self.program, hook, limits, print, input, tracer).interpret()
    }

    /// Serializes the parsed program to a binary format, allowing hosts to
    /// cache parsed code and skip re-parsing on subsequent runs.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn dump(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Restores a runner serialized with [`dump`](Self::dump).
    ///
    /// # Errors
    /// Returns an error if deserialization fails.
    pub fn load(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

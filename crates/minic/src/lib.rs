#![doc = include_str!("../../../README.md")]

mod analyze;
mod ast;
mod debug;
mod error;
mod interp;
mod io;
mod lexer;
mod memory;
mod modules;
mod number;
mod parse;
mod resource;
mod run;
mod structs;
mod token;
mod tracer;
mod value;

pub use crate::{
    ast::{AssignOp, AssignTarget, Expr, ExprLoc, FunctionDecl, Operator, Param, Program, Stmt, StmtLoc, TypeName, UnaryOp},
    debug::{BreakpointHit, DEFAULT_QUEUE_CAPACITY, DebugController, DebugHook, Debugger},
    error::{CodeLoc, ErrorKind, Exception, TypeWarning},
    io::{CollectStringPrint, InputReader, NoPrint, PrintWriter, StdInput, StdPrint, StrInput},
    memory::{Frame, Memory, Scope},
    modules::Builtin,
    number::Number,
    resource::{DEFAULT_MAX_STACK_DEPTH, ResourceLimits},
    run::Runner,
    tracer::{EvalTracer, NoopTracer, StderrTracer},
    value::{FunctionRef, StructRecord, Value},
};

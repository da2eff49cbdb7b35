//! The tree-walking evaluator.
//!
//! Each statement or expression visit first consults the breakpoint hook,
//! then evaluates; assignments, binary operations, the while body, and
//! return additionally re-check afterwards so a controller sees the
//! post-state. Control flow is threaded through [`Flow`]: a `Return`
//! short-circuits the rest of a function body, `Break`/`Continue` unwind to
//! the innermost loop.

use smallvec::SmallVec;

use crate::{
    ast::{AssignTarget, Expr, ExprLoc, FunctionDecl, Operator, Program, Stmt, StmtLoc, UnaryOp},
    debug::DebugHook,
    error::{CodeLoc, Exception, RunResult},
    io::{InputReader, PrintWriter},
    memory::Memory,
    modules,
    number::Number,
    resource::ResourceLimits,
    structs::StructRegistry,
    tracer::EvalTracer,
    value::{FunctionRef, Value},
};

/// How a statement finished.
#[derive(Debug)]
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// A user function registered at load time, with the position of its
/// declaration for the call-time breakpoint hook.
#[derive(Clone, Copy)]
struct FunctionEntry<'ast> {
    decl: &'ast FunctionDecl,
    position: CodeLoc,
}

pub(crate) struct Interpreter<'run, P, R, T> {
    program: &'run Program,
    functions: Vec<FunctionEntry<'run>>,
    memory: Memory,
    structs: StructRegistry,
    limits: ResourceLimits,
    hook: Option<&'run DebugHook>,
    print: &'run mut P,
    input: &'run mut R,
    tracer: &'run mut T,
}

impl<'run, P: PrintWriter, R: InputReader, T: EvalTracer> Interpreter<'run, P, R, T> {
    pub fn new(
        program: &'run Program,
        hook: Option<&'run DebugHook>,
        limits: ResourceLimits,
        print: &'run mut P,
        input: &'run mut R,
        tracer: &'run mut T,
    ) -> Self {
        Self {
            program,
            functions: vec![],
            memory: Memory::new(),
            structs: StructRegistry::default(),
            limits,
            hook,
            print,
            input,
            tracer,
        }
    }

    /// Runs the program: loads built-ins, struct layouts, and functions into
    /// the global scope, evaluates top-level declarations, then calls `main`.
    ///
    /// The result is the value returned by `main`, or 0 when `main` falls off
    /// the end of its body.
    pub fn interpret(mut self) -> RunResult<Number> {
        let program = self.program;
        self.load_globals(program)?;

        self.hook_pre(program.position);
        for stmt in &program.body {
            match &stmt.stmt {
                Stmt::Include { .. } | Stmt::StructType { .. } | Stmt::Function(_) => {}
                _ => {
                    self.eval_stmt(stmt)?;
                }
            }
        }

        let main = self.memory.get("main").cloned();
        let Some(Value::Function(main_ref)) = main else {
            // The analyzer guarantees main exists; anything else is a bug.
            return Err(Exception::runtime("Function 'main' not found", program.position));
        };
        let result = self.call_function(&main_ref, SmallVec::new(), program.position)?;
        Ok(result.as_number().unwrap_or(Number::ZERO))
    }

    /// Registers includes, struct layouts, and user functions in order.
    fn load_globals(&mut self, program: &'run Program) -> RunResult<()> {
        for stmt in &program.body {
            match &stmt.stmt {
                Stmt::Include { library } => self.load_library(library, stmt.position)?,
                Stmt::StructType { name, body } => self.structs.create(name, body, stmt.position)?,
                Stmt::Function(decl) => {
                    let index = self.functions.len() as u32;
                    self.functions.push(FunctionEntry {
                        decl: decl.as_ref(),
                        position: stmt.position,
                    });
                    self.memory.declare(
                        decl.name.clone(),
                        Value::Function(FunctionRef {
                            index,
                            name: decl.name.clone(),
                        }),
                    );
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn load_library(&mut self, library: &str, position: CodeLoc) -> RunResult<()> {
        let functions = modules::library(library)
            .ok_or_else(|| Exception::runtime(format!("Unknown library <{library}.h>"), position))?;
        for spec in functions {
            self.memory.declare(spec.name, Value::Builtin(spec.builtin));
        }
        Ok(())
    }

    // === breakpoint hooks ===

    /// Pre-execution hook; returns whether a snapshot was published.
    fn hook_pre(&mut self, position: CodeLoc) -> bool {
        let Some(hook) = self.hook else { return false };
        let published = hook.pre(position, &self.memory);
        if published {
            self.tracer.on_breakpoint(position);
        }
        published
    }

    /// Post-execution re-check for the node kinds that expose their
    /// post-state; never publishes twice for one visit.
    fn hook_post(&mut self, position: CodeLoc, already_published: bool) {
        if let Some(hook) = self.hook {
            hook.post(position, &self.memory, already_published);
        }
    }

    // === statements ===

    fn eval_stmt(&mut self, stmt: &StmtLoc) -> RunResult<Flow> {
        let position = stmt.position;
        self.tracer.on_stmt(position, stmt_kind(&stmt.stmt));
        match &stmt.stmt {
            Stmt::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::VarDecl { name, .. } => {
                self.memory.declare(name.clone(), Value::Num(Number::ZERO));
                Ok(Flow::Normal)
            }
            Stmt::StructDecl { struct_type, name } => {
                self.structs.declare(struct_type, name, &mut self.memory, position)?;
                Ok(Flow::Normal)
            }
            // Local struct layouts register on first execution.
            Stmt::StructType { name, body } => {
                self.structs.create(name, body, position)?;
                Ok(Flow::Normal)
            }
            // Includes are resolved during loading.
            Stmt::Include { .. } | Stmt::Function(_) => Ok(Flow::Normal),
            Stmt::Compound(children) => {
                self.hook_pre(position);
                self.memory.new_scope();
                let flow = self.eval_block(children);
                self.memory.del_scope();
                flow
            }
            Stmt::If { cond, then_body, else_body } => {
                self.hook_pre(position);
                if self.eval_number(cond)?.truthy() {
                    self.eval_stmt(then_body)
                } else if let Some(else_body) = else_body {
                    self.eval_stmt(else_body)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body } => self.eval_while(position, cond, body),
            Stmt::DoWhile { cond, body } => self.eval_do_while(position, cond, body),
            Stmt::For { init, cond, step, body } => {
                self.hook_pre(position);
                self.memory.new_scope();
                let flow = self.eval_for(init, cond.as_ref(), step.as_ref(), body);
                self.memory.del_scope();
                flow
            }
            Stmt::Return { value } => {
                let result = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Num(Number::ZERO),
                };
                self.hook_post(position, false);
                Ok(Flow::Return(result))
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::NoOp => Ok(Flow::Normal),
        }
    }

    fn eval_block(&mut self, body: &[StmtLoc]) -> RunResult<Flow> {
        for stmt in body {
            match self.eval_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_while(&mut self, position: CodeLoc, cond: &ExprLoc, body: &StmtLoc) -> RunResult<Flow> {
        loop {
            if !self.eval_number(cond)?.truthy() {
                return Ok(Flow::Normal);
            }
            let published = self.hook_pre(position);
            let flow = self.eval_stmt(body)?;
            self.hook_post(position, published);
            match flow {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
            }
        }
    }

    fn eval_do_while(&mut self, position: CodeLoc, cond: &ExprLoc, body: &StmtLoc) -> RunResult<Flow> {
        loop {
            let published = self.hook_pre(position);
            let flow = self.eval_stmt(body)?;
            self.hook_post(position, published);
            match flow {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
            }
            if !self.eval_number(cond)?.truthy() {
                return Ok(Flow::Normal);
            }
        }
    }

    fn eval_for(
        &mut self,
        init: &[StmtLoc],
        cond: Option<&ExprLoc>,
        step: Option<&ExprLoc>,
        body: &StmtLoc,
    ) -> RunResult<Flow> {
        for stmt in init {
            self.eval_stmt(stmt)?;
        }
        loop {
            if let Some(cond) = cond
                && !self.eval_number(cond)?.truthy()
            {
                return Ok(Flow::Normal);
            }
            match self.eval_stmt(body)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
            }
            if let Some(step) = step {
                self.eval_expr(step)?;
            }
        }
    }

    // === expressions ===

    fn eval_expr(&mut self, expr: &ExprLoc) -> RunResult<Value> {
        let position = expr.position;
        match &expr.expr {
            Expr::Int(value) => {
                self.hook_pre(position);
                Ok(Value::Num(Number::new(*value)))
            }
            Expr::Char(value) => {
                self.hook_pre(position);
                Ok(Value::Num(Number::new(u32::from(*value))))
            }
            Expr::Str(text) => {
                self.hook_pre(position);
                Ok(Value::Str(text.clone()))
            }
            Expr::Var(name) => {
                self.hook_pre(position);
                self.memory
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Exception::runtime(format!("Unknown identifier '{name}'"), position))
            }
            Expr::StructVar { container, field_path } => {
                self.hook_pre(position);
                self.memory.get_field(container, field_path).cloned().ok_or_else(|| {
                    Exception::runtime(
                        format!("Unknown struct field '{container}.{}'", field_path.join(".")),
                        position,
                    )
                })
            }
            Expr::Unary { op, prefix, operand } => {
                self.hook_pre(position);
                self.eval_unary(*op, *prefix, operand, position)
            }
            Expr::Binary { op, left, right } => {
                let value = match op {
                    // The right operand of a short-circuit operator is not
                    // evaluated when the left decides the result.
                    Operator::And => {
                        if self.eval_number(left)?.truthy() {
                            Number::new(u32::from(self.eval_number(right)?.truthy()))
                        } else {
                            Number::ZERO
                        }
                    }
                    Operator::Or => {
                        if self.eval_number(left)?.truthy() {
                            Number::ONE
                        } else {
                            Number::new(u32::from(self.eval_number(right)?.truthy()))
                        }
                    }
                    _ => {
                        let left = self.eval_number(left)?;
                        let right = self.eval_number(right)?;
                        left.binary(*op, right)
                            .map_err(|err| Exception::runtime(err.to_string(), position))?
                    }
                };
                self.hook_post(position, false);
                Ok(Value::Num(value))
            }
            Expr::Ternary { cond, then_expr, else_expr } => {
                if self.eval_number(cond)?.truthy() {
                    self.eval_expr(then_expr)
                } else {
                    self.eval_expr(else_expr)
                }
            }
            Expr::Assign { target, op, value } => {
                let published = self.hook_pre(position);
                let rhs = self.eval_expr(value)?;
                let new_value = match op.operator() {
                    None => rhs,
                    Some(binop) => {
                        let current = self.read_target(target, position)?;
                        let rhs = rhs.as_number().ok_or_else(|| {
                            Exception::runtime(
                                format!("Expected a numeric value, found {}", rhs.type_name()),
                                position,
                            )
                        })?;
                        Value::Num(
                            current
                                .binary(binop, rhs)
                                .map_err(|err| Exception::runtime(err.to_string(), position))?,
                        )
                    }
                };
                self.write_target(target, new_value.clone(), position)?;
                self.hook_post(position, published);
                Ok(new_value)
            }
            Expr::Call { name, args } => self.eval_call(name, args, position),
            Expr::Comma(children) => {
                let mut last = Value::Num(Number::ZERO);
                for child in children {
                    last = self.eval_expr(child)?;
                }
                Ok(last)
            }
        }
    }

    fn eval_number(&mut self, expr: &ExprLoc) -> RunResult<Number> {
        let value = self.eval_expr(expr)?;
        value.as_number().ok_or_else(|| {
            Exception::runtime(
                format!("Expected a numeric value, found {}", value.type_name()),
                expr.position,
            )
        })
    }

    fn eval_unary(&mut self, op: UnaryOp, prefix: bool, operand: &ExprLoc, position: CodeLoc) -> RunResult<Value> {
        match op {
            // `&x` yields the name as a pseudo-address without evaluating x.
            UnaryOp::Addr => match &operand.expr {
                Expr::Var(name) => Ok(Value::Addr(name.clone())),
                Expr::StructVar { container, field_path } => {
                    Ok(Value::Addr(format!("{container}.{}", field_path.join("."))))
                }
                _ => Err(Exception::runtime("'&' requires a variable operand", position)),
            },
            UnaryOp::Inc | UnaryOp::Dec => {
                let target = unary_target(operand, position)?;
                let old = self.read_target(&target, position)?;
                let new = if op == UnaryOp::Inc {
                    old + Number::ONE
                } else {
                    old - Number::ONE
                };
                self.write_target(&target, Value::Num(new), position)?;
                // Prefix yields the mutated value, postfix the original.
                Ok(Value::Num(if prefix { new } else { old }))
            }
            UnaryOp::Minus => Ok(Value::Num(self.eval_number(operand)?.neg())),
            UnaryOp::Plus => Ok(Value::Num(self.eval_number(operand)?)),
            UnaryOp::Not => Ok(Value::Num(self.eval_number(operand)?.not())),
            // The analyzer already tracked the promoted type; the value is
            // preserved at runtime.
            UnaryOp::Cast(_) => self.eval_expr(operand),
        }
    }

    fn read_target(&mut self, target: &AssignTarget, position: CodeLoc) -> RunResult<Number> {
        let value = match target {
            AssignTarget::Var(name) => self.memory.get(name),
            AssignTarget::Field { container, path } => self.memory.get_field(container, path),
        };
        let value = value.ok_or_else(|| Exception::runtime(format!("Unknown identifier '{}'", target_name(target)), position))?;
        value.as_number().ok_or_else(|| {
            Exception::runtime(
                format!("Expected a numeric value, found {}", value.type_name()),
                position,
            )
        })
    }

    fn write_target(&mut self, target: &AssignTarget, value: Value, position: CodeLoc) -> RunResult<()> {
        let written = match target {
            AssignTarget::Var(name) => self.memory.set(name, value),
            AssignTarget::Field { container, path } => self.memory.set_field(container, path, value),
        };
        if written {
            Ok(())
        } else {
            Err(Exception::runtime(
                format!("Unknown identifier '{}'", target_name(target)),
                position,
            ))
        }
    }

    fn eval_call(&mut self, name: &str, args: &[ExprLoc], position: CodeLoc) -> RunResult<Value> {
        self.hook_pre(position);

        let callee = self
            .memory
            .get(name)
            .cloned()
            .ok_or_else(|| Exception::runtime(format!("Function '{name}' not found"), position))?;

        // Arguments evaluate left to right in the caller's frame.
        let mut values: SmallVec<[Value; 4]> = SmallVec::new();
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }

        match callee {
            Value::Function(func) => {
                self.tracer.on_call(name, position);
                let result = self.call_function(&func, values, position);
                self.tracer.on_return(name);
                result
            }
            Value::Builtin(builtin) => {
                self.tracer.on_call(name, position);
                let result = modules::invoke(builtin, &values, &mut self.memory, self.print, self.input, position);
                self.tracer.on_return(name);
                result
            }
            other => Err(Exception::runtime(
                format!("Identifier '{name}' of type {} cannot be called", other.type_name()),
                position,
            )),
        }
    }

    /// Calls a user function: push a frame, bind parameters in call order,
    /// evaluate the body, pop the frame on every exit path.
    fn call_function(&mut self, func: &FunctionRef, args: SmallVec<[Value; 4]>, position: CodeLoc) -> RunResult<Value> {
        let entry = self.functions[func.index as usize];
        if entry.decl.params.len() != args.len() {
            return Err(Exception::runtime(
                format!(
                    "Function {} takes {} positional arguments but {} were given",
                    func.name,
                    entry.decl.params.len(),
                    args.len()
                ),
                position,
            ));
        }
        self.limits.check_stack_depth(self.memory.stack_depth(), position)?;

        self.memory.new_frame(&entry.decl.name);
        for (param, value) in entry.decl.params.iter().zip(args) {
            self.memory.declare(param.name.clone(), value);
        }
        self.hook_pre(entry.position);
        let flow = self.eval_block(&entry.decl.body);
        self.memory.del_frame();

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Num(Number::ZERO)),
            Flow::Break | Flow::Continue => Err(Exception::runtime(
                format!("'break' or 'continue' outside of a loop in function {}", func.name),
                position,
            )),
        }
    }
}

fn unary_target(operand: &ExprLoc, position: CodeLoc) -> RunResult<AssignTarget> {
    match &operand.expr {
        Expr::Var(name) => Ok(AssignTarget::Var(name.clone())),
        Expr::StructVar { container, field_path } => Ok(AssignTarget::Field {
            container: container.clone(),
            path: field_path.clone(),
        }),
        _ => Err(Exception::runtime("'++'/'--' require a variable operand", position)),
    }
}

fn target_name(target: &AssignTarget) -> String {
    match target {
        AssignTarget::Var(name) => name.clone(),
        AssignTarget::Field { container, path } => format!("{container}.{}", path.join(".")),
    }
}

fn stmt_kind(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::Include { .. } => "include",
        Stmt::VarDecl { .. } => "var-decl",
        Stmt::StructDecl { .. } => "struct-decl",
        Stmt::StructType { .. } => "struct-type",
        Stmt::Function(_) => "function-decl",
        Stmt::Expr(_) => "expression",
        Stmt::Compound(_) => "compound",
        Stmt::If { .. } => "if",
        Stmt::While { .. } => "while",
        Stmt::DoWhile { .. } => "do-while",
        Stmt::For { .. } => "for",
        Stmt::Return { .. } => "return",
        Stmt::Break => "break",
        Stmt::Continue => "continue",
        Stmt::NoOp => "no-op",
    }
}

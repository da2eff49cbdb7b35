use std::{env, fs, process::ExitCode, thread};

use minic::{Debugger, Exception, Number, Runner, StdInput, StdPrint, StderrTracer, TypeWarning};

const FAIL: &str = "\x1b[91m";
const OKBLUE: &str = "\x1b[94m";
const WARNING: &str = "\x1b[93m";
const ENDC: &str = "\x1b[0m";

struct Args {
    file: String,
    breakpoints: Vec<(u32, u32)>,
    trace: bool,
}

fn usage() -> ExitCode {
    eprintln!("usage: minic <file.c> [--break LINE:COL]... [--trace]");
    ExitCode::FAILURE
}

fn parse_args() -> Result<Args, ExitCode> {
    let mut args = env::args().skip(1);
    let mut file = None;
    let mut breakpoints = vec![];
    let mut trace = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--break" => {
                let spec = args.next().ok_or_else(usage)?;
                let parsed = spec
                    .split_once(':')
                    .and_then(|(line, col)| Some((line.parse().ok()?, col.parse().ok()?)));
                match parsed {
                    Some(breakpoint) => breakpoints.push(breakpoint),
                    None => {
                        eprintln!("invalid --break position '{spec}', expected LINE:COL");
                        return Err(ExitCode::FAILURE);
                    }
                }
            }
            "--trace" => trace = true,
            _ if file.is_none() => file = Some(arg),
            _ => return Err(usage()),
        }
    }
    match file {
        Some(file) => Ok(Args { file, breakpoints, trace }),
        None => Err(usage()),
    }
}

fn print_error(err: &Exception) {
    eprintln!("{FAIL}{err}{ENDC}");
}

fn print_warnings(warnings: &[TypeWarning]) {
    for warning in warnings {
        eprintln!("{WARNING}{warning}{ENDC}");
    }
}

fn banner(status: i64) {
    eprintln!("{OKBLUE}Process terminated with status {status}{ENDC}");
}

fn execute(runner: &Runner, args: &Args) -> Result<Number, Exception> {
    let mut print = StdPrint::new();
    let mut input = StdInput::new();
    let result = if args.breakpoints.is_empty() {
        if args.trace {
            runner.run_traced(&mut print, &mut input, &mut StderrTracer)
        } else {
            runner.run(&mut print, &mut input)
        }
    } else {
        let (hook, controller) = Debugger::new(&args.breakpoints, None);
        thread::scope(|scope| {
            // The controller prints each frozen memory view and immediately
            // resumes; it exits when the evaluator drops its hook.
            scope.spawn(|| {
                while let Ok(hit) = controller.recv() {
                    eprintln!("Breakpoint at {}", hit.position);
                    eprintln!("{}", hit.memory);
                    controller.resume();
                }
            });
            let result = if args.trace {
                runner.run_with(
                    Some(&hook),
                    minic::ResourceLimits::default(),
                    &mut print,
                    &mut input,
                    &mut StderrTracer,
                )
            } else {
                runner.run_debug(&hook, &mut print, &mut input)
            };
            drop(hook);
            result
        })
    };
    // Flush buffered program output before any banner goes to stderr.
    drop(print);
    result
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(code) => return code,
    };

    let code = match fs::read_to_string(&args.file) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{FAIL}Cannot read {}: {err}{ENDC}", args.file);
            return ExitCode::FAILURE;
        }
    };

    let (runner, warnings) = match Runner::new(code, &args.file) {
        Ok(built) => built,
        Err(err) => {
            print_error(&err);
            banner(-1);
            return ExitCode::from(255);
        }
    };
    print_warnings(&warnings);

    match execute(&runner, &args) {
        Ok(status) => {
            banner(i64::from(status.value()));
            ExitCode::from((status.value() & 0xff) as u8)
        }
        Err(err) => {
            print_error(&err);
            banner(-1);
            ExitCode::from(255)
        }
    }
}

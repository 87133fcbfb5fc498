//! Slip — interactive REPL and script runner.
//!
//! With no arguments, reads forms line by line at a `"> "` prompt.  Each
//! top-level form is preceded by a collection rooted at the global scope;
//! results print in S-expression form, evaluation errors as `Error:\t…`,
//! and parse errors with the offending line and a caret.
//!
//! Files given on the command line (and `--eval` forms) run first; without
//! `--interactive` the process exits when they are done.

use std::path::PathBuf;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use slip_core::lang::builtins::{install_repl_runtime, install_stdlib};
use slip_core::lang::eval::eval;
use slip_core::lang::load;
use slip_core::lang::parser::{read_expr, render_parse_error};
use slip_core::lang::print::print_value;
use slip_core::lang::tokenizer::next_token;
use slip_core::{Heap, Scope};

struct CliArgs {
    files: Vec<PathBuf>,
    evals: Vec<String>,
    interactive: bool,
}

fn parse_args() -> CliArgs {
    let mut args = CliArgs {
        files: Vec::new(),
        evals: Vec::new(),
        interactive: false,
    };

    let mut argv = std::env::args().skip(1);
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--eval" | "-e" => {
                let Some(expr) = argv.next() else {
                    eprintln!("--eval requires an expression");
                    std::process::exit(2);
                };
                args.evals.push(expr);
            }
            "--interactive" | "-i" => args.interactive = true,
            "--help" | "-h" => {
                println!("usage: slip-repl [OPTIONS] [FILE]...");
                println!();
                println!("  -e, --eval EXPR    evaluate EXPR after loading files");
                println!("  -i, --interactive  enter the REPL after files and evals");
                println!("  -h, --help         show this help");
                std::process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("unknown option: {other}");
                std::process::exit(2);
            }
            other => args.files.push(PathBuf::from(other)),
        }
    }

    args
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();

    let mut heap = Heap::new();
    let mut scope = Scope::new(&mut heap);
    install_stdlib(&mut heap, &mut scope);
    install_repl_runtime(&mut heap, &mut scope);
    log::debug!("stdlib installed, {} live objects", heap.allocated_count());

    let mut failed = false;
    for file in &args.files {
        heap.collect(scope.expr);
        if let Err(error) = load::load_file(&mut heap, &mut scope, file) {
            eprintln!("Error:\t{}", print_value(&heap, error));
            failed = true;
        }
    }
    for source in &args.evals {
        failed |= !eval_line(&mut heap, &mut scope, source);
    }

    let ran_scripts = !args.files.is_empty() || !args.evals.is_empty();
    if ran_scripts && !args.interactive {
        std::process::exit(if failed { 1 } else { 0 });
    }

    repl(&mut heap, &mut scope);
}

fn repl(heap: &mut Heap, scope: &mut Scope) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(error) => {
            eprintln!("could not initialize line editor: {error}");
            std::process::exit(1);
        }
    };

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(&line);
                }
                eval_line(heap, scope, &line);
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(error) => {
                eprintln!("read error: {error}");
                break;
            }
        }
    }
}

/// Evaluate every form on a line, collecting before each one.  Returns
/// false when the line stopped on an error.
fn eval_line(heap: &mut Heap, scope: &mut Scope, line: &str) -> bool {
    let mut pos = 0;
    loop {
        let tok = next_token(line, pos);
        if tok.is_empty() {
            return true;
        }

        heap.collect(scope.expr);

        let (expr, end) = match read_expr(heap, line, pos) {
            Ok(parsed) => parsed,
            Err(error) => {
                eprintln!("{}", render_parse_error(line, &error));
                return false;
            }
        };

        match eval(heap, scope, expr) {
            Ok(value) => println!("{}", print_value(heap, value)),
            Err(error) => {
                eprintln!("Error:\t{}", print_value(heap, error));
                return false;
            }
        }

        pos = end;
    }
}

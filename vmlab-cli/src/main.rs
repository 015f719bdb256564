//! vmlab CLI: check, run, trace and disassemble abstract machine assembly.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Usage/input/assembly error
//! - 2: Link error (a referenced label is never defined)
//! - 3: Execution fault

mod commands;

use std::process;

use tracing::Level;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let verbose = args[1..].iter().any(|a| a == "-v" || a == "--verbose");
    init_logging(verbose);

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let rest: Vec<String> = args[2..]
        .iter()
        .filter(|a| *a != "-v" && *a != "--verbose")
        .cloned()
        .collect();

    let result = match args[1].as_str() {
        "check" => commands::check(&rest),
        "run" => commands::run(&rest),
        "trace" => commands::trace(&rest),
        "disassemble" => commands::disassemble(&rest),
        "--help" | "-h" | "help" => {
            print_usage();
            process::exit(0);
        }
        other => {
            eprintln!("error: unknown command '{other}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

/// Log to stderr. `RUST_LOG` refines the filter; the default level is
/// `warn`, or `debug` with `-v`.
fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

fn print_usage() {
    eprintln!("Usage: vmlab <command> <file> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  check <file>                 Assemble and link, report errors");
    eprintln!("  run <file> [--all]           Run to completion and print the result");
    eprintln!("  trace <file>                 Run step by step, printing registers");
    eprintln!("  disassemble <file> [--listing]  Print canonical assembly");
    eprintln!("  help                         Show this message");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --machine mama|wim           Instruction set (default: from .mama/.wim extension)");
    eprintln!("  --max-steps N                Stop with a fault after N steps");
    eprintln!("  --history N                  Snapshots kept for undo (default 1024)");
    eprintln!("  --all                        WiM: print every answer, not just the first");
    eprintln!("  -v, --verbose                Debug logging on stderr");
}

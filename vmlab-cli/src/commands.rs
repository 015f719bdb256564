//! CLI command implementations.
//!
//! Every command returns `Err(exit_code)` after printing its own message to
//! stderr.

use std::fs;
use std::path::Path;

use tracing::{debug, info};
use vmlab_assembler::AsmError;
use vmlab_common::{CodeAddr, ExecError, Fault, VmConfig};
use vmlab_vm::mama::{self, MamaInstr};
use vmlab_vm::wim::{self, WimInstr};
use vmlab_vm::{Instruction, Program, Vm};

/// The instruction set a file is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Machine {
    Mama,
    Wim,
}

impl Machine {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mama" => Some(Machine::Mama),
            "wim" => Some(Machine::Wim),
            _ => None,
        }
    }

    /// `.mama` and `.wim` files.
    fn from_path(path: &str) -> Option<Self> {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_name)
    }
}

/// Options shared by every command.
#[derive(Debug, Default)]
struct Options {
    input: String,
    machine: Option<Machine>,
    config: VmConfig,
    /// WiM: enumerate every answer.
    all: bool,
    /// Disassemble with code addresses.
    listing: bool,
}

impl Options {
    fn parse(command: &str, args: &[String]) -> Result<Self, i32> {
        let mut opts = Options::default();
        let mut input = None;
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--machine" => {
                    let value = flag_value("--machine", iter.next())?;
                    let machine = Machine::from_name(value).ok_or_else(|| {
                        eprintln!("error: unknown machine '{value}' (expected mama or wim)");
                        1
                    })?;
                    opts.machine = Some(machine);
                }
                "--max-steps" => {
                    let steps = flag_number("--max-steps", iter.next())?;
                    opts.config = opts.config.with_max_steps(steps);
                }
                "--history" => {
                    let limit = flag_number("--history", iter.next())?;
                    opts.config = opts.config.with_history_limit(limit);
                }
                "--all" => opts.all = true,
                "--listing" => opts.listing = true,
                flag if flag.starts_with("--") => {
                    eprintln!("error: unknown option '{flag}'");
                    return Err(1);
                }
                path => {
                    if input.is_some() {
                        eprintln!("error: unexpected argument '{path}'");
                        return Err(1);
                    }
                    input = Some(path.to_string());
                }
            }
        }

        let Some(input) = input else {
            eprintln!("error: {command} requires an input file");
            eprintln!("Usage: vmlab {command} <file> [options]");
            return Err(1);
        };
        opts.input = input;
        Ok(opts)
    }

    fn machine(&self) -> Result<Machine, i32> {
        self.machine
            .or_else(|| Machine::from_path(&self.input))
            .ok_or_else(|| {
                eprintln!(
                    "error: cannot tell the machine of '{}'; use --machine mama|wim",
                    self.input
                );
                1
            })
    }
}

fn flag_value<'a>(flag: &str, value: Option<&'a String>) -> Result<&'a str, i32> {
    value.map(String::as_str).ok_or_else(|| {
        eprintln!("error: {flag} requires a value");
        1
    })
}

fn flag_number<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> Result<T, i32> {
    let value = flag_value(flag, value)?;
    value.parse().map_err(|_| {
        eprintln!("error: {flag} expects a non-negative number, got '{value}'");
        1
    })
}

/// What the commands need from an instruction set beyond executing it.
trait Frontend: Instruction {
    const NAME: &'static str;

    fn assemble(text: &str) -> Result<Program<Self>, AsmError>;

    /// Print the outcome of a machine that has stopped.
    fn report(vm: &mut Vm<Self>, all: bool) -> Result<(), ExecError>;
}

impl Frontend for MamaInstr {
    const NAME: &'static str = "mama";

    fn assemble(text: &str) -> Result<Program<Self>, AsmError> {
        vmlab_assembler::assemble_mama(text)
    }

    fn report(vm: &mut Vm<Self>, _all: bool) -> Result<(), ExecError> {
        let value = mama::result(vm).map_err(|cause| ExecError {
            at: vm.pc(),
            instruction: None,
            cause,
        })?;
        println!("{value}");
        Ok(())
    }
}

impl Frontend for WimInstr {
    const NAME: &'static str = "wim";

    fn assemble(text: &str) -> Result<Program<Self>, AsmError> {
        vmlab_assembler::assemble_wim(text)
    }

    /// `halt` and `no` have printed the answer already.
    fn report(vm: &mut Vm<Self>, all: bool) -> Result<(), ExecError> {
        if all {
            while wim::has_choice_points(vm) {
                wim::next_solution(vm)?;
            }
        }
        Ok(())
    }
}

/// Assemble and link a file without running it.
pub fn check(args: &[String]) -> Result<(), i32> {
    let opts = Options::parse("check", args)?;
    match opts.machine()? {
        Machine::Mama => check_with::<MamaInstr>(&opts),
        Machine::Wim => check_with::<WimInstr>(&opts),
    }
}

/// Run a file to completion and print its result.
pub fn run(args: &[String]) -> Result<(), i32> {
    let opts = Options::parse("run", args)?;
    match opts.machine()? {
        Machine::Mama => run_with::<MamaInstr>(&opts),
        Machine::Wim => run_with::<WimInstr>(&opts),
    }
}

/// Run a file one step at a time, printing each instruction and the
/// registers after it.
pub fn trace(args: &[String]) -> Result<(), i32> {
    let opts = Options::parse("trace", args)?;
    match opts.machine()? {
        Machine::Mama => trace_with::<MamaInstr>(&opts),
        Machine::Wim => trace_with::<WimInstr>(&opts),
    }
}

/// Print the canonical (or address-annotated) text of a file.
pub fn disassemble(args: &[String]) -> Result<(), i32> {
    let opts = Options::parse("disassemble", args)?;
    match opts.machine()? {
        Machine::Mama => disassemble_with::<MamaInstr>(&opts),
        Machine::Wim => disassemble_with::<WimInstr>(&opts),
    }
}

fn check_with<I: Frontend>(opts: &Options) -> Result<(), i32> {
    let program = load::<I>(opts)?;
    println!(
        "OK: {} ({} instructions, {})",
        opts.input,
        program.len(),
        I::NAME
    );
    Ok(())
}

fn run_with<I: Frontend>(opts: &Options) -> Result<(), i32> {
    let mut vm = machine::<I>(opts)?;
    vm.run()
        .and_then(|()| I::report(&mut vm, opts.all))
        .map_err(exec_failure)?;
    debug!(steps = vm.steps(), "run finished");
    Ok(())
}

fn trace_with<I: Frontend>(opts: &Options) -> Result<(), i32> {
    let mut vm = machine::<I>(opts)?;
    while vm.is_running() {
        if let Some(limit) = opts.config.max_steps {
            if vm.steps() >= limit {
                return Err(exec_failure(ExecError {
                    at: vm.pc(),
                    instruction: None,
                    cause: Fault::StepLimit { limit },
                }));
            }
        }
        let at = vm.pc();
        let text = usize::try_from(at)
            .ok()
            .and_then(|addr| vm.instruction_at(CodeAddr(addr)))
            .map_or_else(|| "?".to_string(), Instruction::render);
        vm.step().map_err(exec_failure)?;
        println!("{at:>4}  {text:<24} {}", vm.registers());
    }
    I::report(&mut vm, opts.all).map_err(exec_failure)
}

fn disassemble_with<I: Frontend>(opts: &Options) -> Result<(), i32> {
    let program = load::<I>(opts)?;
    if opts.listing {
        print!("{}", vmlab_assembler::listing(&program));
    } else {
        print!("{}", vmlab_assembler::disassemble(&program));
    }
    Ok(())
}

/// Read and assemble the input file.
fn load<I: Frontend>(opts: &Options) -> Result<Program<I>, i32> {
    let input = &opts.input;
    let text = fs::read_to_string(input).map_err(|e| {
        eprintln!("error: cannot read '{input}': {e}");
        1
    })?;

    let program = I::assemble(&text).map_err(|e| {
        eprintln!("error: {input}: {e}");
        match e {
            AsmError::Link(_) => 2,
            _ => 1,
        }
    })?;
    info!(machine = I::NAME, instructions = program.len(), "assembled {input}");
    Ok(program)
}

fn machine<I: Frontend>(opts: &Options) -> Result<Vm<I>, i32> {
    let program = load::<I>(opts)?;
    Vm::with_config(program, opts.config.clone()).map_err(|e| {
        eprintln!("error: {}: link error: {e}", opts.input);
        2
    })
}

fn exec_failure(e: ExecError) -> i32 {
    eprintln!("execution error: {e}");
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn machine_from_extension() {
        assert_eq!(Machine::from_path("fac.mama"), Some(Machine::Mama));
        assert_eq!(Machine::from_path("dir/app.WIM"), Some(Machine::Wim));
        assert_eq!(Machine::from_path("notes.txt"), None);
        assert_eq!(Machine::from_path("noext"), None);
    }

    #[test]
    fn options_parse_flags() {
        let opts = Options::parse(
            "run",
            &args(&["p.txt", "--machine", "wim", "--max-steps", "500", "--all"]),
        )
        .unwrap();
        assert_eq!(opts.input, "p.txt");
        assert_eq!(opts.machine(), Ok(Machine::Wim));
        assert_eq!(opts.config.max_steps, Some(500));
        assert!(opts.all);
        assert!(!opts.listing);
    }

    #[test]
    fn options_history_limit() {
        let opts = Options::parse("trace", &args(&["a.mama", "--history", "0"])).unwrap();
        assert_eq!(opts.config.history_limit, 0);
        assert_eq!(opts.config.max_steps, None);
    }

    #[test]
    fn options_reject_bad_input() {
        assert_eq!(Options::parse("run", &[]).unwrap_err(), 1);
        assert_eq!(
            Options::parse("run", &args(&["a.mama", "--max-steps", "-3"])).unwrap_err(),
            1
        );
        assert_eq!(
            Options::parse("run", &args(&["a.mama", "--machine"])).unwrap_err(),
            1
        );
        assert_eq!(
            Options::parse("run", &args(&["a.mama", "b.mama"])).unwrap_err(),
            1
        );
        assert_eq!(
            Options::parse("run", &args(&["a.mama", "--frobnicate"])).unwrap_err(),
            1
        );
    }
}

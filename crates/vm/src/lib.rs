//! vmlab virtual machines: a generic step loop and two instruction sets.
//!
//! - [`machine::Vm`] owns registers, stack, heap, trail and the loaded
//!   program, and executes one instruction per [`step`](machine::Vm::step)
//!   with whole-state rollback on faults and bounded undo history.
//! - [`mama`] is a lazy functional machine (closures, partial application,
//!   memoized evaluation, lists).
//! - [`wim`] is a logic machine (unification, trail, choice points).
//!
//! # Usage
//!
//! ```
//! use vmlab_vm::mama::{self, BinOp, MamaInstr};
//! use vmlab_vm::program::Program;
//!
//! let program = Program::new(vec![
//!     MamaInstr::Loadc(6),
//!     MamaInstr::Loadc(7),
//!     MamaInstr::Opbin(BinOp::Mul),
//!     MamaInstr::Mkbasic,
//!     MamaInstr::Halt,
//! ]);
//!
//! let vm = vmlab_vm::run(program).unwrap();
//! assert_eq!(mama::result(&vm).unwrap(), "42");
//! ```

pub mod error;
pub mod machine;
pub mod mama;
pub mod program;
pub mod wim;

pub use error::RunError;
pub use machine::Vm;
pub use program::{Instruction, Program};

use vmlab_common::VmConfig;

/// Link and run `program` to completion with the default configuration.
///
/// # Errors
///
/// Returns [`RunError::Link`] if a label is undefined and
/// [`RunError::Exec`] if an instruction faults.
pub fn run<I: Instruction>(program: Program<I>) -> Result<Vm<I>, RunError> {
    run_with_config(program, VmConfig::default())
}

/// Like [`run`], with explicit history and step limits.
pub fn run_with_config<I: Instruction>(
    program: Program<I>,
    config: VmConfig,
) -> Result<Vm<I>, RunError> {
    let mut vm = Vm::with_config(program.link()?, config)?;
    vm.run()?;
    Ok(vm)
}

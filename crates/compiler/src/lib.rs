//! Compilers from small functional and logic languages to vmlab code.
//!
//! Both front ends start from an AST (there is no concrete syntax):
//!
//! - [`mama::compile`] translates an [`mama::Expr`] into a linked
//!   `Program<MamaInstr>` using the value, basic and closure schemes.
//! - [`wim::compile`] translates a [`wim::LogicProgram`] (clauses plus a
//!   query) into a linked `Program<WimInstr>`.
//!
//! # Usage
//!
//! ```
//! use vmlab_compiler::mama::{self, Expr};
//! use vmlab_vm::mama::BinOp;
//!
//! let double = Expr::fun(["x"], Expr::binary(BinOp::Add, Expr::var("x"), Expr::var("x")));
//! let program = mama::compile(&Expr::app(double, [Expr::int(21)])).unwrap();
//!
//! let vm = vmlab_vm::run(program).unwrap();
//! assert_eq!(vmlab_vm::mama::result(&vm).unwrap(), "42");
//! ```

mod emit;
pub mod error;
pub mod mama;
pub mod wim;

pub use error::CompileError;

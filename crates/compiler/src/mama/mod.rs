//! Compiler for the lazy functional language.

mod ast;
mod codegen;

pub use ast::Expr;

use tracing::debug;
use vmlab_vm::mama::MamaInstr;
use vmlab_vm::Program;

use crate::error::CompileError;

/// Compile `expr` into a linked program that leaves a reference to the
/// value of `expr` on top of the stack and halts.
///
/// # Errors
///
/// Returns [`CompileError::UnboundVariable`] for a variable that no
/// enclosing binder introduces.
pub fn compile(expr: &Expr) -> Result<Program<MamaInstr>, CompileError> {
    let program = codegen::Codegen::new().program(expr)?;
    debug!(instructions = program.len(), "compiled expression");
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmlab_common::Label;
    use vmlab_vm::mama::BinOp;
    use vmlab_vm::Instruction;

    fn names(program: &Program<MamaInstr>) -> Vec<String> {
        program.instructions.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn constant_is_boxed_and_halts() {
        let program = compile(&Expr::int(3)).unwrap();
        assert_eq!(names(&program), vec!["loadc 3", "mkbasic", "halt"]);
    }

    #[test]
    fn arithmetic_stays_unboxed_until_the_end() {
        let e = Expr::binary(BinOp::Mul, Expr::int(6), Expr::int(7));
        let program = compile(&e).unwrap();
        assert_eq!(
            names(&program),
            vec!["loadc 6", "loadc 7", "opbin *", "mkbasic", "halt"]
        );
    }

    #[test]
    fn let_binding_is_a_closure_slid_away() {
        // let x = 1 + 2 in x
        let e = Expr::let_in(
            "x",
            Expr::binary(BinOp::Add, Expr::int(1), Expr::int(2)),
            Expr::var("x"),
        );
        let program = compile(&e).unwrap();
        assert_eq!(
            names(&program),
            vec![
                "mkvec 0", "mkclos L0", "jump L1", "loadc 1", "loadc 2", "opbin +", "mkbasic",
                "update", "pushloc 0", "eval", "slide 1", "halt",
            ]
        );
        assert!(matches!(
            &program.instructions[1],
            MamaInstr::Mkclos(l) if l.address().is_ok()
        ));
    }

    #[test]
    fn function_value_is_named_after_binding() {
        let e = Expr::let_in("id", Expr::fun(["x"], Expr::var("x")), Expr::var("id"));
        let program = compile(&e).unwrap();
        assert!(program
            .instructions
            .iter()
            .any(|i| matches!(i, MamaInstr::Mkfunval(_, name) if name == "id")));
        assert!(program.instructions.contains(&MamaInstr::Targ(1)));
        assert!(program.instructions.contains(&MamaInstr::Return(1)));
    }

    #[test]
    fn unbound_variable_is_reported() {
        let e = Expr::fun(["x"], Expr::var("y"));
        assert_eq!(
            compile(&e),
            Err(CompileError::UnboundVariable {
                name: "y".to_string()
            })
        );
    }

    #[test]
    fn labels_are_all_linked() {
        let e = Expr::if_then_else(Expr::int(1), Expr::int(2), Expr::int(3));
        let program = compile(&e).unwrap();
        let labels: Vec<&Label> = program.instructions.iter().flat_map(|i| i.labels()).collect();
        assert_eq!(labels.len(), 2);
        assert!(labels.iter().all(|l| l.is_resolved()));
    }
}

//! Compiler for the logic language.
//!
//! The query is placed first, at address 0, followed by one block per
//! predicate labelled `name/arity`. Calls refer to predicates by that label,
//! so a call without matching clauses surfaces as an unresolved label when
//! the program is linked.

mod ast;
mod codegen;

pub use ast::{Clause, Goal, LogicProgram, Term, ANONYMOUS};

use tracing::debug;
use vmlab_vm::wim::WimInstr;
use vmlab_vm::Program;

use crate::error::CompileError;

/// Compile clauses and query into a linked program. Running it prints one
/// `Name = term` line per query variable, or `yes` / `no`.
///
/// # Errors
///
/// Returns [`CompileError::Link`] when the query or a clause body calls a
/// predicate that has no clauses with that arity.
pub fn compile(source: &LogicProgram) -> Result<Program<WimInstr>, CompileError> {
    let program = codegen::Codegen::new().program(source)?;
    debug!(instructions = program.len(), "compiled logic program");
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmlab_common::LinkError;

    fn names(program: &Program<WimInstr>) -> Vec<String> {
        program.instructions.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn single_fact_and_query() {
        let source = LogicProgram::new(
            vec![Clause::fact(Goal::new("p", [Term::atom("a")]))],
            vec![Goal::new("p", [Term::var("X")])],
        );
        let program = compile(&source).unwrap();
        assert_eq!(
            names(&program),
            vec![
                "init L0",
                "pushenv 8",
                "enter",
                "putvar 1",
                "call p/1",
                "halt X",
                "no",
                "pushenv 8",
                "putref 1",
                "uatom a",
                "popenv",
            ]
        );
    }

    #[test]
    fn alternatives_are_chained() {
        let source = LogicProgram::new(
            vec![
                Clause::fact(Goal::new("q", [Term::int(1)])),
                Clause::fact(Goal::new("q", [Term::int(2)])),
                Clause::fact(Goal::new("q", [Term::int(3)])),
            ],
            vec![Goal::new("q", [Term::var("X")])],
        );
        let listing = names(&compile(&source).unwrap());
        let body: Vec<&str> = listing[7..].iter().map(String::as_str).collect();
        assert_eq!(
            body,
            vec![
                "setbtp",
                "nextalt L1 2",
                "pushenv 8",
                "putref 1",
                "uatom 1",
                "popenv",
                "nextalt L2 3",
                "pushenv 8",
                "putref 1",
                "uatom 2",
                "popenv",
                "delbtp",
                "pushenv 8",
                "putref 1",
                "uatom 3",
                "popenv",
            ]
        );
    }

    #[test]
    fn head_structure_and_repeated_variable() {
        // first([H | _], H).
        let source = LogicProgram::new(
            vec![Clause::fact(Goal::new(
                "first",
                [
                    Term::cons(Term::var("H"), Term::anonymous()),
                    Term::var("H"),
                ],
            ))],
            vec![],
        );
        let listing = names(&compile(&source).unwrap());
        assert_eq!(
            &listing[4..],
            &[
                "pushenv 11",
                "putref 1",
                "ustruct ./2",
                "down",
                "uvar 3",
                "brother",
                "uvar 4",
                "up",
                "putref 2",
                "uref 3",
                "popenv",
            ]
        );
    }

    #[test]
    fn call_to_missing_predicate_fails_to_link() {
        let source = LogicProgram::new(
            vec![Clause::fact(Goal::new("p", [Term::atom("a")]))],
            vec![Goal::new("p", [Term::var("X"), Term::var("Y")])],
        );
        assert_eq!(
            compile(&source),
            Err(CompileError::Link(LinkError::UnresolvedLabel {
                name: "p/2".to_string()
            }))
        );
    }
}

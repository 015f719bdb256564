//! Error types shared by every machine.
//!
//! A [`Fault`] is the cause of a failed instruction. The step loop wraps it
//! into an [`ExecError`] together with the program counter and the
//! disassembled instruction. [`LinkError`] is raised before execution, when a
//! program still references a label nobody defined.

use thiserror::Error;

/// Why an instruction (or an instruction fetch) could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// The program counter points outside program memory.
    #[error("program counter {pc} outside program memory (size {size})")]
    PcOutOfRange { pc: i64, size: usize },

    /// A stack access below the bottom or above the top.
    #[error("stack index {index} out of range (stack pointer {sp})")]
    StackOutOfRange { index: i64, sp: i64 },

    /// A heap access beyond the allocated cells.
    #[error("heap address {address} out of range (heap size {size})")]
    HeapOutOfRange { address: usize, size: usize },

    /// An index past the end of a vector object.
    #[error("vector index {index} out of range (length {len})")]
    VectorIndex { index: usize, len: usize },

    /// A trail access beyond the recorded bindings.
    #[error("trail index {index} out of range (trail size {size})")]
    TrailOutOfRange { index: usize, size: usize },

    /// A register holding `-1` (or less) was used as an address.
    #[error("negative {space} address {value}")]
    NegativeAddress { space: &'static str, value: i64 },

    /// An operand had the wrong heap object variant.
    #[error("expected {expected}, found {found}")]
    UnexpectedObject {
        expected: &'static str,
        found: &'static str,
    },

    /// `cons` was given a tail that is not a list, a thunk or nil.
    #[error("ill-formed list: tail is {found}")]
    IllFormedList { found: &'static str },

    /// Integer division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A label reference survived linking without an address.
    #[error("unresolved label '{name}'")]
    UnresolvedLabel { name: String },

    /// A placeholder closure from `alloc` was evaluated before being rewritten.
    #[error("evaluated an uninitialized closure")]
    UninitializedClosure,

    /// Backtracking was requested but no choice point exists.
    #[error("no choice point to backtrack to")]
    NoChoicePoint,

    /// The configured step budget ran out.
    #[error("step limit of {limit} exceeded")]
    StepLimit { limit: u64 },
}

/// A fault raised while executing a step.
///
/// The machine state has already been rolled back to what it was before
/// the step when this error is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_exec_error(.at, .instruction, .cause))]
pub struct ExecError {
    /// Program counter of the faulting instruction.
    pub at: i64,
    /// Disassembled instruction, `None` when the fetch itself failed.
    pub instruction: Option<String>,
    /// The underlying fault.
    pub cause: Fault,
}

fn render_exec_error(at: &i64, instruction: &Option<String>, cause: &Fault) -> String {
    match instruction {
        Some(instr) => format!("fault at {at} ({instr}): {cause}"),
        None => format!("fault at {at}: {cause}"),
    }
}

/// Errors raised while resolving labels of a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// A label is referenced but never defined.
    #[error("unresolved label '{name}'")]
    UnresolvedLabel { name: String },

    /// A label is defined at two different positions.
    #[error("label '{name}' defined more than once")]
    DuplicateLabel { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_display_formats() {
        assert_eq!(Fault::DivisionByZero.to_string(), "division by zero");
        assert_eq!(
            Fault::UnexpectedObject {
                expected: "function value",
                found: "closure"
            }
            .to_string(),
            "expected function value, found closure"
        );
        assert_eq!(
            Fault::PcOutOfRange { pc: 9, size: 4 }.to_string(),
            "program counter 9 outside program memory (size 4)"
        );
    }

    #[test]
    fn exec_error_with_instruction() {
        let err = ExecError {
            at: 2,
            instruction: Some("opbin /".to_string()),
            cause: Fault::DivisionByZero,
        };
        assert_eq!(err.to_string(), "fault at 2 (opbin /): division by zero");
    }

    #[test]
    fn exec_error_on_fetch() {
        let err = ExecError {
            at: 5,
            instruction: None,
            cause: Fault::PcOutOfRange { pc: 5, size: 5 },
        };
        assert_eq!(
            err.to_string(),
            "fault at 5: program counter 5 outside program memory (size 5)"
        );
    }

    #[test]
    fn link_error_names_symbol() {
        let err = LinkError::UnresolvedLabel {
            name: "append/3".to_string(),
        };
        assert_eq!(err.to_string(), "unresolved label 'append/3'");
    }
}

//! Instruction buffer shared by both code generators.

use vmlab_common::{CodeAddr, Label};
use vmlab_vm::{Instruction, Program};

use crate::error::CompileError;

/// Accumulates instructions and label definitions, handing out fresh
/// label names `L0`, `L1`, ...
pub(crate) struct Emitter<I> {
    program: Program<I>,
    next_label: usize,
}

impl<I: Instruction> Emitter<I> {
    pub(crate) fn new() -> Self {
        Self {
            program: Program::default(),
            next_label: 0,
        }
    }

    pub(crate) fn fresh(&mut self) -> Label {
        let label = Label::new(format!("L{}", self.next_label));
        self.next_label += 1;
        label
    }

    pub(crate) fn emit(&mut self, instruction: I) -> CodeAddr {
        self.program.push(instruction)
    }

    /// Overwrite an instruction emitted earlier.
    pub(crate) fn patch(&mut self, at: CodeAddr, instruction: I) {
        if let Some(slot) = self.program.instructions.get_mut(at.0) {
            *slot = instruction;
        }
    }

    /// Define `label` at the next instruction.
    pub(crate) fn place(&mut self, label: &Label) -> Result<(), CompileError> {
        self.program.define_label_here(label.name())?;
        Ok(())
    }

    /// Link every label reference and hand out the program.
    pub(crate) fn finish(self) -> Result<Program<I>, CompileError> {
        Ok(self.program.link()?)
    }
}

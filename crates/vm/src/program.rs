//! Instruction streams and label linking.

use std::collections::BTreeMap;
use std::fmt;

use vmlab_common::{CodeAddr, Fault, Label, LinkError, RegisterSpec};

use crate::machine::Vm;

/// One instruction of a machine's instruction set.
///
/// Instructions are plain values: a mnemonic, at most one textual parameter
/// and an `execute` operation over the machine they belong to.
pub trait Instruction: Clone + fmt::Debug + Sized {
    /// Registers this machine adds after the common `pc`, `status`, `sp`, `fp`.
    const EXTRA_REGISTERS: &'static [RegisterSpec];

    fn mnemonic(&self) -> &'static str;

    /// The single textual parameter, if the instruction has one.
    fn param(&self) -> Option<String>;

    /// Labels this instruction refers to.
    fn labels(&self) -> Vec<&Label>;

    fn labels_mut(&mut self) -> Vec<&mut Label>;

    /// Apply the instruction. The program counter has already been advanced
    /// past it.
    fn execute(&self, vm: &mut Vm<Self>) -> Result<(), Fault>;

    /// `mnemonic param`, as the disassembler prints it.
    fn render(&self) -> String {
        match self.param() {
            Some(param) => format!("{} {}", self.mnemonic(), param),
            None => self.mnemonic().to_string(),
        }
    }
}

/// A sequence of instructions plus the label definitions that point into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program<I> {
    /// The instruction stream.
    pub instructions: Vec<I>,
    labels: BTreeMap<String, CodeAddr>,
}

impl<I> Default for Program<I> {
    fn default() -> Self {
        Self {
            instructions: Vec::new(),
            labels: BTreeMap::new(),
        }
    }
}

impl<I: Instruction> Program<I> {
    /// A program without label definitions.
    pub fn new(instructions: Vec<I>) -> Self {
        Self {
            instructions,
            labels: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Append an instruction, returning its address.
    pub fn push(&mut self, instruction: I) -> CodeAddr {
        self.instructions.push(instruction);
        CodeAddr(self.instructions.len() - 1)
    }

    /// Define `name` at `address`.
    pub fn define_label(&mut self, name: &str, address: CodeAddr) -> Result<(), LinkError> {
        if self.labels.contains_key(name) {
            return Err(LinkError::DuplicateLabel {
                name: name.to_string(),
            });
        }
        self.labels.insert(name.to_string(), address);
        Ok(())
    }

    /// Define `name` at the position of the next instruction.
    pub fn define_label_here(&mut self, name: &str) -> Result<(), LinkError> {
        self.define_label(name, CodeAddr(self.instructions.len()))
    }

    pub fn label_address(&self, name: &str) -> Option<CodeAddr> {
        self.labels.get(name).copied()
    }

    /// All label definitions, ordered by name.
    pub fn label_definitions(&self) -> impl Iterator<Item = (&str, CodeAddr)> {
        self.labels.iter().map(|(name, addr)| (name.as_str(), *addr))
    }

    /// Names of the labels defined at `address`, ordered by name.
    pub fn labels_at(&self, address: CodeAddr) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|(_, a)| **a == address)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Resolve every label reference against the definitions.
    ///
    /// References that are already resolved are left alone. The first
    /// reference to an undefined name is reported.
    pub fn link(mut self) -> Result<Self, LinkError> {
        let labels = &self.labels;
        for instr in &mut self.instructions {
            for label in instr.labels_mut() {
                if label.is_resolved() {
                    continue;
                }
                let address =
                    labels
                        .get(label.name())
                        .copied()
                        .ok_or_else(|| LinkError::UnresolvedLabel {
                            name: label.name().to_string(),
                        })?;
                label.resolve(address);
            }
        }
        Ok(self)
    }

    /// Reject programs that still contain unresolved label references.
    pub fn validate(&self) -> Result<(), LinkError> {
        for instr in &self.instructions {
            if let Some(label) = instr.labels().into_iter().find(|l| !l.is_resolved()) {
                return Err(LinkError::UnresolvedLabel {
                    name: label.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Canonical assembly text: one instruction per line, each label definition
/// on its own `name:` line before the instruction it points at.
impl<I: Instruction> fmt::Display for Program<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut by_address: BTreeMap<CodeAddr, Vec<&str>> = BTreeMap::new();
        for (name, addr) in self.label_definitions() {
            by_address.entry(addr).or_default().push(name);
        }
        for (i, instr) in self.instructions.iter().enumerate() {
            for name in by_address.remove(&CodeAddr(i)).unwrap_or_default() {
                writeln!(f, "{name}:")?;
            }
            writeln!(f, "{}", instr.render())?;
        }
        // Labels past the last instruction.
        for name in by_address.into_values().flatten() {
            writeln!(f, "{name}:")?;
        }
        Ok(())
    }
}

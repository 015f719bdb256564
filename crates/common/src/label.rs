//! Symbolic jump targets.

use std::fmt;

use crate::address::CodeAddr;
use crate::error::Fault;

/// A named code position. Compilers and the assembler create labels
/// unresolved; linking fixes the address exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    name: String,
    address: Option<CodeAddr>,
}

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
        }
    }

    /// A label already bound to `address`.
    pub fn resolved(name: impl Into<String>, address: CodeAddr) -> Self {
        Self {
            name: name.into(),
            address: Some(address),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_resolved(&self) -> bool {
        self.address.is_some()
    }

    pub fn resolve(&mut self, address: CodeAddr) {
        self.address = Some(address);
    }

    /// The target address, faulting if the label was never linked.
    pub fn address(&self) -> Result<CodeAddr, Fault> {
        self.address.ok_or_else(|| Fault::UnresolvedLabel {
            name: self.name.clone(),
        })
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

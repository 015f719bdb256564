//! Error types for the vmlab assembler.

use thiserror::Error;
use vmlab_common::LinkError;

/// Errors produced while assembling text into a program.
///
/// Every variant except [`AsmError::Link`] carries the 1-based source line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// The mnemonic is not part of the machine's instruction set.
    #[error("line {line}: unknown mnemonic '{token}'")]
    UnknownMnemonic { line: usize, token: String },

    /// An instruction that takes a parameter appeared without one.
    #[error("line {line}: {mnemonic} expects a parameter")]
    MissingParameter { line: usize, mnemonic: &'static str },

    /// A parameter was given to an instruction that takes none, or had
    /// trailing text.
    #[error("line {line}: unexpected parameter '{param}' for {mnemonic}")]
    UnexpectedParameter {
        line: usize,
        mnemonic: &'static str,
        param: String,
    },

    /// A numeric parameter could not be parsed or is out of range.
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    /// `opbin` / `opun` with an unknown operator symbol.
    #[error("line {line}: invalid operator '{token}'")]
    InvalidOperator { line: usize, token: String },

    /// A functor that is not of the form `name/arity`.
    #[error("line {line}: invalid functor '{token}'")]
    InvalidFunctor { line: usize, token: String },

    /// A label name that is empty or contains whitespace.
    #[error("line {line}: invalid label '{token}'")]
    InvalidLabel { line: usize, token: String },

    /// A label defined a second time.
    #[error("line {line}: label '{name}' defined more than once")]
    DuplicateLabel { line: usize, name: String },

    /// A referenced label has no definition anywhere in the text.
    #[error("link error: {0}")]
    Link(#[from] LinkError),
}

impl AsmError {
    /// Source line of the error, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            AsmError::UnknownMnemonic { line, .. }
            | AsmError::MissingParameter { line, .. }
            | AsmError::UnexpectedParameter { line, .. }
            | AsmError::InvalidNumber { line, .. }
            | AsmError::InvalidOperator { line, .. }
            | AsmError::InvalidFunctor { line, .. }
            | AsmError::InvalidLabel { line, .. }
            | AsmError::DuplicateLabel { line, .. } => Some(*line),
            AsmError::Link(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unknown_mnemonic() {
        let e = AsmError::UnknownMnemonic {
            line: 3,
            token: "frob".to_string(),
        };
        assert_eq!(e.to_string(), "line 3: unknown mnemonic 'frob'");
    }

    #[test]
    fn error_display_missing_parameter() {
        let e = AsmError::MissingParameter {
            line: 7,
            mnemonic: "pushloc",
        };
        assert_eq!(e.to_string(), "line 7: pushloc expects a parameter");
    }

    #[test]
    fn error_display_unexpected_parameter() {
        let e = AsmError::UnexpectedParameter {
            line: 4,
            mnemonic: "apply",
            param: "2".to_string(),
        };
        assert_eq!(e.to_string(), "line 4: unexpected parameter '2' for apply");
    }

    #[test]
    fn error_display_link() {
        let e: AsmError = LinkError::UnresolvedLabel {
            name: "app/3".to_string(),
        }
        .into();
        assert_eq!(e.to_string(), "link error: unresolved label 'app/3'");
        assert_eq!(e.line(), None);
    }

    #[test]
    fn line_accessor() {
        let e = AsmError::InvalidOperator {
            line: 12,
            token: "%".to_string(),
        };
        assert_eq!(e.line(), Some(12));
    }
}

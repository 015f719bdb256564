//! Compile-time errors.

use thiserror::Error;
use vmlab_common::LinkError;

/// Errors raised while translating an AST into instructions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A functional expression mentions a name no binder introduces.
    #[error("unbound variable '{name}'")]
    UnboundVariable { name: String },

    /// Linking the generated code failed, typically a call to a predicate
    /// with no clauses of that arity.
    #[error(transparent)]
    Link(#[from] LinkError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats() {
        assert_eq!(
            CompileError::UnboundVariable {
                name: "y".to_string()
            }
            .to_string(),
            "unbound variable 'y'"
        );
        let err: CompileError = LinkError::UnresolvedLabel {
            name: "p/2".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "unresolved label 'p/2'");
    }
}

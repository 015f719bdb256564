//! Errors returned by the one-shot [`run`](crate::run) entry point.
//!
//! Loading can fail with a [`LinkError`] before a single instruction runs;
//! execution can fail with an [`ExecError`] carrying the faulting program
//! counter. Callers that drive the machine step by step see the two
//! separately.

use thiserror::Error;
use vmlab_common::{ExecError, LinkError};

/// Anything that can go wrong between loading a program and its halt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    #[error("execution error: {0}")]
    Exec(#[from] ExecError),
}

use thiserror::Error;

use crate::{query::BuildError, session::ExecutionError, translator::TranslationError};

/// Everything a session entry point can fail with.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Translation(#[from] TranslationError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("expected at most one row, got {rows}")]
    NonUniqueResult { rows: usize },
}

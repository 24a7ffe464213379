use thiserror::Error;

use crate::{query::ProjectionError, storage::StorageError};

/// A statement failed in storage or its rows could not be mapped. The
/// rendered SQL is kept for diagnostics.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("storage failed running `{statement}`: {source}")]
    Storage { statement: String, source: StorageError },
    #[error("cannot map row of `{statement}`: {source}")]
    Projection { statement: String, source: ProjectionError },
}

impl ExecutionError {
    pub fn statement(&self) -> &str {
        match self {
            ExecutionError::Storage { statement, .. } | ExecutionError::Projection { statement, .. } => statement,
        }
    }
}

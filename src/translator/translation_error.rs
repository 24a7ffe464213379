use thiserror::Error;

use crate::storage::StorageError;

/// A plan cannot be rendered for the target store. Raised before anything
/// reaches storage.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("table '{table}' has no relationship '{relation}'")]
    UnknownRelation { table: String, relation: String },
    #[error("relationship '{relation}' leads to '{expected}', not '{found}'")]
    RelationTargetMismatch { relation: String, expected: String, found: String },
    #[error("unknown SQL function '{0}'")]
    UnknownFunction(String),
    #[error("function '{name}' takes {expected} arguments, got {found}")]
    FunctionArity { name: String, expected: String, found: usize },
    #[error("cannot read table metadata: {0}")]
    Metadata(#[from] StorageError),
}

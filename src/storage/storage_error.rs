use thiserror::Error;

/// Failures reported by a storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("unknown relationship '{relation}' on table '{table}'")]
    UnknownRelationship { table: String, relation: String },
    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("row has no id under key '{0}'")]
    MissingId(String),
    #[error("duplicate id '{id}' in table '{table}'")]
    DuplicateId { table: String, id: String },
    #[error("expected a JSON object or array of objects")]
    InvalidDocument,
    #[error("scalar subquery returned {rows} rows")]
    SubqueryCardinality { rows: usize },
    #[error("statement carries no plan this store can evaluate")]
    UnsupportedStatement,
    #[error("no unit of work in progress")]
    NoUnitOfWork,
    #[error("a unit of work is already in progress")]
    UnitOfWorkInProgress,
    #[error("storage lock poisoned")]
    LockPoisoned,
    #[error("evaluation failed: {0}")]
    Evaluation(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

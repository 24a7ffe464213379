use serde_json::Value;
use thiserror::Error;

/// A returned row cannot be mapped into the requested result shape.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("column '{label}' is missing from the row")]
    MissingColumn { label: String },
    #[error("column '{label}' is NULL; project it as nullable()")]
    UnexpectedNull { label: String },
    #[error("column '{label}': expected {expected}, found {found}")]
    TypeMismatch { label: String, expected: &'static str, found: Value },
    #[error("cannot build {target} from row: {source}")]
    Deserialize { target: &'static str, source: serde_json::Error },
}

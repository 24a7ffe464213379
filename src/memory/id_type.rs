use serde::{Deserialize, Serialize};

/// How a table fills in row ids.
///
/// - `Int`: sequential integers, stored as JSON numbers.
/// - `Uuid`: random v4 UUID strings.
/// - `None`: the caller supplies the id under the configured key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum IdType {
    #[default]
    Int,
    Uuid,
    None,
}

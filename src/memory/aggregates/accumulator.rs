use serde_json::Value;

use crate::storage::StorageError;

/// Running state of one aggregate over one group.
///
/// The executor evaluates the argument per row and calls `update` with it
/// (an empty slice for `COUNT(*)`), then `finalize` once the group is done.
/// DISTINCT is handled by the executor before `update`.
pub trait Accumulator: Send {
    fn update(&mut self, args: &[Value]) -> Result<(), StorageError>;

    fn finalize(&self) -> Value;
}

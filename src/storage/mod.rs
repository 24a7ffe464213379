pub mod row;
pub mod storage_error;

pub use row::*;
pub use storage_error::*;

use crate::{schema::SchemaProvider, translator::Statement};

/// The store a session runs statements against.
///
/// Implementations receive rendered statements (SQL text, bound parameters
/// and the resolved plan they came from) and own all transactional state.
pub trait Storage: SchemaProvider {
    fn execute(&self, statement: &Statement) -> Result<Vec<Row>, StorageError>;

    /// Runs an UPDATE or DELETE and returns the affected row count.
    fn execute_mutation(&self, statement: &Statement) -> Result<u64, StorageError>;

    fn begin_unit_of_work(&self) -> Result<(), StorageError>;

    fn commit(&self) -> Result<(), StorageError>;

    fn rollback(&self) -> Result<(), StorageError>;
}

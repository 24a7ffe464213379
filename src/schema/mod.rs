pub mod field_info;
pub mod json_primitive;
pub mod relationship;
pub mod source;
pub mod table_metadata;

pub use field_info::*;
pub use json_primitive::*;
pub use relationship::*;
pub use source::*;
pub use table_metadata::*;

use crate::storage::StorageError;

/// Read access to table metadata, used to resolve relationship joins and
/// entity projections.
pub trait SchemaProvider {
    /// Metadata of `table`, or `None` if the table is unknown.
    fn table_metadata(&self, table: &str) -> Result<Option<TableMetadata>, StorageError>;
}

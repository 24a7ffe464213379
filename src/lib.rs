pub mod expr;
pub mod predicate;
pub mod schema;
pub mod query;

pub mod translator;
pub use translator::{SqlDialect, Statement, Translator};

pub mod storage;
pub use storage::{Row, Storage, StorageError};

pub mod memory;
pub use memory::{IdType, MemoryStore, StoreConfig};

pub mod session;
pub use session::{Page, QueryError, Session, SessionConfig, UnitOfWork};

pub mod dialect;
pub mod resolver;
pub mod statement;
pub mod translation_error;
pub mod translator;

pub use dialect::*;
pub use resolver::*;
pub use statement::*;
pub use translation_error::*;
pub use translator::*;

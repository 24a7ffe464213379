pub mod execution_error;
pub mod page;
pub mod query_error;
pub mod session;
pub mod session_config;
pub mod unit_of_work;

pub use execution_error::*;
pub use page::*;
pub use query_error::*;
pub use session::*;
pub use session_config::*;
pub use unit_of_work::*;

#[cfg(test)]
mod _tests;

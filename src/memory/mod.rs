pub mod aggregates;
pub mod config;
pub mod eval;
pub mod helpers;
pub mod id_manager;
pub mod id_type;
pub mod logical_plan;
pub mod memory_store;
pub mod memory_table;
pub mod plan_builder;
pub mod plan_executor;

pub use config::*;
pub use id_manager::*;
pub use id_type::*;
pub use memory_store::*;
pub use memory_table::*;

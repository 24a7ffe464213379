pub mod build_error;
pub mod entity;
pub mod from_value;
pub mod join_spec;
pub mod mutation;
pub mod order_spec;
pub mod projection;
pub mod projection_error;
pub mod query;
pub mod query_plan;
pub mod select_builder;
pub mod select_item;
pub mod tuple;
pub mod typed_query;
pub(crate) mod validate;

pub use build_error::*;
pub use entity::*;
pub use from_value::*;
pub use join_spec::*;
pub use mutation::*;
pub use order_spec::*;
pub use projection::*;
pub use projection_error::*;
pub use query::*;
pub use query_plan::*;
pub use select_builder::*;
pub use select_item::*;
pub use tuple::*;
pub use typed_query::*;

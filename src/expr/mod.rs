pub mod case_expr;
pub mod column;
pub mod expression;
pub mod function;
pub mod literal;
pub mod operators;
pub mod scalar_expr;
pub mod truth;

pub use case_expr::*;
pub use column::*;
pub use expression::*;
pub use function::*;
pub use literal::*;
pub use operators::*;
pub use scalar_expr::*;
pub use truth::*;

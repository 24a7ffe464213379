pub mod composer;
pub mod predicate;

pub use composer::*;
pub use predicate::*;

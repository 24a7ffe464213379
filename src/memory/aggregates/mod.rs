pub mod accumulator;
pub mod avg;
pub mod count;
pub mod minmax;
pub mod sum;

pub use accumulator::*;
pub use avg::*;
pub use count::*;
pub use minmax::*;
pub use sum::*;

use crate::expr::AggregateFunction;

/// Fresh accumulator for one group.
pub fn accumulator_for(func: AggregateFunction) -> Box<dyn Accumulator> {
    match func {
        AggregateFunction::Count => Box::new(CountAcc::default()),
        AggregateFunction::Sum => Box::new(SumAcc::default()),
        AggregateFunction::Avg => Box::new(AvgAcc::default()),
        AggregateFunction::Min => Box::new(ExtremaAcc::min()),
        AggregateFunction::Max => Box::new(ExtremaAcc::max()),
    }
}

use std::{fmt, sync::Arc};

/// Row-level functions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarFunction {
    Upper,
    Lower,
    Trim,
    Length,
    /// Cast to text (`stringValue()`).
    StringValue,
    /// Any other SQL function, looked up by name in the dialect registry.
    Named(Arc<str>),
}

impl ScalarFunction {
    pub fn name(&self) -> &str {
        match self {
            ScalarFunction::Upper => "upper",
            ScalarFunction::Lower => "lower",
            ScalarFunction::Trim => "trim",
            ScalarFunction::Length => "length",
            ScalarFunction::StringValue => "string_value",
            ScalarFunction::Named(name) => name,
        }
    }
}

/// Group-level functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_ascii_uppercase())
    }
}

use crate::expr::ScalarExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Where NULL sort keys go. Direction only orders the non-null keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NullOrdering {
    /// Treated as `First`.
    #[default]
    Unspecified,
    First,
    Last,
}

impl NullOrdering {
    pub fn nulls_last(&self) -> bool {
        matches!(self, NullOrdering::Last)
    }
}

/// One ORDER BY key; earlier keys take priority.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub expr: ScalarExpr,
    pub direction: Direction,
    pub nulls: NullOrdering,
}

impl OrderSpec {
    pub fn asc(expr: ScalarExpr) -> Self {
        Self { expr, direction: Direction::Asc, nulls: NullOrdering::Unspecified }
    }

    pub fn desc(expr: ScalarExpr) -> Self {
        Self { expr, direction: Direction::Desc, nulls: NullOrdering::Unspecified }
    }

    pub fn nulls_first(self) -> Self { Self { nulls: NullOrdering::First, ..self } }

    pub fn nulls_last(self) -> Self { Self { nulls: NullOrdering::Last, ..self } }

    pub fn is_ascending(&self) -> bool { self.direction == Direction::Asc }
}

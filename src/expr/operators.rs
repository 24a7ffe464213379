use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparatorOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq
}

impl ComparatorOp {
    /// The operator that holds when the operands are swapped.
    pub fn flip(&self) -> Self {
        match self {
            ComparatorOp::Eq => ComparatorOp::Eq,
            ComparatorOp::NotEq => ComparatorOp::NotEq,
            ComparatorOp::Lt => ComparatorOp::Gt,
            ComparatorOp::LtEq => ComparatorOp::GtEq,
            ComparatorOp::Gt => ComparatorOp::Lt,
            ComparatorOp::GtEq => ComparatorOp::LtEq,
        }
    }
}

impl fmt::Display for ComparatorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparatorOp::Eq => write!(f, "="),
            ComparatorOp::NotEq => write!(f, "<>"),
            ComparatorOp::Lt => write!(f, "<"),
            ComparatorOp::LtEq => write!(f, "<="),
            ComparatorOp::Gt => write!(f, ">"),
            ComparatorOp::GtEq => write!(f, ">="),
        }
    }
}

impl fmt::Debug for ComparatorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComparatorOp({})", self)
    }
}

/// Binary operators producing a value rather than a truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    /// String concatenation; rendered per dialect.
    Concat,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Concat => "||",
        }
    }
}

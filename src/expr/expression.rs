use std::{fmt, marker::PhantomData, sync::Arc};

use crate::{
    expr::{AggregateFunction, ArithmeticOp, ComparatorOp, Literal, ScalarExpr, ScalarFunction, SimpleCaseWhen},
    predicate::Predicate,
    query::{OrderSpec, SubQuery},
};

/// SQL value types an expression can carry.
pub trait SqlType: Send + Sync + 'static {}

impl SqlType for i64 {}
impl SqlType for f64 {}
impl SqlType for String {}
impl SqlType for bool {}

/// Types with a total order in SQL (`<`, `BETWEEN`, `MIN`, `MAX`).
pub trait Ordered: SqlType {}

impl Ordered for i64 {}
impl Ordered for f64 {}
impl Ordered for String {}

pub trait Numeric: Ordered {}

impl Numeric for i64 {}
impl Numeric for f64 {}

/// Which right-hand SQL types a comparison accepts. Integers and floats
/// compare with each other; every other type only with itself.
pub trait ComparableWith<R> {}

impl<T: SqlType> ComparableWith<T> for T {}
impl ComparableWith<f64> for i64 {}
impl ComparableWith<i64> for f64 {}

/// Anything usable as the right-hand side of an operation: literals, typed
/// expressions and typed scalar subqueries.
pub trait Operand: Sized {
    type Sql: SqlType;
    fn into_scalar(self) -> ScalarExpr;

    fn into_shared(self) -> Arc<ScalarExpr> { Arc::new(self.into_scalar()) }
}

macro_rules! literal_operand {
    ($ty:ty => $sql:ty) => {
        impl Operand for $ty {
            type Sql = $sql;
            fn into_scalar(self) -> ScalarExpr { ScalarExpr::Literal(Literal::from(self)) }
        }
    };
}

literal_operand!(i64 => i64);
literal_operand!(i32 => i64);
literal_operand!(f64 => f64);
literal_operand!(bool => bool);
literal_operand!(String => String);

impl<'a> Operand for &'a str {
    type Sql = String;
    fn into_scalar(self) -> ScalarExpr { ScalarExpr::Literal(Literal::from(self)) }
}

impl<T: SqlType> Operand for Expression<T> {
    type Sql = T;
    fn into_scalar(self) -> ScalarExpr { self.into_node() }
    fn into_shared(self) -> Arc<ScalarExpr> { self.node }
}

impl<'a, T: SqlType> Operand for &'a Expression<T> {
    type Sql = T;
    fn into_scalar(self) -> ScalarExpr { self.to_scalar() }
    fn into_shared(self) -> Arc<ScalarExpr> { self.shared() }
}

impl<T: SqlType> Operand for SubQuery<T> {
    type Sql = T;
    fn into_scalar(self) -> ScalarExpr { ScalarExpr::Subquery(self.plan) }
}

impl<'a, T: SqlType> Operand for &'a SubQuery<T> {
    type Sql = T;
    fn into_scalar(self) -> ScalarExpr { ScalarExpr::Subquery(Arc::clone(&self.plan)) }
}

/// Typed view over a [`ScalarExpr`]. `T` decides which operations exist and
/// what a projection of this expression produces.
pub struct Expression<T> {
    node: Arc<ScalarExpr>,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Clone for Expression<T> {
    fn clone(&self) -> Self { Self { node: self.shared(), _ty: PhantomData } }
}

impl<T> PartialEq for Expression<T> {
    fn eq(&self, other: &Self) -> bool { self.node == other.node }
}

impl<T> fmt::Debug for Expression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({})", self.node)
    }
}

/// An expression with an explicit output label.
#[derive(Debug, Clone)]
pub struct Aliased<T> {
    pub expr: Expression<T>,
    pub alias: Arc<str>,
}

impl<T> Expression<T> {
    pub(crate) fn from_node(node: ScalarExpr) -> Self {
        Self { node: Arc::new(node), _ty: PhantomData }
    }

    pub fn node(&self) -> &ScalarExpr { &self.node }

    /// The node itself, for embedding in a larger expression without a copy.
    pub fn shared(&self) -> Arc<ScalarExpr> { Arc::clone(&self.node) }

    pub fn into_node(self) -> ScalarExpr { Arc::unwrap_or_clone(self.node) }

    fn to_scalar(&self) -> ScalarExpr { ScalarExpr::clone(&self.node) }

    fn aggregate<R>(&self, func: AggregateFunction, distinct: bool) -> Expression<R> {
        Expression::from_node(ScalarExpr::Aggregate { func, arg: Some(self.shared()), distinct })
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull { expr: self.to_scalar(), negated: false }
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::IsNull { expr: self.to_scalar(), negated: true }
    }

    pub fn count(&self) -> Expression<i64> {
        self.aggregate(AggregateFunction::Count, false)
    }

    pub fn count_distinct(&self) -> Expression<i64> {
        self.aggregate(AggregateFunction::Count, true)
    }

    /// Cast to text.
    pub fn string_value(&self) -> Expression<String> {
        Expression::from_node(ScalarExpr::Function { func: ScalarFunction::StringValue, args: vec![self.shared()] })
    }

    pub fn asc(&self) -> OrderSpec { OrderSpec::asc(self.to_scalar()) }

    pub fn desc(&self) -> OrderSpec { OrderSpec::desc(self.to_scalar()) }

    pub fn alias(&self, name: &str) -> Aliased<T> {
        Aliased { expr: self.clone(), alias: Arc::from(name) }
    }

    /// Same node, projected as `Option<T>` so NULL maps to `None`.
    pub fn nullable(&self) -> Expression<Option<T>> {
        Expression { node: self.shared(), _ty: PhantomData }
    }
}

impl<T: SqlType> Expression<T> {
    fn compare<O: Operand>(&self, op: ComparatorOp, rhs: O) -> Predicate {
        Predicate::compare(self.to_scalar(), op, rhs.into_scalar())
    }

    fn typed<R>(node: ScalarExpr) -> Expression<R> { Expression::from_node(node) }

    pub fn eq<O: Operand>(&self, rhs: O) -> Predicate where T: ComparableWith<O::Sql> {
        self.compare(ComparatorOp::Eq, rhs)
    }

    pub fn ne<O: Operand>(&self, rhs: O) -> Predicate where T: ComparableWith<O::Sql> {
        self.compare(ComparatorOp::NotEq, rhs)
    }

    pub fn in_list<I, O>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = O>,
        O: Operand<Sql = T>,
    {
        Predicate::InList {
            expr: self.to_scalar(),
            list: values.into_iter().map(Operand::into_scalar).collect(),
            negated: false,
        }
    }

    pub fn not_in<I, O>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = O>,
        O: Operand<Sql = T>,
    {
        Predicate::InList {
            expr: self.to_scalar(),
            list: values.into_iter().map(Operand::into_scalar).collect(),
            negated: true,
        }
    }

    pub fn in_subquery(&self, sub: &SubQuery<T>) -> Predicate {
        Predicate::InSubquery { expr: self.to_scalar(), plan: Arc::clone(&sub.plan), negated: false }
    }

    pub fn not_in_subquery(&self, sub: &SubQuery<T>) -> Predicate {
        Predicate::InSubquery { expr: self.to_scalar(), plan: Arc::clone(&sub.plan), negated: true }
    }

    /// Starts a simple case on this expression.
    pub fn when(&self, value: impl Operand<Sql = T>) -> SimpleCaseWhen<T> {
        SimpleCaseWhen::new(self.to_scalar(), value.into_scalar())
    }
}

impl<T: Ordered> Expression<T> {
    pub fn gt<O: Operand>(&self, rhs: O) -> Predicate where T: ComparableWith<O::Sql> {
        self.compare(ComparatorOp::Gt, rhs)
    }

    pub fn goe<O: Operand>(&self, rhs: O) -> Predicate where T: ComparableWith<O::Sql> {
        self.compare(ComparatorOp::GtEq, rhs)
    }

    pub fn lt<O: Operand>(&self, rhs: O) -> Predicate where T: ComparableWith<O::Sql> {
        self.compare(ComparatorOp::Lt, rhs)
    }

    pub fn loe<O: Operand>(&self, rhs: O) -> Predicate where T: ComparableWith<O::Sql> {
        self.compare(ComparatorOp::LtEq, rhs)
    }

    pub fn between<L, H>(&self, low: L, high: H) -> Predicate
    where
        L: Operand,
        H: Operand,
        T: ComparableWith<L::Sql> + ComparableWith<H::Sql>,
    {
        Predicate::Between { expr: self.to_scalar(), low: low.into_scalar(), high: high.into_scalar() }
    }

    pub fn max(&self) -> Expression<T> {
        self.aggregate(AggregateFunction::Max, false)
    }

    pub fn min(&self) -> Expression<T> {
        self.aggregate(AggregateFunction::Min, false)
    }
}

impl<T: Numeric> Expression<T> {
    fn arith(&self, op: ArithmeticOp, rhs: impl Operand<Sql = T>) -> Expression<T> {
        Self::typed(ScalarExpr::Binary { op, left: self.shared(), right: rhs.into_shared() })
    }

    pub fn add(&self, rhs: impl Operand<Sql = T>) -> Expression<T> { self.arith(ArithmeticOp::Add, rhs) }

    pub fn subtract(&self, rhs: impl Operand<Sql = T>) -> Expression<T> { self.arith(ArithmeticOp::Sub, rhs) }

    pub fn multiply(&self, rhs: impl Operand<Sql = T>) -> Expression<T> { self.arith(ArithmeticOp::Mul, rhs) }

    pub fn divide(&self, rhs: impl Operand<Sql = T>) -> Expression<T> { self.arith(ArithmeticOp::Div, rhs) }

    pub fn sum(&self) -> Expression<T> {
        self.aggregate(AggregateFunction::Sum, false)
    }

    pub fn avg(&self) -> Expression<f64> {
        self.aggregate(AggregateFunction::Avg, false)
    }
}

/// Escape character used by `contains`, `starts_with` and `ends_with`.
pub const LIKE_ESCAPE: char = '!';

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

impl Expression<String> {
    fn like_with(&self, pattern: String, escape: Option<char>, negated: bool) -> Predicate {
        Predicate::Like { expr: self.to_scalar(), pattern: ScalarExpr::literal(pattern), escape, negated }
    }

    fn unary(&self, func: ScalarFunction) -> ScalarExpr {
        ScalarExpr::Function { func, args: vec![self.shared()] }
    }

    /// Raw LIKE pattern; `%` and `_` keep their wildcard meaning.
    pub fn like(&self, pattern: &str) -> Predicate {
        self.like_with(pattern.to_string(), None, false)
    }

    pub fn not_like(&self, pattern: &str) -> Predicate {
        self.like_with(pattern.to_string(), None, true)
    }

    pub fn contains(&self, part: &str) -> Predicate {
        self.like_with(format!("%{}%", escape_like(part)), Some(LIKE_ESCAPE), false)
    }

    pub fn starts_with(&self, prefix: &str) -> Predicate {
        self.like_with(format!("{}%", escape_like(prefix)), Some(LIKE_ESCAPE), false)
    }

    pub fn ends_with(&self, suffix: &str) -> Predicate {
        self.like_with(format!("%{}", escape_like(suffix)), Some(LIKE_ESCAPE), false)
    }

    pub fn concat(&self, rhs: impl Operand<Sql = String>) -> Expression<String> {
        Expression::from_node(ScalarExpr::Binary { op: ArithmeticOp::Concat, left: self.shared(), right: rhs.into_shared() })
    }

    pub fn upper(&self) -> Expression<String> { Expression::from_node(self.unary(ScalarFunction::Upper)) }

    pub fn lower(&self) -> Expression<String> { Expression::from_node(self.unary(ScalarFunction::Lower)) }

    pub fn trim(&self) -> Expression<String> { Expression::from_node(self.unary(ScalarFunction::Trim)) }

    pub fn length(&self) -> Expression<i64> { Expression::from_node(self.unary(ScalarFunction::Length)) }

    pub fn replace(&self, from: impl Operand<Sql = String>, to: impl Operand<Sql = String>) -> Expression<String> {
        Expression::from_node(ScalarExpr::Function {
            func: ScalarFunction::Named(Arc::from("replace")),
            args: vec![self.shared(), from.into_shared(), to.into_shared()],
        })
    }
}

/// A constant as a typed expression.
pub fn constant<O: Operand>(value: O) -> Expression<O::Sql> {
    Expression::from_node(value.into_scalar())
}

/// A named SQL function, checked against the dialect's function registry
/// when the query is translated.
pub fn function<T: SqlType>(name: &str, args: Vec<ScalarExpr>) -> Expression<T> {
    Expression::from_node(ScalarExpr::function(ScalarFunction::Named(Arc::from(name.to_ascii_lowercase())), args))
}

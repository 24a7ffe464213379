use std::{fmt, sync::Arc};

use crate::{
    expr::{AggregateFunction, ArithmeticOp, CaseExpr, ColumnRef, Literal, ScalarFunction},
    query::QueryPlan,
};

/// Untyped expression node.
///
/// Composite nodes keep their operands behind `Arc`: building a bigger
/// expression out of smaller ones shares the operands, and a node never
/// changes once built.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpr {
    Column(ColumnRef),
    Literal(Literal),
    Binary { op: ArithmeticOp, left: Arc<ScalarExpr>, right: Arc<ScalarExpr> },
    Function { func: ScalarFunction, args: Vec<Arc<ScalarExpr>> },
    /// `arg: None` is `COUNT(*)`.
    Aggregate { func: AggregateFunction, arg: Option<Arc<ScalarExpr>>, distinct: bool },
    Subquery(Arc<QueryPlan>),
    Case(Arc<CaseExpr>),
}

impl ScalarExpr {
    pub fn column(source: &str, name: &str) -> Self {
        ScalarExpr::Column(ColumnRef::new(source, name))
    }

    pub fn literal(value: impl Into<Literal>) -> Self {
        ScalarExpr::Literal(value.into())
    }

    pub fn binary(op: ArithmeticOp, left: ScalarExpr, right: ScalarExpr) -> Self {
        ScalarExpr::Binary { op, left: Arc::new(left), right: Arc::new(right) }
    }

    pub fn function(func: ScalarFunction, args: Vec<ScalarExpr>) -> Self {
        ScalarExpr::Function { func, args: args.into_iter().map(Arc::new).collect() }
    }

    pub fn aggregate(func: AggregateFunction, arg: Option<ScalarExpr>, distinct: bool) -> Self {
        ScalarExpr::Aggregate { func, arg: arg.map(Arc::new), distinct }
    }

    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            ScalarExpr::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Pre-order visit of this node and every nested node.
    /// Subquery plans are not entered; they own their scope.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a ScalarExpr)) {
        f(self);
        match self {
            ScalarExpr::Column(_) | ScalarExpr::Literal(_) | ScalarExpr::Subquery(_) => {}
            ScalarExpr::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            ScalarExpr::Function { args, .. } => {
                for a in args { a.walk(f); }
            }
            ScalarExpr::Aggregate { arg, .. } => {
                if let Some(a) = arg { a.walk(f); }
            }
            ScalarExpr::Case(case) => {
                for branch in &case.branches {
                    branch.when.walk_exprs(f);
                    branch.then.walk(f);
                }
                case.otherwise.walk(f);
            }
        }
    }

    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.walk(&mut |e| {
            if matches!(e, ScalarExpr::Aggregate { .. }) { found = true; }
        });
        found
    }

    /// Subquery plans referenced anywhere in this expression (one level deep).
    pub fn subqueries(&self) -> Vec<Arc<QueryPlan>> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let ScalarExpr::Subquery(plan) = e { out.push(Arc::clone(plan)); }
        });
        out
    }

    /// Top-down rewrite: `f` may replace a node wholesale; otherwise its
    /// children are rewritten. Subquery plans are left untouched.
    pub fn rewrite(&self, f: &dyn Fn(&ScalarExpr) -> Option<ScalarExpr>) -> ScalarExpr {
        if let Some(replaced) = f(self) {
            return replaced;
        }
        match self {
            ScalarExpr::Column(_) | ScalarExpr::Literal(_) | ScalarExpr::Subquery(_) => self.clone(),
            ScalarExpr::Binary { op, left, right } => ScalarExpr::Binary {
                op: *op,
                left: Arc::new(left.rewrite(f)),
                right: Arc::new(right.rewrite(f)),
            },
            ScalarExpr::Function { func, args } => ScalarExpr::Function {
                func: func.clone(),
                args: args.iter().map(|a| Arc::new(a.rewrite(f))).collect(),
            },
            ScalarExpr::Aggregate { func, arg, distinct } => ScalarExpr::Aggregate {
                func: *func,
                arg: arg.as_ref().map(|a| Arc::new(a.rewrite(f))),
                distinct: *distinct,
            },
            ScalarExpr::Case(case) => ScalarExpr::Case(Arc::new(case.rewrite(f))),
        }
    }

    /// Rebuild this expression with every nested subquery plan replaced by `f`.
    pub fn map_plans<E>(
        &self,
        f: &mut dyn FnMut(&Arc<QueryPlan>) -> Result<Arc<QueryPlan>, E>,
    ) -> Result<ScalarExpr, E> {
        Ok(match self {
            ScalarExpr::Column(_) | ScalarExpr::Literal(_) => self.clone(),
            ScalarExpr::Subquery(plan) => ScalarExpr::Subquery(f(plan)?),
            ScalarExpr::Binary { op, left, right } => ScalarExpr::Binary {
                op: *op,
                left: Arc::new(left.map_plans(f)?),
                right: Arc::new(right.map_plans(f)?),
            },
            ScalarExpr::Function { func, args } => {
                let mut mapped = Vec::with_capacity(args.len());
                for a in args { mapped.push(Arc::new(a.map_plans(f)?)); }
                ScalarExpr::Function { func: func.clone(), args: mapped }
            }
            ScalarExpr::Aggregate { func, arg, distinct } => ScalarExpr::Aggregate {
                func: *func,
                arg: match arg {
                    Some(a) => Some(Arc::new(a.map_plans(f)?)),
                    None => None,
                },
                distinct: *distinct,
            },
            ScalarExpr::Case(case) => ScalarExpr::Case(Arc::new(case.map_plans(f)?)),
        })
    }
}

impl fmt::Display for ScalarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpr::Column(c) => write!(f, "{}", c),
            ScalarExpr::Literal(l) => write!(f, "{}", l),
            ScalarExpr::Binary { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            ScalarExpr::Function { func, args } => {
                write!(f, "{}(", func.name())?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
            ScalarExpr::Aggregate { func, arg, distinct } => match arg {
                None => write!(f, "{}(*)", func),
                Some(a) if *distinct => write!(f, "{}(DISTINCT {})", func, a),
                Some(a) => write!(f, "{}({})", func, a),
            },
            ScalarExpr::Subquery(_) => write!(f, "(subquery)"),
            ScalarExpr::Case(_) => write!(f, "CASE"),
        }
    }
}

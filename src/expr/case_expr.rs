use std::{marker::PhantomData, sync::Arc};

use crate::{
    expr::{Expression, Operand, ScalarExpr, SqlType},
    predicate::Predicate,
    query::QueryPlan,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    pub when: Predicate,
    pub then: ScalarExpr,
}

/// `CASE WHEN .. THEN .. ELSE .. END`. Branches are tested in order; the first
/// true condition wins and `otherwise` covers everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub branches: Vec<CaseBranch>,
    pub otherwise: ScalarExpr,
}

impl CaseExpr {
    pub(crate) fn rewrite(&self, f: &dyn Fn(&ScalarExpr) -> Option<ScalarExpr>) -> CaseExpr {
        CaseExpr {
            branches: self.branches.iter()
                .map(|b| CaseBranch { when: b.when.rewrite_exprs(f), then: b.then.rewrite(f) })
                .collect(),
            otherwise: self.otherwise.rewrite(f),
        }
    }

    pub(crate) fn map_plans<E>(
        &self,
        f: &mut dyn FnMut(&Arc<QueryPlan>) -> Result<Arc<QueryPlan>, E>,
    ) -> Result<CaseExpr, E> {
        let mut branches = Vec::with_capacity(self.branches.len());
        for b in &self.branches {
            branches.push(CaseBranch { when: b.when.map_plans(f)?, then: b.then.map_plans(f)? });
        }
        Ok(CaseExpr { branches, otherwise: self.otherwise.map_plans(f)? })
    }
}

/// Entry point of the searched form: `CaseBuilder::when(p).then(v)...otherwise(d)`.
pub struct CaseBuilder;

impl CaseBuilder {
    pub fn when(condition: Predicate) -> CaseWhen {
        CaseWhen { condition }
    }
}

pub struct CaseWhen {
    condition: Predicate,
}

impl CaseWhen {
    pub fn then<O: Operand>(self, value: O) -> CaseExpression<O::Sql> {
        CaseExpression {
            branches: vec![CaseBranch { when: self.condition, then: value.into_scalar() }],
            _ty: PhantomData,
        }
    }
}

/// A case expression with at least one branch. It only becomes an
/// `Expression` once `otherwise` supplies the default.
pub struct CaseExpression<R> {
    branches: Vec<CaseBranch>,
    _ty: PhantomData<fn() -> R>,
}

impl<R: SqlType> CaseExpression<R> {
    pub fn when(self, condition: Predicate) -> CaseWhenMore<R> {
        CaseWhenMore { case: self, condition }
    }

    pub fn otherwise(self, value: impl Operand<Sql = R>) -> Expression<R> {
        Expression::from_node(ScalarExpr::Case(Arc::new(CaseExpr {
            branches: self.branches,
            otherwise: value.into_scalar(),
        })))
    }
}

pub struct CaseWhenMore<R> {
    case: CaseExpression<R>,
    condition: Predicate,
}

impl<R: SqlType> CaseWhenMore<R> {
    pub fn then(mut self, value: impl Operand<Sql = R>) -> CaseExpression<R> {
        self.case.branches.push(CaseBranch { when: self.condition, then: value.into_scalar() });
        self.case
    }
}

/// Simple form, started from an expression: `age.when(10).then("ten")`.
/// Each branch lowers to an equality test against the subject.
pub struct SimpleCaseWhen<T> {
    subject: ScalarExpr,
    value: ScalarExpr,
    _ty: PhantomData<fn() -> T>,
}

impl<T: SqlType> SimpleCaseWhen<T> {
    pub(crate) fn new(subject: ScalarExpr, value: ScalarExpr) -> Self {
        Self { subject, value, _ty: PhantomData }
    }

    pub fn then<O: Operand>(self, result: O) -> SimpleCase<T, O::Sql> {
        let when = Predicate::compare(self.subject.clone(), crate::expr::ComparatorOp::Eq, self.value);
        SimpleCase {
            subject: self.subject,
            branches: vec![CaseBranch { when, then: result.into_scalar() }],
            _ty: PhantomData,
        }
    }
}

pub struct SimpleCase<T, R> {
    subject: ScalarExpr,
    branches: Vec<CaseBranch>,
    _ty: PhantomData<fn() -> (T, R)>,
}

impl<T: SqlType, R: SqlType> SimpleCase<T, R> {
    pub fn when(self, value: impl Operand<Sql = T>) -> SimpleCaseWhenMore<T, R> {
        SimpleCaseWhenMore { case: self, value: value.into_scalar() }
    }

    pub fn otherwise(self, value: impl Operand<Sql = R>) -> Expression<R> {
        Expression::from_node(ScalarExpr::Case(Arc::new(CaseExpr {
            branches: self.branches,
            otherwise: value.into_scalar(),
        })))
    }
}

pub struct SimpleCaseWhenMore<T, R> {
    case: SimpleCase<T, R>,
    value: ScalarExpr,
}

impl<T: SqlType, R: SqlType> SimpleCaseWhenMore<T, R> {
    pub fn then(mut self, result: impl Operand<Sql = R>) -> SimpleCase<T, R> {
        let when = Predicate::compare(self.case.subject.clone(), crate::expr::ComparatorOp::Eq, self.value);
        self.case.branches.push(CaseBranch { when, then: result.into_scalar() });
        self.case
    }
}

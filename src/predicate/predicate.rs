use std::sync::Arc;

use crate::{
    expr::{ComparatorOp, ScalarExpr},
    query::QueryPlan,
};

/// Boolean-valued expression usable in WHERE, ON, HAVING and CASE branches.
///
/// An absent predicate is `Option::None` and means "no constraint"; it is not
/// the SQL `NULL` truth value.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),

    Compare { left: ScalarExpr, op: ComparatorOp, right: ScalarExpr },
    Between { expr: ScalarExpr, low: ScalarExpr, high: ScalarExpr },
    InList  { expr: ScalarExpr, list: Vec<ScalarExpr>, negated: bool },
    InSubquery { expr: ScalarExpr, plan: Arc<QueryPlan>, negated: bool },
    Like    { expr: ScalarExpr, pattern: ScalarExpr, escape: Option<char>, negated: bool },
    IsNull  { expr: ScalarExpr, negated: bool },
    Const(bool),
}

impl Predicate {
    pub fn compare(left: ScalarExpr, op: ComparatorOp, right: ScalarExpr) -> Self {
        Predicate::Compare { left, op, right }
    }

    /// Conjunction with an optional predicate. An absent `other` is the
    /// identity: `self` comes back unchanged.
    pub fn and(self, other: impl Into<Option<Predicate>>) -> Predicate {
        match other.into() {
            None => self,
            Some(other) => {
                let mut parts = Vec::new();
                Self::push_flat(&mut parts, self, true);
                Self::push_flat(&mut parts, other, true);
                Predicate::And(parts)
            }
        }
    }

    /// Disjunction with an optional predicate; an absent `other` is skipped.
    pub fn or(self, other: impl Into<Option<Predicate>>) -> Predicate {
        match other.into() {
            None => self,
            Some(other) => {
                let mut parts = Vec::new();
                Self::push_flat(&mut parts, self, false);
                Self::push_flat(&mut parts, other, false);
                Predicate::Or(parts)
            }
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    pub(crate) fn push_flat(parts: &mut Vec<Predicate>, p: Predicate, conjunction: bool) {
        match (p, conjunction) {
            (Predicate::And(list), true) | (Predicate::Or(list), false) => parts.extend(list),
            (p, _) => parts.push(p),
        }
    }

    /// Visits every scalar expression this predicate (and nested predicates)
    /// embeds. Plans of IN subqueries are not entered.
    pub fn walk_exprs<'a>(&'a self, f: &mut dyn FnMut(&'a ScalarExpr)) {
        match self {
            Predicate::And(list) | Predicate::Or(list) => {
                for p in list { p.walk_exprs(f); }
            }
            Predicate::Not(inner) => inner.walk_exprs(f),
            Predicate::Compare { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Predicate::Between { expr, low, high } => {
                expr.walk(f);
                low.walk(f);
                high.walk(f);
            }
            Predicate::InList { expr, list, .. } => {
                expr.walk(f);
                for e in list { e.walk(f); }
            }
            Predicate::InSubquery { expr, .. } => expr.walk(f),
            Predicate::Like { expr, pattern, .. } => {
                expr.walk(f);
                pattern.walk(f);
            }
            Predicate::IsNull { expr, .. } => expr.walk(f),
            Predicate::Const(_) => {}
        }
    }

    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.walk_exprs(&mut |e| {
            if matches!(e, ScalarExpr::Aggregate { .. }) { found = true; }
        });
        found
    }

    /// Every subquery plan directly referenced by this predicate.
    pub fn subqueries(&self) -> Vec<Arc<QueryPlan>> {
        let mut out = Vec::new();
        self.collect_in_plans(&mut out);
        self.walk_exprs(&mut |e| {
            if let ScalarExpr::Subquery(plan) = e { out.push(Arc::clone(plan)); }
        });
        out
    }

    fn collect_in_plans(&self, out: &mut Vec<Arc<QueryPlan>>) {
        match self {
            Predicate::And(list) | Predicate::Or(list) => {
                for p in list { p.collect_in_plans(out); }
            }
            Predicate::Not(inner) => inner.collect_in_plans(out),
            Predicate::InSubquery { plan, .. } => out.push(Arc::clone(plan)),
            _ => {}
        }
    }

    /// Applies `ScalarExpr::rewrite` to every embedded expression.
    pub fn rewrite_exprs(&self, f: &dyn Fn(&ScalarExpr) -> Option<ScalarExpr>) -> Predicate {
        match self {
            Predicate::And(list) => Predicate::And(list.iter().map(|p| p.rewrite_exprs(f)).collect()),
            Predicate::Or(list) => Predicate::Or(list.iter().map(|p| p.rewrite_exprs(f)).collect()),
            Predicate::Not(inner) => Predicate::Not(Box::new(inner.rewrite_exprs(f))),
            Predicate::Compare { left, op, right } =>
                Predicate::Compare { left: left.rewrite(f), op: *op, right: right.rewrite(f) },
            Predicate::Between { expr, low, high } =>
                Predicate::Between { expr: expr.rewrite(f), low: low.rewrite(f), high: high.rewrite(f) },
            Predicate::InList { expr, list, negated } => Predicate::InList {
                expr: expr.rewrite(f),
                list: list.iter().map(|e| e.rewrite(f)).collect(),
                negated: *negated,
            },
            Predicate::InSubquery { expr, plan, negated } =>
                Predicate::InSubquery { expr: expr.rewrite(f), plan: Arc::clone(plan), negated: *negated },
            Predicate::Like { expr, pattern, escape, negated } => Predicate::Like {
                expr: expr.rewrite(f),
                pattern: pattern.rewrite(f),
                escape: *escape,
                negated: *negated,
            },
            Predicate::IsNull { expr, negated } => Predicate::IsNull { expr: expr.rewrite(f), negated: *negated },
            Predicate::Const(b) => Predicate::Const(*b),
        }
    }

    /// Rebuilds the predicate with every subquery plan replaced by `f`.
    pub fn map_plans<E>(
        &self,
        f: &mut dyn FnMut(&Arc<QueryPlan>) -> Result<Arc<QueryPlan>, E>,
    ) -> Result<Predicate, E> {
        Ok(match self {
            Predicate::And(list) => {
                let mut out = Vec::with_capacity(list.len());
                for p in list { out.push(p.map_plans(f)?); }
                Predicate::And(out)
            }
            Predicate::Or(list) => {
                let mut out = Vec::with_capacity(list.len());
                for p in list { out.push(p.map_plans(f)?); }
                Predicate::Or(out)
            }
            Predicate::Not(inner) => Predicate::Not(Box::new(inner.map_plans(f)?)),
            Predicate::Compare { left, op, right } =>
                Predicate::Compare { left: left.map_plans(f)?, op: *op, right: right.map_plans(f)? },
            Predicate::Between { expr, low, high } =>
                Predicate::Between { expr: expr.map_plans(f)?, low: low.map_plans(f)?, high: high.map_plans(f)? },
            Predicate::InList { expr, list, negated } => {
                let mut out = Vec::with_capacity(list.len());
                for e in list { out.push(e.map_plans(f)?); }
                Predicate::InList { expr: expr.map_plans(f)?, list: out, negated: *negated }
            }
            Predicate::InSubquery { expr, plan, negated } =>
                Predicate::InSubquery { expr: expr.map_plans(f)?, plan: f(plan)?, negated: *negated },
            Predicate::Like { expr, pattern, escape, negated } => Predicate::Like {
                expr: expr.map_plans(f)?,
                pattern: pattern.map_plans(f)?,
                escape: *escape,
                negated: *negated,
            },
            Predicate::IsNull { expr, negated } => Predicate::IsNull { expr: expr.map_plans(f)?, negated: *negated },
            Predicate::Const(b) => Predicate::Const(*b),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(col: &str, v: i64) -> Predicate {
        Predicate::compare(ScalarExpr::column("m", col), ComparatorOp::Eq, ScalarExpr::literal(v))
    }

    #[test]
    fn and_with_absent_is_identity() {
        let a = p("age", 10);
        assert_eq!(a.clone().and(None), a);
        assert_eq!(a.clone().or(None), a);
    }

    #[test]
    fn and_flattens_nested_conjunctions() {
        let out = p("a", 1).and(p("b", 2)).and(p("c", 3));
        assert_eq!(out, Predicate::And(vec![p("a", 1), p("b", 2), p("c", 3)]));
    }

    #[test]
    fn or_does_not_flatten_conjunctions() {
        let out = p("a", 1).and(p("b", 2)).or(p("c", 3));
        assert_eq!(out, Predicate::Or(vec![Predicate::And(vec![p("a", 1), p("b", 2)]), p("c", 3)]));
    }

    #[test]
    fn double_negation_cancels() {
        assert_eq!(p("a", 1).not().not(), p("a", 1));
    }

    #[test]
    fn aggregates_are_found_inside_predicates() {
        let sum = ScalarExpr::aggregate(crate::expr::AggregateFunction::Sum, Some(ScalarExpr::column("m", "age")), false);
        let having = Predicate::compare(sum, ComparatorOp::Gt, ScalarExpr::literal(10));
        assert!(having.contains_aggregate());
        assert!(!p("a", 1).contains_aggregate());
    }
}

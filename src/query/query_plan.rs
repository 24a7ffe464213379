use std::sync::Arc;

use crate::{
    expr::ScalarExpr,
    predicate::Predicate,
    query::{BuildError, JoinSpec, OrderSpec, SelectItem},
    schema::Source,
};

/// Frozen description of a select query. Produced by `SelectBuilder`,
/// shared behind `Arc` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPlan {
    pub projection: Vec<SelectItem>,
    pub from: Vec<Source>,
    pub joins: Vec<JoinSpec>,
    pub predicate: Option<Predicate>,
    pub group_by: Vec<ScalarExpr>,
    pub having: Option<Predicate>,
    pub order_by: Vec<OrderSpec>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub distinct: bool,
    /// First builder misuse of a subquery, reported when the enclosing
    /// query is built.
    pub(crate) pending: Option<BuildError>,
}

impl QueryPlan {
    /// Every source in scope: `from` entries, then join targets.
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.from.iter().chain(self.joins.iter().map(|j| &j.target))
    }

    pub fn source(&self, alias: &str) -> Option<&Source> {
        self.sources().find(|s| &*s.alias == alias)
    }

    pub fn has_aggregates(&self) -> bool {
        self.projection.iter().filter_map(SelectItem::scalar).any(ScalarExpr::contains_aggregate)
            || self.having.as_ref().is_some_and(Predicate::contains_aggregate)
            || self.order_by.iter().any(|o| o.expr.contains_aggregate())
    }

    /// Grouped queries collapse rows: GROUP BY or any aggregate.
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty() || self.has_aggregates()
    }

    /// Copy with a different row window; the original plan is untouched.
    pub fn with_window(&self, offset: Option<u64>, limit: Option<u64>) -> Arc<QueryPlan> {
        Arc::new(QueryPlan { offset, limit, ..self.clone() })
    }
}

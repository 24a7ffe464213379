use crate::{
    expr::{AggregateFunction, ScalarExpr},
    predicate::Predicate,
    query::{JoinKind, OrderSpec},
};

/// One aggregate the `Aggregate` node computes, written to `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCall {
    pub func: AggregateFunction,
    pub arg: Option<ScalarExpr>,
    pub distinct: bool,
    pub output: String,
}

/// Evaluation tree of a select plan. Rows flow bottom-up; every row is a map
/// keyed by `alias.column` until `Project` relabels it.
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    /// A table, with its columns prefixed by the visible alias.
    Scan {
        table: String,
        alias: String,
    },

    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        kind: JoinKind,
        on: Option<Predicate>,
    },

    /// WHERE, or HAVING when placed above an `Aggregate`.
    Filter {
        input: Box<LogicalPlan>,
        predicate: Predicate,
    },

    /// Group keys land under `group_outputs`, aggregates under their call
    /// outputs. Without keys the whole input is one group, even when empty.
    Aggregate {
        input: Box<LogicalPlan>,
        group_keys: Vec<ScalarExpr>,
        group_outputs: Vec<String>,
        aggs: Vec<AggregateCall>,
    },

    /// Stable sort; null placement per key.
    Sort {
        input: Box<LogicalPlan>,
        keys: Vec<OrderSpec>,
    },

    /// Projection in SELECT order: `(expression, output label)`.
    Project {
        input: Box<LogicalPlan>,
        items: Vec<(ScalarExpr, String)>,
    },

    Distinct {
        input: Box<LogicalPlan>,
    },

    Limit {
        input: Box<LogicalPlan>,
        limit: Option<u64>,
        offset: Option<u64>,
    },
}

use std::sync::Arc;

use crate::{
    expr::Literal,
    query::{MutationPlan, QueryPlan},
};

/// What a statement was rendered from. Stores that evaluate plans directly
/// read it instead of parsing the SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementPlan {
    Select(Arc<QueryPlan>),
    /// Row count of the plan, ignoring its order and window.
    Count(Arc<QueryPlan>),
    Mutation(Arc<MutationPlan>),
}

/// Rendered SQL with its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Literal>,
    pub plan: StatementPlan,
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self.plan {
            StatementPlan::Select(_) => "select",
            StatementPlan::Count(_) => "count",
            StatementPlan::Mutation(_) => "mutation",
        }
    }
}

use crate::{
    expr::{ColumnRef, ScalarExpr},
    memory::logical_plan::{AggregateCall, LogicalPlan},
    query::{JoinKind, QueryPlan, SelectItem},
    storage::StorageError,
};

/// Lowers a resolved `QueryPlan` into a `LogicalPlan`:
/// Scan → Join → Filter → Aggregate → Filter(having) → Sort → Project →
/// Distinct → Limit.
pub struct PlanBuilder;

impl PlanBuilder {
    pub fn from_query(plan: &QueryPlan) -> Result<LogicalPlan, StorageError> {
        let mut sources = plan.from.iter();
        let first = sources.next().ok_or_else(|| StorageError::Evaluation("query has no source".into()))?;
        let mut node = Self::scan(&first.table, &first.alias);
        for s in sources {
            node = LogicalPlan::Join {
                left: Box::new(node),
                right: Box::new(Self::scan(&s.table, &s.alias)),
                kind: JoinKind::Cross,
                on: None,
            };
        }
        for join in &plan.joins {
            node = LogicalPlan::Join {
                left: Box::new(node),
                right: Box::new(Self::scan(&join.target.table, &join.target.alias)),
                kind: join.kind,
                on: join.on.clone(),
            };
        }
        if let Some(p) = &plan.predicate {
            node = LogicalPlan::Filter { input: Box::new(node), predicate: p.clone() };
        }

        let mut items: Vec<(ScalarExpr, String)> = Vec::with_capacity(plan.projection.len());
        for (i, item) in plan.projection.iter().enumerate() {
            match item {
                SelectItem::Expr { expr, .. } => items.push((expr.clone(), item.label(i))),
                SelectItem::AllColumns { source } => {
                    return Err(StorageError::Evaluation(format!("unresolved entity projection of '{}'", source.alias)));
                }
            }
        }
        let mut order = plan.order_by.clone();

        if plan.is_grouped() {
            let group_outputs: Vec<String> = (0..plan.group_by.len()).map(|i| format!("_g{}", i)).collect();
            let aggs = Self::collect_aggregates(plan);
            let rewrite = |e: &ScalarExpr| -> Option<ScalarExpr> {
                if let Some(i) = plan.group_by.iter().position(|g| g == e) {
                    return Some(ScalarExpr::Column(ColumnRef::unqualified(&group_outputs[i])));
                }
                aggs.iter()
                    .find(|a| Self::matches(a, e))
                    .map(|a| ScalarExpr::Column(ColumnRef::unqualified(&a.output)))
            };
            let having = plan.having.as_ref().map(|h| h.rewrite_exprs(&rewrite));
            for (expr, _) in items.iter_mut() {
                *expr = expr.rewrite(&rewrite);
            }
            for key in order.iter_mut() {
                key.expr = key.expr.rewrite(&rewrite);
            }
            node = LogicalPlan::Aggregate {
                input: Box::new(node),
                group_keys: plan.group_by.clone(),
                group_outputs: group_outputs.clone(),
                aggs,
            };
            if let Some(h) = having {
                node = LogicalPlan::Filter { input: Box::new(node), predicate: h };
            }
        }

        if !order.is_empty() {
            node = LogicalPlan::Sort { input: Box::new(node), keys: order };
        }
        node = LogicalPlan::Project { input: Box::new(node), items };
        if plan.distinct {
            node = LogicalPlan::Distinct { input: Box::new(node) };
        }
        if plan.limit.is_some() || plan.offset.is_some() {
            node = LogicalPlan::Limit { input: Box::new(node), limit: plan.limit, offset: plan.offset };
        }
        Ok(node)
    }

    fn scan(table: &str, alias: &str) -> LogicalPlan {
        LogicalPlan::Scan { table: table.to_string(), alias: alias.to_string() }
    }

    fn matches(call: &AggregateCall, e: &ScalarExpr) -> bool {
        match e {
            ScalarExpr::Aggregate { func, arg, distinct } =>
                *func == call.func && *distinct == call.distinct && arg.as_deref() == call.arg.as_ref(),
            _ => false,
        }
    }

    /// Distinct aggregate calls of the projection, HAVING and ORDER BY.
    fn collect_aggregates(plan: &QueryPlan) -> Vec<AggregateCall> {
        let mut calls: Vec<AggregateCall> = Vec::new();
        let mut visit = |e: &ScalarExpr| {
            if let ScalarExpr::Aggregate { func, arg, distinct } = e {
                let candidate = AggregateCall {
                    func: *func,
                    arg: arg.as_deref().cloned(),
                    distinct: *distinct,
                    output: format!("_a{}", calls.len()),
                };
                if !calls.iter().any(|c| Self::matches(c, e)) {
                    calls.push(candidate);
                }
            }
        };
        for item in &plan.projection {
            if let Some(e) = item.scalar() { e.walk(&mut visit); }
        }
        if let Some(h) = &plan.having { h.walk_exprs(&mut visit); }
        for o in &plan.order_by { o.expr.walk(&mut visit); }
        calls
    }
}

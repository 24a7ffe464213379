use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    expr::ScalarExpr,
    predicate::Predicate,
    query::{BuildError, JoinKind, QueryPlan, ResultShape, SelectItem},
    schema::Source,
};

static IDENTIFIER: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$"));

pub(crate) fn is_identifier(s: &str) -> bool {
    IDENTIFIER.as_ref().is_ok_and(|re| re.is_match(s))
}

fn identifier(s: &str) -> Result<(), BuildError> {
    if is_identifier(s) { Ok(()) } else { Err(BuildError::InvalidIdentifier(s.to_string())) }
}

/// Checks a select plan and its result shape.
pub(crate) fn validate_query(plan: &QueryPlan, shape: &ResultShape) -> Result<(), BuildError> {
    check_plan(plan, &[])?;
    if *shape == ResultShape::Fields {
        for (index, item) in plan.projection.iter().enumerate() {
            if item.field_name().is_none() {
                return Err(BuildError::MissingFieldName { index });
            }
        }
    }
    Ok(())
}

/// Checks an UPDATE/DELETE: target, assigned values and filter may only
/// reference the target (and sources of their own subqueries).
pub(crate) fn validate_mutation(
    target: &Source,
    values: &[&ScalarExpr],
    predicate: Option<&Predicate>,
) -> Result<(), BuildError> {
    identifier(&target.table)?;
    identifier(&target.alias)?;
    let scope = [&*target.alias];
    for value in values {
        if value.contains_aggregate() {
            return Err(BuildError::MisplacedAggregate { clause: "set" });
        }
        check_columns(value, &scope, "set")?;
        check_subqueries(&value.subqueries(), &scope)?;
    }
    if let Some(p) = predicate {
        if p.contains_aggregate() {
            return Err(BuildError::MisplacedAggregate { clause: "where" });
        }
        check_predicate_columns(p, &scope, "where")?;
        check_subqueries(&p.subqueries(), &scope)?;
    }
    Ok(())
}

fn check_plan(plan: &QueryPlan, outer: &[&str]) -> Result<(), BuildError> {
    if let Some(err) = &plan.pending {
        return Err(err.clone());
    }
    if plan.from.is_empty() {
        return Err(BuildError::NoSource);
    }
    if plan.projection.is_empty() {
        return Err(BuildError::NoProjection);
    }

    let mut local: Vec<&str> = Vec::new();
    for source in plan.sources() {
        identifier(&source.table)?;
        identifier(&source.alias)?;
        if local.contains(&&*source.alias) {
            return Err(BuildError::DuplicateAlias(source.alias.to_string()));
        }
        local.push(&source.alias);
    }
    let scope: Vec<&str> = local.iter().chain(outer.iter()).copied().collect();

    check_joins(plan, outer)?;

    for item in &plan.projection {
        match item {
            SelectItem::AllColumns { source } if !local.contains(&&*source.alias) =>
                return Err(BuildError::UnknownSource { alias: source.alias.to_string(), clause: "select" }),
            SelectItem::AllColumns { .. } => {}
            SelectItem::Expr { expr, alias } => {
                if let Some(alias) = alias { identifier(alias)?; }
                check_columns(expr, &scope, "select")?;
            }
        }
    }

    check_labels(&plan.projection)?;

    if let Some(p) = &plan.predicate {
        if p.contains_aggregate() {
            return Err(BuildError::MisplacedAggregate { clause: "where" });
        }
        check_predicate_columns(p, &scope, "where")?;
    }
    for key in &plan.group_by {
        if key.contains_aggregate() {
            return Err(BuildError::MisplacedAggregate { clause: "group by" });
        }
        check_columns(key, &scope, "group by")?;
    }
    if let Some(h) = &plan.having {
        check_predicate_columns(h, &scope, "having")?;
    }
    for order in &plan.order_by {
        check_columns(&order.expr, &scope, "order by")?;
    }

    check_grouping(plan)?;
    check_subqueries(&plan_subqueries(plan), &scope)
}

/// A join sees the `from` sources, the joins declared before it, itself and
/// the enclosing query's sources.
fn check_joins(plan: &QueryPlan, outer: &[&str]) -> Result<(), BuildError> {
    let mut earlier: Vec<&str> = plan.from.iter().map(|s| &*s.alias).collect();
    for join in &plan.joins {
        let alias = join.target.alias.to_string();
        let owner_known = join.relation.as_ref().is_none_or(|rel| earlier.contains(&&*rel.owner));
        earlier.push(&join.target.alias);
        let visible: Vec<&str> = earlier.iter().chain(outer.iter()).copied().collect();
        match (&join.relation, join.kind) {
            (Some(rel), _) => {
                identifier(&rel.name)?;
                if !owner_known {
                    return Err(BuildError::UnknownRelationOwner { owner: rel.owner.to_string(), relation: rel.name.to_string() });
                }
            }
            (None, JoinKind::Cross) => {}
            (None, _) if join.on.is_none() => return Err(BuildError::MissingJoinCondition { alias }),
            (None, _) => {}
        }
        if let Some(on) = &join.on {
            if join.kind == JoinKind::Cross {
                return Err(BuildError::OnCrossJoin { alias });
            }
            if on.contains_aggregate() {
                return Err(BuildError::MisplacedAggregate { clause: "join on" });
            }
            check_predicate_columns(on, &visible, "join on")?;
        }
        if join.fetch {
            let Some(rel) = &join.relation else {
                return Err(BuildError::InvalidFetchJoin { alias, reason: "only relationship joins can be fetched" });
            };
            let owner_projected = plan.projection.iter()
                .any(|item| matches!(item, SelectItem::AllColumns { source } if source.alias == rel.owner));
            if !owner_projected {
                return Err(BuildError::InvalidFetchJoin { alias, reason: "the relation owner is not projected as an entity" });
            }
        }
    }
    Ok(())
}

/// Rows are keyed by label, so two different expressions may not share one.
fn check_labels(projection: &[SelectItem]) -> Result<(), BuildError> {
    let mut seen: Vec<(String, &ScalarExpr)> = Vec::with_capacity(projection.len());
    for (i, item) in projection.iter().enumerate() {
        let SelectItem::Expr { expr, .. } = item else { continue };
        let label = item.label(i);
        match seen.iter().find(|(l, _)| *l == label) {
            Some((_, other)) if *other != expr => return Err(BuildError::DuplicateLabel(label)),
            Some(_) => {}
            None => seen.push((label, expr)),
        }
    }
    Ok(())
}

fn check_grouping(plan: &QueryPlan) -> Result<(), BuildError> {
    let has_aggregates = plan.has_aggregates();
    if !plan.group_by.is_empty() && !has_aggregates {
        return Err(BuildError::GroupByWithoutAggregate);
    }
    if plan.having.is_some() && plan.group_by.is_empty() && !has_aggregates {
        return Err(BuildError::HavingWithoutGrouping);
    }
    if !plan.is_grouped() {
        return Ok(());
    }

    let ensure = |expr: &ScalarExpr, clause: &'static str| {
        if is_grouped_expr(expr, &plan.group_by) {
            Ok(())
        } else {
            Err(BuildError::NotGrouped { expr: expr.to_string(), clause })
        }
    };
    for item in &plan.projection {
        match item {
            SelectItem::AllColumns { source } =>
                return Err(BuildError::EntityInGroupedQuery { alias: source.alias.to_string() }),
            SelectItem::Expr { expr, .. } => ensure(expr, "select")?,
        }
    }
    if let Some(h) = &plan.having {
        for operand in predicate_operands(h) {
            ensure(operand, "having")?;
        }
    }
    for order in &plan.order_by {
        ensure(&order.expr, "order by")?;
    }
    Ok(())
}

/// Built only from group keys, literals, aggregates and subqueries.
fn is_grouped_expr(expr: &ScalarExpr, group_by: &[ScalarExpr]) -> bool {
    if group_by.contains(expr) {
        return true;
    }
    match expr {
        ScalarExpr::Literal(_) | ScalarExpr::Aggregate { .. } | ScalarExpr::Subquery(_) => true,
        ScalarExpr::Column(_) => false,
        ScalarExpr::Binary { left, right, .. } =>
            is_grouped_expr(left, group_by) && is_grouped_expr(right, group_by),
        ScalarExpr::Function { args, .. } => args.iter().all(|a| is_grouped_expr(a, group_by)),
        ScalarExpr::Case(case) => {
            case.branches.iter().all(|b| {
                predicate_operands(&b.when).into_iter().all(|e| is_grouped_expr(e, group_by))
                    && is_grouped_expr(&b.then, group_by)
            }) && is_grouped_expr(&case.otherwise, group_by)
        }
    }
}

/// Top-level scalar operands of a predicate tree.
fn predicate_operands(p: &Predicate) -> Vec<&ScalarExpr> {
    match p {
        Predicate::And(list) | Predicate::Or(list) => list.iter().flat_map(predicate_operands).collect(),
        Predicate::Not(inner) => predicate_operands(inner),
        Predicate::Compare { left, right, .. } => vec![left, right],
        Predicate::Between { expr, low, high } => vec![expr, low, high],
        Predicate::InList { expr, list, .. } => std::iter::once(expr).chain(list.iter()).collect(),
        Predicate::InSubquery { expr, .. } | Predicate::IsNull { expr, .. } => vec![expr],
        Predicate::Like { expr, pattern, .. } => vec![expr, pattern],
        Predicate::Const(_) => Vec::new(),
    }
}

fn check_columns(expr: &ScalarExpr, scope: &[&str], clause: &'static str) -> Result<(), BuildError> {
    let mut first_error = None;
    expr.walk(&mut |e| {
        if first_error.is_some() {
            return;
        }
        if let ScalarExpr::Column(c) = e {
            if !scope.contains(&&*c.source) {
                first_error = Some(BuildError::UnknownSource { alias: c.source.to_string(), clause });
            } else if !is_identifier(&c.name) {
                first_error = Some(BuildError::InvalidIdentifier(c.name.to_string()));
            }
        }
    });
    first_error.map_or(Ok(()), Err)
}

fn check_predicate_columns(p: &Predicate, scope: &[&str], clause: &'static str) -> Result<(), BuildError> {
    for operand in predicate_operands(p) {
        check_columns(operand, scope, clause)?;
    }
    Ok(())
}

fn plan_subqueries(plan: &QueryPlan) -> Vec<Arc<QueryPlan>> {
    let mut out = Vec::new();
    for item in &plan.projection {
        if let Some(expr) = item.scalar() { out.extend(expr.subqueries()); }
    }
    for join in &plan.joins {
        if let Some(on) = &join.on { out.extend(on.subqueries()); }
    }
    if let Some(p) = &plan.predicate { out.extend(p.subqueries()); }
    for key in &plan.group_by { out.extend(key.subqueries()); }
    if let Some(h) = &plan.having { out.extend(h.subqueries()); }
    for order in &plan.order_by { out.extend(order.expr.subqueries()); }
    out
}

/// Subqueries see their own sources plus every enclosing scope, and yield
/// exactly one scalar column.
fn check_subqueries(subqueries: &[Arc<QueryPlan>], scope: &[&str]) -> Result<(), BuildError> {
    for sub in subqueries {
        check_plan(sub, scope)?;
        if !matches!(sub.projection.as_slice(), [SelectItem::Expr { .. }]) {
            return Err(BuildError::SubqueryNotScalar);
        }
    }
    Ok(())
}

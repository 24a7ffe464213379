use std::{collections::HashMap, sync::Arc};

use tracing::trace;

use crate::{
    expr::ScalarExpr,
    predicate::{all_of, Predicate},
    query::{MutationKind, MutationPlan, OrderSpec, QueryPlan, SelectItem},
    schema::{SchemaProvider, Source, TableMetadata},
    translator::TranslationError,
};

/// Fills in what a built plan leaves to table metadata: key conditions of
/// relationship joins and the column lists of entity projections.
///
/// Every projection item of a resolved plan carries an explicit alias equal
/// to the label the result mapper reads.
pub struct PlanResolver<'a> {
    schema: &'a dyn SchemaProvider,
    tables: HashMap<String, TableMetadata>,
}

impl<'a> PlanResolver<'a> {
    pub fn new(schema: &'a dyn SchemaProvider) -> Self {
        Self { schema, tables: HashMap::new() }
    }

    fn table(&mut self, name: &str) -> Result<&TableMetadata, TranslationError> {
        if !self.tables.contains_key(name) {
            let meta = self.schema.table_metadata(name)?
                .ok_or_else(|| TranslationError::UnknownTable(name.to_string()))?;
            self.tables.insert(name.to_string(), meta);
        }
        self.tables.get(name).ok_or_else(|| TranslationError::UnknownTable(name.to_string()))
    }

    fn columns_of(&mut self, source: &Source) -> Result<Vec<SelectItem>, TranslationError> {
        let alias = Arc::clone(&source.alias);
        let meta = self.table(&source.table)?;
        Ok(meta.column_names()
            .map(|col| SelectItem::aliased(ScalarExpr::column(&alias, col), &format!("{}.{}", alias, col)))
            .collect())
    }

    pub fn resolve(&mut self, plan: &QueryPlan) -> Result<Arc<QueryPlan>, TranslationError> {
        for source in plan.sources() {
            self.table(&source.table)?;
        }

        let mut joins = Vec::with_capacity(plan.joins.len());
        for join in &plan.joins {
            let mut join = join.clone();
            if let Some(relation) = &join.relation {
                let owner_table = plan.source(&relation.owner)
                    .map(|s| s.table.to_string())
                    .ok_or_else(|| TranslationError::UnknownRelation {
                        table: relation.owner.to_string(),
                        relation: relation.name.to_string(),
                    })?;
                let rel = self.table(&owner_table)?
                    .relationship(&relation.name)
                    .cloned()
                    .ok_or_else(|| TranslationError::UnknownRelation {
                        table: owner_table.clone(),
                        relation: relation.name.to_string(),
                    })?;
                if rel.target_table != *join.target.table {
                    return Err(TranslationError::RelationTargetMismatch {
                        relation: rel.name,
                        expected: rel.target_table,
                        found: join.target.table.to_string(),
                    });
                }
                let key = Predicate::compare(
                    ScalarExpr::column(&relation.owner, &rel.column),
                    crate::expr::ComparatorOp::Eq,
                    ScalarExpr::column(&join.target.alias, &rel.target_column),
                );
                join.on = all_of([Some(key), join.on.take()]);
            }
            join.on = self.resolve_predicate(join.on.as_ref())?;
            joins.push(join);
        }

        let mut projection: Vec<SelectItem> = Vec::new();
        let push = |items: &mut Vec<SelectItem>, item: SelectItem| {
            if !items.contains(&item) { items.push(item); }
        };
        for (i, item) in plan.projection.iter().enumerate() {
            match item {
                SelectItem::AllColumns { source } => {
                    for col in self.columns_of(source)? { push(&mut projection, col); }
                }
                SelectItem::Expr { expr, .. } => {
                    let resolved = SelectItem::aliased(self.resolve_expr(expr)?, &item.label(i));
                    push(&mut projection, resolved);
                }
            }
        }
        for join in plan.joins.iter().filter(|j| j.fetch) {
            for col in self.columns_of(&join.target)? { push(&mut projection, col); }
        }

        let mut group_by = Vec::with_capacity(plan.group_by.len());
        for e in &plan.group_by { group_by.push(self.resolve_expr(e)?); }
        let mut order_by = Vec::with_capacity(plan.order_by.len());
        for o in &plan.order_by {
            order_by.push(OrderSpec { expr: self.resolve_expr(&o.expr)?, ..o.clone() });
        }

        let resolved = QueryPlan {
            projection,
            from: plan.from.clone(),
            joins,
            predicate: self.resolve_predicate(plan.predicate.as_ref())?,
            group_by,
            having: self.resolve_predicate(plan.having.as_ref())?,
            order_by,
            offset: plan.offset,
            limit: plan.limit,
            distinct: plan.distinct,
            pending: None,
        };
        trace!(sources = plan.from.len() + plan.joins.len(), items = resolved.projection.len(), "resolved plan");
        Ok(Arc::new(resolved))
    }

    pub fn resolve_mutation(&mut self, plan: &MutationPlan) -> Result<Arc<MutationPlan>, TranslationError> {
        self.table(&plan.target.table)?;
        let kind = match &plan.kind {
            MutationKind::Delete => MutationKind::Delete,
            MutationKind::Update(assignments) => {
                let mut out = assignments.clone();
                for a in out.iter_mut() { a.value = self.resolve_expr(&a.value)?; }
                MutationKind::Update(out)
            }
        };
        Ok(Arc::new(MutationPlan {
            target: plan.target.clone(),
            kind,
            predicate: self.resolve_predicate(plan.predicate.as_ref())?,
        }))
    }

    fn resolve_expr(&mut self, expr: &ScalarExpr) -> Result<ScalarExpr, TranslationError> {
        expr.map_plans(&mut |p| self.resolve(p))
    }

    fn resolve_predicate(&mut self, p: Option<&Predicate>) -> Result<Option<Predicate>, TranslationError> {
        match p {
            Some(p) => Ok(Some(p.map_plans(&mut |plan| self.resolve(plan))?)),
            None => Ok(None),
        }
    }
}

use std::sync::Arc;

use crate::{
    expr::Expression,
    predicate::{all_of, Predicate},
    query::{
        validate::validate_query, BuildError, FetchedRelation, JoinKind, JoinSpec, OrderSpec,
        Projection, ProjectionContext, QueryPlan, SubQuery, TypedQuery,
    },
    schema::{Relation, Source},
};

/// Fluent builder of a select query producing rows of `T`.
///
/// Every call consumes the builder and returns it, so a builder has exactly
/// one owner until `build()` freezes it. Misuse is recorded when it happens
/// and reported by `build()`.
pub struct SelectBuilder<T> {
    plan: QueryPlan,
    projection: Projection<T>,
}

impl<T> SelectBuilder<T> {
    pub(crate) fn new(projection: Projection<T>) -> Self {
        let plan = QueryPlan { projection: projection.items().to_vec(), ..Default::default() };
        Self { plan, projection }
    }

    fn record(mut self, err: BuildError) -> Self {
        if self.plan.pending.is_none() {
            self.plan.pending = Some(err);
        }
        self
    }

    fn push_join(mut self, target: &Source, kind: JoinKind, relation: Option<Relation>) -> Self {
        self.plan.joins.push(JoinSpec::new(target, kind, relation));
        self
    }

    /// Adds a source. Several `from` sources form a cartesian product that
    /// the filter narrows (theta join).
    pub fn from(mut self, source: &Source) -> Self {
        self.plan.from.push(source.clone());
        self
    }

    /// Inner join along a declared relationship, with `target` as the alias
    /// of the related table.
    pub fn join(self, relation: Relation, target: &Source) -> Self {
        self.push_join(target, JoinKind::Inner, Some(relation))
    }

    pub fn left_join(self, relation: Relation, target: &Source) -> Self {
        self.push_join(target, JoinKind::Left, Some(relation))
    }

    /// Inner join with no relationship; `on` must supply the condition.
    pub fn join_unrelated(self, target: &Source) -> Self {
        self.push_join(target, JoinKind::Inner, None)
    }

    pub fn left_join_unrelated(self, target: &Source) -> Self {
        self.push_join(target, JoinKind::Left, None)
    }

    pub fn cross_join(self, target: &Source) -> Self {
        self.push_join(target, JoinKind::Cross, None)
    }

    /// Adds a condition to the last join. Absent predicates are skipped.
    pub fn on(mut self, p: impl Into<Option<Predicate>>) -> Self {
        let Some(p) = p.into() else { return self };
        match self.plan.joins.last_mut() {
            None => self.record(BuildError::OnWithoutJoin),
            Some(join) if join.kind == JoinKind::Cross => {
                let alias = join.target.alias.to_string();
                self.record(BuildError::OnCrossJoin { alias })
            }
            Some(join) => {
                join.on = all_of([join.on.take(), Some(p)]);
                self
            }
        }
    }

    /// Marks the last join as eager: the joined row is attached to the
    /// owning entity in the result.
    pub fn fetch_join(mut self) -> Self {
        match self.plan.joins.last_mut() {
            None => self.record(BuildError::FetchWithoutJoin),
            Some(join) => {
                join.fetch = true;
                self
            }
        }
    }

    /// Adds a WHERE condition. Absent predicates are skipped; with nothing
    /// present the query has no WHERE clause.
    pub fn filter(mut self, p: impl Into<Option<Predicate>>) -> Self {
        self.plan.predicate = all_of([self.plan.predicate.take(), p.into()]);
        self
    }

    /// `filter` over several optional predicates at once.
    pub fn filter_all<I>(mut self, predicates: I) -> Self
    where
        I: IntoIterator<Item = Option<Predicate>>,
    {
        let current = self.plan.predicate.take();
        self.plan.predicate = all_of(std::iter::once(current).chain(predicates));
        self
    }

    pub fn group_by<X>(mut self, key: &Expression<X>) -> Self {
        self.plan.group_by.push(key.node().clone());
        self
    }

    pub fn having(mut self, p: impl Into<Option<Predicate>>) -> Self {
        self.plan.having = all_of([self.plan.having.take(), p.into()]);
        self
    }

    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.plan.order_by.push(spec);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.plan.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.plan.limit = Some(limit);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.plan.distinct = true;
        self
    }

    /// Validates and freezes the query.
    pub fn build(self) -> Result<TypedQuery<T>, BuildError> {
        validate_query(&self.plan, self.projection.shape())?;
        let context = ProjectionContext {
            fetches: self.plan.joins.iter()
                .filter(|j| j.fetch)
                .filter_map(|j| j.relation.as_ref().map(|rel| FetchedRelation {
                    owner: Arc::clone(&rel.owner),
                    relation: Arc::clone(&rel.name),
                    target: Arc::clone(&j.target.alias),
                }))
                .collect(),
        };
        Ok(TypedQuery { plan: Arc::new(self.plan), projection: self.projection, context })
    }

    /// Freezes the query for use inside another one. It is validated, with
    /// the enclosing sources in scope, when the outer query is built.
    pub fn subquery(self) -> SubQuery<T> {
        SubQuery::new(Arc::new(self.plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expr::ScalarExpr, query::Query};

    fn member() -> Source { Source::new("member", "m") }
    fn team() -> Source { Source::new("team", "t") }

    #[test]
    fn absent_filters_leave_no_where_clause() {
        let m = member();
        let q = Query::select_from(&m).filter(None).filter_all([None, None]).build().unwrap();
        assert!(q.plan().predicate.is_none());
    }

    #[test]
    fn on_before_join_is_reported_by_build() {
        let m = member();
        let err = Query::select_from(&m).on(m.column::<i64>("age").eq(1)).build().unwrap_err();
        assert_eq!(err, BuildError::OnWithoutJoin);
    }

    #[test]
    fn first_misuse_wins() {
        let m = member();
        let err = Query::select_from(&m).fetch_join().on(m.column::<i64>("age").eq(1)).build().unwrap_err();
        assert_eq!(err, BuildError::FetchWithoutJoin);
    }

    #[test]
    fn unrelated_join_needs_on() {
        let (m, t) = (member(), team());
        let err = Query::select_from(&m).left_join_unrelated(&t).build().unwrap_err();
        assert_eq!(err, BuildError::MissingJoinCondition { alias: "t".into() });
    }

    #[test]
    fn join_on_cannot_see_later_joins() {
        let (m, t) = (member(), team());
        let t2 = Source::new("team", "t2");
        let name = t.column::<String>("name");
        let err = Query::select_from(&m)
            .join_unrelated(&t)
            .on(name.eq(&t2.column::<String>("name")))
            .join_unrelated(&t2)
            .on(t2.column::<i64>("id").eq(&m.column::<i64>("team_id")))
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::UnknownSource { alias: "t2".into(), clause: "join on" });

        let ok = Query::select_from(&m)
            .join_unrelated(&t)
            .on(t.column::<i64>("id").eq(&m.column::<i64>("team_id")))
            .join_unrelated(&t2)
            .on(t2.column::<String>("name").eq(&name))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn relation_owner_must_be_joined_first() {
        let (m, t) = (member(), team());
        let m2 = Source::new("member", "m2");
        let err = Query::select_from(&t)
            .join(m2.relation("team"), &m)
            .join_unrelated(&m2)
            .on(m2.column::<i64>("id").eq(&m.column::<i64>("id")))
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::UnknownRelationOwner { owner: "m2".into(), relation: "team".into() });
    }

    #[test]
    fn projection_labels_must_be_unique() {
        let (m, t) = (member(), team());
        let username = m.column::<String>("username");
        let name = t.column::<String>("name");
        let err = Query::select(Projection::tuple((username.alias("n"), name.alias("n"))))
            .from(&m)
            .join(m.relation("team"), &t)
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::DuplicateLabel("n".into()));

        let err = Query::select(Projection::tuple((m.column::<i64>("age").add(1), username.alias("_c0"))))
            .from(&m)
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::DuplicateLabel("_c0".into()));

        let same = Query::select(Projection::tuple((&username, &username))).from(&m).build();
        assert!(same.is_ok());
    }

    #[test]
    fn typed_query_debug_names_its_plan() {
        let q = Query::select_from(&member()).build().unwrap();
        let out = format!("{:?}", q);
        assert!(out.starts_with("TypedQuery"));
        assert!(out.contains("plan"));
    }

    #[test]
    fn order_by_unknown_source_is_rejected() {
        let (m, t) = (member(), team());
        let err = Query::select_from(&m).order_by(t.column::<String>("name").asc()).build().unwrap_err();
        assert_eq!(err, BuildError::UnknownSource { alias: "t".into(), clause: "order by" });
    }

    #[test]
    fn group_by_needs_an_aggregate() {
        let (m, t) = (member(), team());
        let name = t.column::<String>("name");
        let err = Query::select(&name).from(&m).join(m.relation("team"), &t).group_by(&name).build().unwrap_err();
        assert_eq!(err, BuildError::GroupByWithoutAggregate);
    }

    #[test]
    fn grouped_projection_must_use_group_keys() {
        let m = member();
        let username = m.column::<String>("username");
        let age = m.column::<i64>("age");
        let err = Query::select(Projection::tuple((&username, age.avg())))
            .from(&m)
            .group_by(&m.column::<i64>("team_id"))
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::NotGrouped { expr: "m.username".into(), clause: "select" });
    }

    #[test]
    fn aggregates_are_rejected_in_where() {
        let m = member();
        let age = m.column::<i64>("age");
        let err = Query::select_from(&m).filter(age.max().gt(10)).build().unwrap_err();
        assert_eq!(err, BuildError::MisplacedAggregate { clause: "where" });
    }

    #[test]
    fn fetch_join_needs_projected_owner() {
        let (m, t) = (member(), team());
        let err = Query::select(m.column::<String>("username"))
            .from(&m)
            .join(m.relation("team"), &t)
            .fetch_join()
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidFetchJoin { .. }));
    }

    #[test]
    fn subquery_must_be_scalar() {
        let m = member();
        let sub_m = Source::new("member", "ms");
        let sub = Query::select(Projection::tuple((sub_m.column::<i64>("age"), sub_m.column::<i64>("id"))))
            .from(&sub_m)
            .subquery();
        let p = Predicate::InSubquery { expr: ScalarExpr::column("m", "age"), plan: Arc::clone(sub.plan()), negated: false };
        let err = Query::select_from(&m).filter(p).build().unwrap_err();
        assert_eq!(err, BuildError::SubqueryNotScalar);
    }

    #[test]
    fn correlated_subquery_sees_outer_sources() {
        let m = member();
        let ms = Source::new("member", "ms");
        let sub = Query::select(ms.column::<i64>("age").max())
            .from(&ms)
            .filter(ms.column::<i64>("team_id").eq(m.column::<i64>("team_id")))
            .subquery();
        assert!(Query::select_from(&m).filter(m.column::<i64>("age").eq(&sub)).build().is_ok());
        assert!(Query::select(ms.column::<i64>("age").max()).from(&ms).filter(ms.column::<i64>("team_id").eq(m.column::<i64>("team_id"))).build().is_err());
    }

    #[test]
    fn dto_fields_need_names() {
        #[derive(serde::Deserialize)]
        #[allow(dead_code)]
        struct Dto { username: String, age: i64 }
        let m = member();
        let p: Projection<Dto> = Projection::fields((m.column::<String>("username"), m.column::<i64>("age").add(1)));
        let err = Query::select(p).from(&m).build().unwrap_err();
        assert_eq!(err, BuildError::MissingFieldName { index: 1 });
    }

    #[test]
    fn built_plans_are_shareable_across_threads() {
        fn assert_send_sync<X: Send + Sync>(_: &X) {}
        let m = member();
        let q = Query::select_from(&m).build().unwrap();
        assert_send_sync(q.plan());
    }
}

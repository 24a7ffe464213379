use crate::{
    expr::{Expression, Operand, ScalarExpr, SqlType},
    predicate::{all_of, Predicate},
    query::{validate::validate_mutation, BuildError},
    schema::Source,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: ScalarExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationKind {
    Update(Vec<Assignment>),
    Delete,
}

/// Frozen bulk UPDATE or DELETE over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationPlan {
    pub target: Source,
    pub kind: MutationKind,
    pub predicate: Option<Predicate>,
}

pub struct UpdateBuilder {
    target: Source,
    assignments: Vec<Assignment>,
    predicate: Option<Predicate>,
    pending: Option<BuildError>,
}

impl UpdateBuilder {
    pub(crate) fn new(target: &Source) -> Self {
        Self { target: target.clone(), assignments: Vec::new(), predicate: None, pending: None }
    }

    /// `SET column = value`. Values are evaluated against the row as it was
    /// before the update.
    pub fn set<T: SqlType>(mut self, column: &Expression<T>, value: impl Operand<Sql = T>) -> Self {
        match column.node() {
            ScalarExpr::Column(c) if c.source == self.target.alias => {
                self.assignments.push(Assignment { column: c.name.to_string(), value: value.into_scalar() });
            }
            other => {
                if self.pending.is_none() {
                    self.pending = Some(BuildError::InvalidAssignment {
                        column: other.to_string(),
                        target: self.target.alias.to_string(),
                    });
                }
            }
        }
        self
    }

    pub fn filter(mut self, p: impl Into<Option<Predicate>>) -> Self {
        self.predicate = all_of([self.predicate.take(), p.into()]);
        self
    }

    pub fn filter_all<I: IntoIterator<Item = Option<Predicate>>>(mut self, predicates: I) -> Self {
        let current = self.predicate.take();
        self.predicate = all_of(std::iter::once(current).chain(predicates));
        self
    }

    pub fn build(self) -> Result<MutationPlan, BuildError> {
        if let Some(err) = self.pending {
            return Err(err);
        }
        if self.assignments.is_empty() {
            return Err(BuildError::NoAssignments);
        }
        let values: Vec<&ScalarExpr> = self.assignments.iter().map(|a| &a.value).collect();
        validate_mutation(&self.target, &values, self.predicate.as_ref())?;
        Ok(MutationPlan { target: self.target, kind: MutationKind::Update(self.assignments), predicate: self.predicate })
    }
}

pub struct DeleteBuilder {
    target: Source,
    predicate: Option<Predicate>,
}

impl DeleteBuilder {
    pub(crate) fn new(target: &Source) -> Self {
        Self { target: target.clone(), predicate: None }
    }

    pub fn filter(mut self, p: impl Into<Option<Predicate>>) -> Self {
        self.predicate = all_of([self.predicate.take(), p.into()]);
        self
    }

    pub fn filter_all<I: IntoIterator<Item = Option<Predicate>>>(mut self, predicates: I) -> Self {
        let current = self.predicate.take();
        self.predicate = all_of(std::iter::once(current).chain(predicates));
        self
    }

    pub fn build(self) -> Result<MutationPlan, BuildError> {
        validate_mutation(&self.target, &[], self.predicate.as_ref())?;
        Ok(MutationPlan { target: self.target, kind: MutationKind::Delete, predicate: self.predicate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;

    #[test]
    fn update_rejects_foreign_columns() {
        let m = Source::new("member", "m");
        let t = Source::new("team", "t");
        let err = Query::update(&m).set(&t.column::<String>("name"), "x").build().unwrap_err();
        assert_eq!(err, BuildError::InvalidAssignment { column: "t.name".into(), target: "m".into() });
    }

    #[test]
    fn update_needs_assignments() {
        let m = Source::new("member", "m");
        assert_eq!(Query::update(&m).build().unwrap_err(), BuildError::NoAssignments);
    }

    #[test]
    fn update_values_may_read_the_row() {
        let m = Source::new("member", "m");
        let age = m.column::<i64>("age");
        let plan = Query::update(&m).set(&age, age.add(1)).build().unwrap();
        let MutationKind::Update(assignments) = plan.kind else { panic!("expected update") };
        assert_eq!(assignments[0].column, "age");
        assert!(plan.predicate.is_none());
    }

    #[test]
    fn delete_filter_must_reference_target() {
        let m = Source::new("member", "m");
        let t = Source::new("team", "t");
        let err = Query::delete(&m).filter(t.column::<String>("name").eq("teamA")).build().unwrap_err();
        assert_eq!(err, BuildError::UnknownSource { alias: "t".into(), clause: "where" });
    }
}

use crate::predicate::Predicate;

/// Conjunction of the present predicates.
///
/// Absent entries are skipped (they are the identity of AND), nested
/// conjunctions are flattened and a single present entry comes back as is.
/// With every entry absent the result is absent, so a WHERE clause built
/// from it is simply omitted.
pub fn all_of<I>(predicates: I) -> Option<Predicate>
where
    I: IntoIterator<Item = Option<Predicate>>,
{
    combine(predicates, true)
}

/// Disjunction of the present predicates; same absent-skipping rules as
/// [`all_of`].
pub fn any_of<I>(predicates: I) -> Option<Predicate>
where
    I: IntoIterator<Item = Option<Predicate>>,
{
    combine(predicates, false)
}

fn combine<I>(predicates: I, conjunction: bool) -> Option<Predicate>
where
    I: IntoIterator<Item = Option<Predicate>>,
{
    let mut parts = Vec::new();
    for p in predicates.into_iter().flatten() {
        Predicate::push_flat(&mut parts, p, conjunction);
    }
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ if conjunction => Some(Predicate::And(parts)),
        _ => Some(Predicate::Or(parts)),
    }
}

/// Single-owner accumulator for predicates assembled step by step, e.g. from
/// optional search parameters.
#[derive(Debug, Clone, Default)]
pub struct PredicateBuilder {
    current: Option<Predicate>,
}

impl PredicateBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn and(&mut self, p: impl Into<Option<Predicate>>) -> &mut Self {
        self.current = all_of([self.current.take(), p.into()]);
        self
    }

    pub fn or(&mut self, p: impl Into<Option<Predicate>>) -> &mut Self {
        self.current = any_of([self.current.take(), p.into()]);
        self
    }

    /// Negates what has been accumulated so far; nothing to negate is a no-op.
    pub fn not(&mut self) -> &mut Self {
        self.current = self.current.take().map(Predicate::not);
        self
    }

    pub fn has_value(&self) -> bool { self.current.is_some() }

    pub fn build(&self) -> Option<Predicate> { self.current.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ComparatorOp, ScalarExpr};

    fn eq(col: &str, v: &str) -> Predicate {
        Predicate::compare(ScalarExpr::column("m", col), ComparatorOp::Eq, ScalarExpr::literal(v))
    }

    #[test]
    fn all_absent_is_absent() {
        assert_eq!(all_of([None, None]), None);
        assert_eq!(any_of(Vec::<Option<Predicate>>::new()), None);
    }

    #[test]
    fn single_present_entry_is_returned_as_is() {
        assert_eq!(all_of([None, Some(eq("a", "x")), None]), Some(eq("a", "x")));
    }

    #[test]
    fn nested_conjunctions_are_flattened() {
        let inner = all_of([Some(eq("a", "x")), Some(eq("b", "y"))]);
        let outer = all_of([inner, Some(eq("c", "z"))]);
        assert_eq!(outer, Some(Predicate::And(vec![eq("a", "x"), eq("b", "y"), eq("c", "z")])));
    }

    #[test]
    fn builder_skips_absent_conditions() {
        let username: Option<&str> = Some("member1");
        let age: Option<&str> = None;
        let mut builder = PredicateBuilder::new();
        builder.and(username.map(|u| eq("username", u)));
        builder.and(age.map(|a| eq("age", a)));
        assert!(builder.has_value());
        assert_eq!(builder.build(), Some(eq("username", "member1")));
    }

    #[test]
    fn empty_builder_negation_is_noop() {
        let mut builder = PredicateBuilder::new();
        builder.not();
        assert!(!builder.has_value());
        assert_eq!(builder.build(), None);
    }
}

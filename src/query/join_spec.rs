use crate::{predicate::Predicate, schema::{Relation, Source}};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Cross,
}

/// A joined source.
///
/// With `relation` set, the key equality comes from the relationship
/// metadata and `on` (if any) is an extra condition. Without it, `on` is the
/// whole condition. `fetch` asks the result mapper to attach the joined row to
/// the owning entity.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub target: Source,
    pub kind: JoinKind,
    pub relation: Option<Relation>,
    pub on: Option<Predicate>,
    pub fetch: bool,
}

impl JoinSpec {
    pub fn new(target: &Source, kind: JoinKind, relation: Option<Relation>) -> Self {
        Self { target: target.clone(), kind, relation, on: None, fetch: false }
    }
}

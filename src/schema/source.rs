use std::{fmt, sync::Arc};

use crate::{
    expr::{AggregateFunction, ColumnRef, Expression, ScalarExpr},
    query::SelectItem,
};

/// A table visible in a query under an alias.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Source {
    pub table: Arc<str>,
    pub alias: Arc<str>,
}

impl Source {
    pub fn new(table: &str, alias: &str) -> Self {
        Self { table: Arc::from(table.to_ascii_lowercase()), alias: Arc::from(alias) }
    }

    /// Typed column of this source.
    pub fn column<T>(&self, name: &str) -> Expression<T> {
        Expression::from_node(ScalarExpr::Column(ColumnRef::new(&self.alias, name)))
    }

    /// Named relationship owned by this source, used as a join path.
    pub fn relation(&self, name: &str) -> Relation {
        Relation { owner: Arc::clone(&self.alias), name: Arc::from(name) }
    }

    /// `COUNT(*)` over the rows of the query.
    pub fn count(&self) -> Expression<i64> {
        Expression::from_node(ScalarExpr::aggregate(AggregateFunction::Count, None, false))
    }

    /// Entity projection item: every column of this source.
    pub fn all(&self) -> SelectItem {
        SelectItem::AllColumns { source: self.clone() }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source({} {})", self.table, self.alias)
    }
}

/// Relationship `name` of the source aliased `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    pub owner: Arc<str>,
    pub name: Arc<str>,
}

use std::{fmt, marker::PhantomData, sync::Arc};

use crate::{
    expr::{Aliased, Expression, ScalarExpr},
    query::{Projection, ProjectionContext, QueryPlan},
};

/// A validated query together with the mapping of its rows into `T`.
pub struct TypedQuery<T> {
    pub(crate) plan: Arc<QueryPlan>,
    pub(crate) projection: Projection<T>,
    pub(crate) context: ProjectionContext,
}

impl<T> Clone for TypedQuery<T> {
    fn clone(&self) -> Self {
        Self { plan: Arc::clone(&self.plan), projection: self.projection.clone(), context: self.context.clone() }
    }
}

impl<T> fmt::Debug for TypedQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedQuery")
            .field("plan", &self.plan)
            .field("projection", &self.projection)
            .field("context", &self.context)
            .finish()
    }
}

impl<T> TypedQuery<T> {
    pub fn plan(&self) -> &Arc<QueryPlan> { &self.plan }

    pub fn projection(&self) -> &Projection<T> { &self.projection }

    pub fn context(&self) -> &ProjectionContext { &self.context }
}

/// A select query used as a value inside another query. It is checked when
/// the enclosing query is built, where its outer sources are known.
pub struct SubQuery<T> {
    pub(crate) plan: Arc<QueryPlan>,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Clone for SubQuery<T> {
    fn clone(&self) -> Self { Self::new(Arc::clone(&self.plan)) }
}

impl<T> fmt::Debug for SubQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SubQuery").field(&self.plan).finish()
    }
}

impl<T> SubQuery<T> {
    pub(crate) fn new(plan: Arc<QueryPlan>) -> Self {
        Self { plan, _ty: PhantomData }
    }

    pub fn plan(&self) -> &Arc<QueryPlan> { &self.plan }

    pub fn as_expr(&self) -> Expression<T> {
        Expression::from_node(ScalarExpr::Subquery(Arc::clone(&self.plan)))
    }

    pub fn alias(&self, name: &str) -> Aliased<T> {
        self.as_expr().alias(name)
    }
}

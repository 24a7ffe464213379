use crate::{
    query::{DeleteBuilder, Entity, Projection, SelectBuilder, UpdateBuilder},
    schema::Source,
};

/// Entry points of the builder API.
pub struct Query;

impl Query {
    /// Starts a select of `projection`; add sources with `from`.
    pub fn select<T>(projection: impl Into<Projection<T>>) -> SelectBuilder<T> {
        SelectBuilder::new(projection.into())
    }

    /// Selects the entity of `source` from `source`.
    pub fn select_from(source: &Source) -> SelectBuilder<Entity> {
        SelectBuilder::new(Projection::entity(source)).from(source)
    }

    pub fn update(target: &Source) -> UpdateBuilder {
        UpdateBuilder::new(target)
    }

    pub fn delete(target: &Source) -> DeleteBuilder {
        DeleteBuilder::new(target)
    }
}

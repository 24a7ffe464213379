use std::{fmt, sync::Arc};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    expr::{Aliased, Expression},
    query::{Entity, ExprTuple, FromValue, ProjectionError, SelectItem, SubQuery, Tuple, TypedItem},
    schema::Source,
    storage::Row,
};

/// A fetch-joined relation: rows of `target` nest under `relation` in the
/// entity of `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRelation {
    pub owner: Arc<str>,
    pub relation: Arc<str>,
    pub target: Arc<str>,
}

/// Plan facts the row mapper needs, fixed at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionContext {
    pub fetches: Vec<FetchedRelation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultShape {
    Entity(Source),
    Scalar,
    Tuple,
    Constructor,
    Fields,
    Bean,
}

type Mapper<T> = Arc<dyn Fn(&Row, &ProjectionContext) -> Result<T, ProjectionError> + Send + Sync>;

/// What a query selects and how each returned row becomes a `T`.
pub struct Projection<T> {
    items: Vec<SelectItem>,
    shape: ResultShape,
    mapper: Mapper<T>,
}

impl<T> Clone for Projection<T> {
    fn clone(&self) -> Self {
        Self { items: self.items.clone(), shape: self.shape.clone(), mapper: Arc::clone(&self.mapper) }
    }
}

impl<T> fmt::Debug for Projection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection").field("items", &self.items).field("shape", &self.shape).finish()
    }
}

fn labelled(items: &[SelectItem]) -> Vec<(SelectItem, String)> {
    items.iter().enumerate().map(|(i, item)| (item.clone(), item.label(i))).collect()
}

impl<T> Projection<T> {
    pub fn items(&self) -> &[SelectItem] { &self.items }

    pub fn shape(&self) -> &ResultShape { &self.shape }

    pub fn map_row(&self, row: &Row, ctx: &ProjectionContext) -> Result<T, ProjectionError> {
        (self.mapper)(row, ctx)
    }
}

impl Projection<Entity> {
    /// Every column of `source`, with its fetched relations.
    pub fn entity(source: &Source) -> Self {
        let alias = Arc::clone(&source.alias);
        Projection {
            items: vec![source.all()],
            shape: ResultShape::Entity(source.clone()),
            mapper: Arc::new(move |row, ctx| Ok(Entity::from_row(&alias, row, ctx))),
        }
    }
}

impl<M: DeserializeOwned + Send + 'static> Projection<M> {
    /// Entity projection deserialized into `M`.
    pub fn entity_as(source: &Source) -> Self {
        let alias = Arc::clone(&source.alias);
        Projection {
            items: vec![source.all()],
            shape: ResultShape::Entity(source.clone()),
            mapper: Arc::new(move |row, ctx| Entity::from_row(&alias, row, ctx).deserialize()),
        }
    }

    /// Items assigned to the fields of `M` by name: the item alias, or the
    /// column name for bare columns.
    pub fn fields<X: ExprTuple>(items: X) -> Self {
        let items = items.items();
        let names: Vec<(String, String)> = items.iter().enumerate()
            .map(|(i, item)| (item.field_name().unwrap_or_default(), item.label(i)))
            .collect();
        Projection {
            items,
            shape: ResultShape::Fields,
            mapper: Arc::new(move |row, _| {
                let mut object = Map::new();
                for (name, label) in &names {
                    object.insert(name.clone(), row.get(label).cloned().unwrap_or(Value::Null));
                }
                serde_json::from_value(Value::Object(object))
                    .map_err(|source| ProjectionError::Deserialize { target: std::any::type_name::<M>(), source })
            }),
        }
    }
}

impl<T: Send + 'static> Projection<T> {
    /// A single value per row.
    pub fn scalar<I: TypedItem<Value = T>>(item: I) -> Self {
        let first = item.select_item();
        let label = first.label(0);
        Projection {
            items: vec![first.clone()],
            shape: ResultShape::Scalar,
            mapper: Arc::new(move |row, ctx| I::read(&first, &label, row, ctx)),
        }
    }

    /// Typed positional mapping: the items are read as a Rust tuple and
    /// handed to `build`.
    pub fn constructor<X, F>(items: X, build: F) -> Self
    where
        X: ExprTuple,
        F: Fn(X::Output) -> T + Send + Sync + 'static,
    {
        let items = items.items();
        let labels = labelled(&items);
        Projection {
            items,
            shape: ResultShape::Constructor,
            mapper: Arc::new(move |row, ctx| X::read(&labels, row, ctx).map(&build)),
        }
    }
}

impl Projection<Tuple> {
    pub fn tuple<X: ExprTuple>(items: X) -> Self {
        let items = items.items();
        let labels = Arc::new(labelled(&items));
        Projection {
            items,
            shape: ResultShape::Tuple,
            mapper: Arc::new(move |row, ctx| Ok(Tuple::new(Arc::clone(&labels), row.clone(), ctx.clone()))),
        }
    }
}

impl<D: Send + 'static> Projection<D> {
    /// Setter-based DTO mapping, started from a factory for the empty DTO.
    pub fn bean(factory: fn() -> D) -> Bean<D> {
        Bean { factory, items: Vec::new(), setters: Vec::new() }
    }
}

type Setter<D> = Box<dyn Fn(&mut D, &Row, &ProjectionContext) -> Result<(), ProjectionError> + Send + Sync>;

/// Builder of a setter-based projection: each `set` adds an item and the
/// typed setter that stores it.
pub struct Bean<D> {
    factory: fn() -> D,
    items: Vec<SelectItem>,
    setters: Vec<Setter<D>>,
}

impl<D: Send + 'static> Bean<D> {
    pub fn set<I, S>(mut self, item: I, setter: S) -> Self
    where
        I: TypedItem,
        S: Fn(&mut D, I::Value) + Send + Sync + 'static,
    {
        let select_item = item.select_item();
        let label = select_item.label(self.items.len());
        let read_item = select_item.clone();
        self.items.push(select_item);
        self.setters.push(Box::new(move |dto, row, ctx| {
            setter(dto, I::read(&read_item, &label, row, ctx)?);
            Ok(())
        }));
        self
    }
}

impl<D: Send + 'static> From<Bean<D>> for Projection<D> {
    fn from(bean: Bean<D>) -> Self {
        let Bean { factory, items, setters } = bean;
        Projection {
            items,
            shape: ResultShape::Bean,
            mapper: Arc::new(move |row, ctx| {
                let mut dto = factory();
                for set in &setters {
                    set(&mut dto, row, ctx)?;
                }
                Ok(dto)
            }),
        }
    }
}

impl<T: FromValue> From<Expression<T>> for Projection<T> {
    fn from(expr: Expression<T>) -> Self { Projection::scalar(expr) }
}

impl<T: FromValue> From<&Expression<T>> for Projection<T> {
    fn from(expr: &Expression<T>) -> Self { Projection::scalar(expr.clone()) }
}

impl<T: FromValue> From<Aliased<T>> for Projection<T> {
    fn from(expr: Aliased<T>) -> Self { Projection::scalar(expr) }
}

impl<T: FromValue> From<SubQuery<T>> for Projection<T> {
    fn from(sub: SubQuery<T>) -> Self { Projection::scalar(sub) }
}

impl From<&Source> for Projection<Entity> {
    fn from(source: &Source) -> Self { Projection::entity(source) }
}

use std::sync::Arc;

use serde_json::Value;

use crate::{
    expr::{Aliased, Expression},
    query::{Entity, FromValue, ProjectionContext, ProjectionError, SelectItem, SubQuery},
    schema::Source,
    storage::Row,
};

/// A value that can appear in a projection and be read back from a row with
/// a known Rust type.
pub trait TypedItem {
    type Value: Send + 'static;

    fn select_item(&self) -> SelectItem;

    /// Reads the item from `row`, where it was labelled `label`.
    fn read(item: &SelectItem, label: &str, row: &Row, ctx: &ProjectionContext) -> Result<Self::Value, ProjectionError>;
}

pub(crate) fn read_value<T: FromValue>(label: &str, row: &Row) -> Result<T, ProjectionError> {
    match row.get(label) {
        Some(v) => T::from_value(label, v),
        None => Err(ProjectionError::MissingColumn { label: label.to_string() }),
    }
}

impl<T: FromValue> TypedItem for Expression<T> {
    type Value = T;
    fn select_item(&self) -> SelectItem { SelectItem::expr(self.node().clone()) }
    fn read(_: &SelectItem, label: &str, row: &Row, _: &ProjectionContext) -> Result<T, ProjectionError> {
        read_value(label, row)
    }
}

impl<T: FromValue> TypedItem for &Expression<T> {
    type Value = T;
    fn select_item(&self) -> SelectItem { SelectItem::expr(self.node().clone()) }
    fn read(_: &SelectItem, label: &str, row: &Row, _: &ProjectionContext) -> Result<T, ProjectionError> {
        read_value(label, row)
    }
}

impl<T: FromValue> TypedItem for Aliased<T> {
    type Value = T;
    fn select_item(&self) -> SelectItem { SelectItem::aliased(self.expr.node().clone(), &self.alias) }
    fn read(_: &SelectItem, label: &str, row: &Row, _: &ProjectionContext) -> Result<T, ProjectionError> {
        read_value(label, row)
    }
}

impl<T: FromValue> TypedItem for SubQuery<T> {
    type Value = T;
    fn select_item(&self) -> SelectItem { SelectItem::expr(self.as_expr().into_node()) }
    fn read(_: &SelectItem, label: &str, row: &Row, _: &ProjectionContext) -> Result<T, ProjectionError> {
        read_value(label, row)
    }
}

impl TypedItem for &Source {
    type Value = Entity;
    fn select_item(&self) -> SelectItem { self.all() }
    fn read(item: &SelectItem, label: &str, row: &Row, ctx: &ProjectionContext) -> Result<Entity, ProjectionError> {
        match item {
            SelectItem::AllColumns { source } => Ok(Entity::from_row(&source.alias, row, ctx)),
            SelectItem::Expr { .. } => Err(ProjectionError::MissingColumn { label: label.to_string() }),
        }
    }
}

/// A fixed-arity group of typed items, read back as a Rust tuple.
pub trait ExprTuple {
    type Output: Send + 'static;

    fn items(&self) -> Vec<SelectItem>;

    fn read(items: &[(SelectItem, String)], row: &Row, ctx: &ProjectionContext) -> Result<Self::Output, ProjectionError>;
}

fn item_at(items: &[(SelectItem, String)], index: usize) -> Result<&(SelectItem, String), ProjectionError> {
    items.get(index).ok_or_else(|| ProjectionError::MissingColumn { label: format!("_c{}", index) })
}

macro_rules! expr_tuple {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: TypedItem),+> ExprTuple for ($($name,)+) {
            type Output = ($($name::Value,)+);

            fn items(&self) -> Vec<SelectItem> {
                vec![$(self.$idx.select_item()),+]
            }

            fn read(items: &[(SelectItem, String)], row: &Row, ctx: &ProjectionContext) -> Result<Self::Output, ProjectionError> {
                Ok(($({
                    let (item, label) = item_at(items, $idx)?;
                    $name::read(item, label, row, ctx)?
                },)+))
            }
        }
    };
}

expr_tuple!(A 0);
expr_tuple!(A 0, B 1);
expr_tuple!(A 0, B 1, C 2);
expr_tuple!(A 0, B 1, C 2, D 3);
expr_tuple!(A 0, B 1, C 2, D 3, E 4);
expr_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);

/// Untyped result row, read back through the expressions that produced it.
#[derive(Debug, Clone)]
pub struct Tuple {
    items: Arc<Vec<(SelectItem, String)>>,
    row: Row,
    ctx: ProjectionContext,
}

impl Tuple {
    pub(crate) fn new(items: Arc<Vec<(SelectItem, String)>>, row: Row, ctx: ProjectionContext) -> Self {
        Self { items, row, ctx }
    }

    /// Value of the projection item built from `expr`.
    pub fn get<T: FromValue>(&self, expr: &Expression<T>) -> Result<T, ProjectionError> {
        let label = self.items.iter()
            .find(|(item, _)| item.scalar() == Some(expr.node()))
            .map(|(_, label)| label.as_str())
            .ok_or_else(|| ProjectionError::MissingColumn { label: expr.node().to_string() })?;
        read_value(label, &self.row)
    }

    /// Value of the projection item labelled `label`.
    pub fn get_by_label<T: FromValue>(&self, label: &str) -> Result<T, ProjectionError> {
        read_value(label, &self.row)
    }

    /// Entity of `source`, `None` when every column is NULL.
    pub fn entity(&self, source: &Source) -> Option<Entity> {
        let entity = Entity::from_row(&source.alias, &self.row, &self.ctx);
        if entity.is_empty() { None } else { Some(entity) }
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.row.values()
    }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}

use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    query::{FromValue, ProjectionContext, ProjectionError},
    schema::Relation,
    storage::Row,
};

/// All columns of one source in a result row, plus the rows of fetch-joined
/// relations owned by it.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    alias: Arc<str>,
    values: IndexMap<String, Value>,
    related: IndexMap<String, Option<Entity>>,
}

impl Entity {
    /// Collects the `alias.`-prefixed columns of `row` and nests the fetched
    /// relations `ctx` lists for this alias.
    pub(crate) fn from_row(alias: &str, row: &Row, ctx: &ProjectionContext) -> Entity {
        let prefix = format!("{}.", alias);
        let values = row.iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|col| (col.to_string(), v.clone())))
            .collect();

        let mut related = IndexMap::new();
        for fetch in ctx.fetches.iter().filter(|f| &*f.owner == alias) {
            let target = Entity::from_row(&fetch.target, row, ctx);
            let loaded = if target.is_empty() { None } else { Some(target) };
            related.insert(fetch.relation.to_string(), loaded);
        }

        Entity { alias: Arc::from(alias), values, related }
    }

    /// No columns, or every column NULL (the unmatched side of a left join).
    pub fn is_empty(&self) -> bool {
        self.values.values().all(Value::is_null)
    }

    pub fn alias(&self) -> &str { &self.alias }

    pub fn values(&self) -> &IndexMap<String, Value> { &self.values }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn get_as<T: FromValue>(&self, column: &str) -> Result<T, ProjectionError> {
        let label = format!("{}.{}", self.alias, column);
        match self.values.get(column) {
            Some(v) => T::from_value(&label, v),
            None => Err(ProjectionError::MissingColumn { label }),
        }
    }

    /// The related entity if the relation was fetch-joined and matched.
    pub fn related(&self, relation: &Relation) -> Option<&Entity> {
        self.related.get(&*relation.name).and_then(Option::as_ref)
    }

    /// Whether the relation was fetch-joined, matched or not.
    pub fn is_loaded(&self, relation: &Relation) -> bool {
        self.related.contains_key(&*relation.name)
    }

    /// Columns as a JSON object; fetched relations nest under their name.
    pub fn to_json(&self) -> Value {
        let mut map: Map<String, Value> = self.values.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        for (name, entity) in &self.related {
            map.insert(name.clone(), entity.as_ref().map_or(Value::Null, Entity::to_json));
        }
        Value::Object(map)
    }

    pub fn deserialize<M: DeserializeOwned>(&self) -> Result<M, ProjectionError> {
        serde_json::from_value(self.to_json())
            .map_err(|source| ProjectionError::Deserialize { target: std::any::type_name::<M>(), source })
    }
}

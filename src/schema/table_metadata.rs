use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::schema::{FieldInfo, Relationship};

/// Column list and declared relationships of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMetadata {
    pub name: String,
    /// Column name -> inferred type, in first-seen order.
    pub columns: IndexMap<String, FieldInfo>,
    /// Relationship name -> relationship owned by this table.
    pub relationships: IndexMap<String, Relationship>,
}

impl TableMetadata {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_ascii_lowercase(), ..Default::default() }
    }

    pub fn column(&self, name: &str) -> Option<&FieldInfo> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }

    /// Folds one row into the inferred columns. Columns missing from the row
    /// become nullable; new columns seen after the first row start nullable.
    pub fn merge_row(&mut self, row: &Map<String, Value>) {
        let first_row = self.columns.is_empty();
        for (key, info) in self.columns.iter_mut() {
            if !row.contains_key(key) {
                info.nullable = true;
            }
        }
        for (key, value) in row {
            let observed = FieldInfo::infer(value);
            match self.columns.get_mut(key) {
                Some(old) => *old = old.merge(&observed),
                None => {
                    let nullable = observed.nullable || !first_row;
                    self.columns.insert(key.clone(), FieldInfo { nullable, ..observed });
                }
            }
        }
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.insert(relationship.name.clone(), relationship);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::JsonPrimitive;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn nullability_follows_missing_and_null_values() {
        let mut t = TableMetadata::new("Member");
        t.merge_row(&obj(json!({"id": 1, "username": "a", "age": 30})));
        assert_eq!(t.name, "member");
        assert_eq!(t.column("age").unwrap().ty, JsonPrimitive::Int);
        assert!(!t.column("age").unwrap().nullable);

        t.merge_row(&obj(json!({"id": 2, "username": "b"})));
        assert!(t.column("age").unwrap().nullable);
        assert!(!t.column("username").unwrap().nullable);

        t.merge_row(&obj(json!({"id": 3, "username": null, "email": "c@x"})));
        assert!(t.column("username").unwrap().nullable);
        assert!(t.column("email").unwrap().nullable);
    }

    #[test]
    fn columns_keep_first_seen_order() {
        let mut t = TableMetadata::new("team");
        t.merge_row(&obj(json!({"name": "teamA"})));
        t.merge_row(&obj(json!({"name": "teamB", "id": 2})));
        assert_eq!(t.column_names().collect::<Vec<_>>(), vec!["name", "id"]);
    }
}

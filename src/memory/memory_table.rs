use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{
    memory::{IdManager, StoreConfig},
    schema::{Relationship, TableMetadata},
    storage::StorageError,
};

/// Rows of one table keyed by id, in insertion order, with the metadata
/// inferred from them.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    config: StoreConfig,
    rows: IndexMap<String, Map<String, Value>>,
    id_manager: IdManager,
    metadata: TableMetadata,
}

impl MemoryTable {
    pub fn new(name: &str, config: StoreConfig) -> Self {
        let id_manager = IdManager::new(config.id_type);
        Self { config, rows: IndexMap::new(), id_manager, metadata: TableMetadata::new(name) }
    }

    pub fn name(&self) -> &str { &self.metadata.name }

    pub fn config(&self) -> &StoreConfig { &self.config }

    pub fn metadata(&self) -> &TableMetadata { &self.metadata }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn rows(&self) -> impl Iterator<Item = (&String, &Map<String, Value>)> {
        self.rows.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Map<String, Value>> {
        self.rows.get(id)
    }

    /// Adds one document. A present id is kept; a missing one is generated
    /// unless the table uses `IdType::None`.
    pub fn insert(&mut self, item: Value) -> Result<Value, StorageError> {
        let Value::Object(mut map) = item else {
            return Err(StorageError::InvalidDocument);
        };
        let id_key = self.config.id_key.clone();
        let id = match map.get(&id_key) {
            Some(Value::Null) | None => {
                let generated = self.id_manager.next()
                    .ok_or_else(|| StorageError::MissingId(id_key.clone()))?;
                map.insert(id_key.clone(), generated.to_json());
                generated.to_string()
            }
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => {
                self.id_manager.observe(&Value::Number(n.clone()));
                n.to_string()
            }
            Some(_) => return Err(StorageError::MissingId(id_key)),
        };
        if self.rows.contains_key(&id) {
            return Err(StorageError::DuplicateId { table: self.metadata.name.clone(), id });
        }
        self.metadata.merge_row(&map);
        self.rows.insert(id, map.clone());
        Ok(Value::Object(map))
    }

    /// Adds every object of a JSON array; stops at the first invalid one.
    pub fn insert_batch(&mut self, items: Value) -> Result<Vec<Value>, StorageError> {
        let Value::Array(items) = items else {
            return Err(StorageError::InvalidDocument);
        };
        let mut added = Vec::with_capacity(items.len());
        for item in items {
            added.push(self.insert(item)?);
        }
        Ok(added)
    }

    /// Loads a JSON array, replacing the current rows unless `keep` is set.
    pub fn load_from_json(&mut self, value: Value, keep: bool) -> Result<usize, StorageError> {
        if !value.is_array() {
            return Err(StorageError::InvalidDocument);
        }
        if !keep {
            self.clear();
        }
        Ok(self.insert_batch(value)?.len())
    }

    pub fn clear(&mut self) -> usize {
        let count = self.rows.len();
        self.rows.clear();
        self.id_manager = IdManager::new(self.config.id_type);
        count
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.metadata.add_relationship(relationship);
    }

    pub(crate) fn update_row(&mut self, id: &str, changes: Vec<(String, Value)>) {
        if let Some(row) = self.rows.get_mut(id) {
            for (column, value) in changes {
                row.insert(column, value);
            }
            let updated = row.clone();
            self.metadata.merge_row(&updated);
        }
    }

    pub(crate) fn remove(&mut self, id: &str) -> bool {
        self.rows.shift_remove(id).is_some()
    }
}

use std::{
    path::Path,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    memory::{
        eval::Eval,
        plan_executor::{Catalog, PlanExecutor, Record},
        MemoryTable, StoreConfig,
    },
    query::{MutationKind, MutationPlan},
    schema::{Relationship, SchemaProvider, TableMetadata},
    storage::{Row, Storage, StorageError},
    translator::{Statement, StatementPlan},
};

#[derive(Debug, Default)]
struct StoreState {
    config: StoreConfig,
    tables: Catalog,
    snapshot: Option<Catalog>,
}

/// In-memory tables evaluated directly from the plans statements carry.
///
/// Clones are handles onto the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose tables default to `config`.
    pub fn with_config(config: StoreConfig) -> Self {
        let state = StoreState { config, ..StoreState::default() };
        Self { inner: Arc::new(RwLock::new(state)) }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, StorageError> {
        self.inner.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, StorageError> {
        self.inner.write().map_err(|_| StorageError::LockPoisoned)
    }

    /// Creates (or replaces) a table using the store's default config.
    pub fn create_table(&self, name: &str) -> Result<(), StorageError> {
        let config = self.read()?.config.clone();
        self.create_table_with_config(name, config)
    }

    pub fn create_table_with_config(&self, name: &str, config: StoreConfig) -> Result<(), StorageError> {
        let key = name.to_lowercase();
        debug!(table = %key, id_type = ?config.id_type, "creating table");
        self.write()?.tables.insert(key.clone(), MemoryTable::new(&key, config));
        Ok(())
    }

    fn with_table<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut MemoryTable) -> Result<R, StorageError>,
    ) -> Result<R, StorageError> {
        let mut state = self.write()?;
        let table = state.tables.get_mut(&name.to_lowercase())
            .ok_or_else(|| StorageError::UnknownTable(name.to_string()))?;
        f(table)
    }

    /// Inserts one document and returns it with its id filled in.
    pub fn insert(&self, table: &str, item: Value) -> Result<Value, StorageError> {
        self.with_table(table, |t| t.insert(item))
    }

    pub fn insert_batch(&self, table: &str, items: Value) -> Result<Vec<Value>, StorageError> {
        self.with_table(table, |t| t.insert_batch(items))
    }

    /// Loads an array of documents; `keep` retains the rows already present.
    pub fn load_from_json(&self, table: &str, value: Value, keep: bool) -> Result<usize, StorageError> {
        self.with_table(table, |t| t.load_from_json(value, keep))
    }

    pub fn load_from_file(&self, table: &str, path: impl AsRef<Path>, keep: bool) -> Result<usize, StorageError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let value: Value = serde_json::from_str(&text)?;
        trace!(table, path = %path.as_ref().display(), "loading fixture file");
        self.load_from_json(table, value, keep)
    }

    /// Declares `owner.name` as a many-to-one link from `owner.column` to
    /// `target.target_column`.
    pub fn relate(
        &self,
        owner: &str,
        name: &str,
        column: &str,
        target: &str,
        target_column: &str,
    ) -> Result<(), StorageError> {
        let owner_key = owner.to_lowercase();
        let target_key = target.to_lowercase();
        let mut state = self.write()?;
        if !state.tables.contains_key(&target_key) {
            return Err(StorageError::UnknownTable(target.to_string()));
        }
        let table = state.tables.get_mut(&owner_key)
            .ok_or_else(|| StorageError::UnknownTable(owner.to_string()))?;
        debug!(owner = %owner_key, relation = name, target = %target_key, "declaring relationship");
        table.add_relationship(Relationship::new(name, &owner_key, column, &target_key, target_column));
        Ok(())
    }

    pub fn count(&self, table: &str) -> Result<usize, StorageError> {
        self.read()?.tables.get(&table.to_lowercase())
            .map(MemoryTable::len)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))
    }

    pub fn table_names(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.read()?.tables.keys().cloned().collect())
    }

    /// Raw documents of a table in insertion order.
    pub fn rows(&self, table: &str) -> Result<Vec<Value>, StorageError> {
        let state = self.read()?;
        let t = state.tables.get(&table.to_lowercase())
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;
        Ok(t.rows().map(|(_, doc)| Value::Object(doc.clone())).collect())
    }

    fn apply_mutation(catalog: &mut Catalog, plan: &MutationPlan) -> Result<u64, StorageError> {
        let key = plan.target.table.to_lowercase();
        let table = catalog.get(&key)
            .ok_or_else(|| StorageError::UnknownTable(plan.target.table.to_string()))?;

        let eval = Eval::new(catalog, None);
        let mut changes: Vec<(String, Vec<(String, Value)>)> = Vec::new();
        for (id, doc) in table.rows() {
            let record: Record = doc.iter()
                .map(|(k, v)| (format!("{}.{}", plan.target.alias, k), v.clone()))
                .collect();
            if let Some(p) = &plan.predicate {
                if !eval.predicate(p, &record)?.is_true() { continue; }
            }
            let assigned = match &plan.kind {
                MutationKind::Update(assignments) => {
                    let mut values = Vec::with_capacity(assignments.len());
                    for a in assignments {
                        values.push((a.column.clone(), eval.scalar(&a.value, &record)?));
                    }
                    values
                }
                MutationKind::Delete => Vec::new(),
            };
            changes.push((id.clone(), assigned));
        }

        let affected = changes.len() as u64;
        let Some(table) = catalog.get_mut(&key) else { return Ok(0) };
        for (id, assigned) in changes {
            match plan.kind {
                MutationKind::Update(_) => table.update_row(&id, assigned),
                MutationKind::Delete => { table.remove(&id); }
            }
        }
        Ok(affected)
    }
}

impl SchemaProvider for MemoryStore {
    fn table_metadata(&self, table: &str) -> Result<Option<TableMetadata>, StorageError> {
        Ok(self.read()?.tables.get(&table.to_lowercase()).map(|t| t.metadata().clone()))
    }
}

impl Storage for MemoryStore {
    fn execute(&self, statement: &Statement) -> Result<Vec<Row>, StorageError> {
        let state = self.read()?;
        let executor = PlanExecutor::new(&state.tables, None);
        match &statement.plan {
            StatementPlan::Select(plan) => executor.run_query(plan),
            StatementPlan::Count(plan) => {
                let total = executor.run_query(plan)?.len();
                Ok(vec![Row::from_iter([("count".to_string(), Value::from(total as u64))])])
            }
            StatementPlan::Mutation(_) => Err(StorageError::UnsupportedStatement),
        }
    }

    fn execute_mutation(&self, statement: &Statement) -> Result<u64, StorageError> {
        let StatementPlan::Mutation(plan) = &statement.plan else {
            return Err(StorageError::UnsupportedStatement);
        };
        let mut state = self.write()?;
        Self::apply_mutation(&mut state.tables, plan)
    }

    fn begin_unit_of_work(&self) -> Result<(), StorageError> {
        let mut state = self.write()?;
        if state.snapshot.is_some() {
            return Err(StorageError::UnitOfWorkInProgress);
        }
        state.snapshot = Some(state.tables.clone());
        debug!("unit of work started");
        Ok(())
    }

    fn commit(&self) -> Result<(), StorageError> {
        let mut state = self.write()?;
        state.snapshot.take().ok_or(StorageError::NoUnitOfWork)?;
        debug!("unit of work committed");
        Ok(())
    }

    fn rollback(&self) -> Result<(), StorageError> {
        let mut state = self.write()?;
        let snapshot = state.snapshot.take().ok_or(StorageError::NoUnitOfWork)?;
        state.tables = snapshot;
        debug!("unit of work rolled back");
        Ok(())
    }
}

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    query::{MutationPlan, ProjectionError, QueryPlan, TypedQuery},
    session::{ExecutionError, Page, QueryError, SessionConfig, UnitOfWork},
    storage::{Row, Storage, StorageError},
    translator::{PlanResolver, Statement, TranslationError, Translator},
};

/// Runs built queries against one storage handle.
///
/// Every entry point resolves the plan against the storage metadata, renders
/// it, hands the statement to storage and maps the returned rows.
#[derive(Debug)]
pub struct Session<S: Storage> {
    storage: S,
    config: SessionConfig,
    translator: Translator,
}

impl<S: Storage> Session<S> {
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, SessionConfig::default())
    }

    pub fn with_config(storage: S, config: SessionConfig) -> Self {
        Self { storage, translator: Translator::new(config.dialect), config }
    }

    pub fn storage(&self) -> &S { &self.storage }

    pub fn config(&self) -> &SessionConfig { &self.config }

    /// The select statement `query` would run, without running it.
    pub fn select_statement<T>(&self, query: &TypedQuery<T>) -> Result<Statement, QueryError> {
        Ok(self.translator.select(self.resolve(query.plan())?)?)
    }

    fn resolve(&self, plan: &QueryPlan) -> Result<Arc<QueryPlan>, TranslationError> {
        PlanResolver::new(&self.storage).resolve(plan)
    }

    fn log(&self, statement: &Statement) {
        if self.config.log_statements {
            debug!(kind = statement.kind(), params = statement.params.len(), sql = %statement.sql, "executing statement");
        }
    }

    fn run(&self, statement: &Statement) -> Result<Vec<Row>, ExecutionError> {
        self.log(statement);
        self.storage.execute(statement)
            .map_err(|source| ExecutionError::Storage { statement: statement.sql.clone(), source })
    }

    fn fetch_window<T>(&self, query: &TypedQuery<T>, plan: Arc<QueryPlan>) -> Result<Vec<T>, QueryError> {
        let statement = self.translator.select(self.resolve(&plan)?)?;
        let rows = self.run(&statement)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let item = query.projection().map_row(row, query.context())
                .map_err(|source| ExecutionError::Projection { statement: statement.sql.clone(), source })?;
            out.push(item);
        }
        Ok(out)
    }

    /// Every row, mapped; empty when nothing matches.
    pub fn fetch_list<T>(&mut self, query: &TypedQuery<T>) -> Result<Vec<T>, QueryError> {
        self.fetch_window(query, Arc::clone(query.plan()))
    }

    /// `None` for no row, the row for exactly one, `NonUniqueResult` otherwise.
    pub fn fetch_one<T>(&mut self, query: &TypedQuery<T>) -> Result<Option<T>, QueryError> {
        let mut rows = self.fetch_list(query)?;
        match rows.len() {
            0 | 1 => Ok(rows.pop()),
            n => Err(QueryError::NonUniqueResult { rows: n }),
        }
    }

    /// First row under the query's ordering, if any.
    pub fn fetch_first<T>(&mut self, query: &TypedQuery<T>) -> Result<Option<T>, QueryError> {
        let limit = query.plan().limit.map_or(1, |l| l.min(1));
        let plan = query.plan().with_window(query.plan().offset, Some(limit));
        Ok(self.fetch_window(query, plan)?.into_iter().next())
    }

    /// Rows `offset..offset + limit` plus the total the query matches.
    pub fn fetch_page<T>(&mut self, query: &TypedQuery<T>, offset: u64, limit: u64) -> Result<Page<T>, QueryError> {
        let items = self.fetch_window(query, query.plan().with_window(Some(offset), Some(limit)))?;
        let total = self.fetch_count(query)?;
        Ok(Page { items, total, offset, limit })
    }

    /// Number of rows the query matches, ignoring its order and window.
    pub fn fetch_count<T>(&mut self, query: &TypedQuery<T>) -> Result<u64, QueryError> {
        let plan = self.resolve(query.plan())?;
        let statement = self.translator.count(&plan)?;
        let rows = self.run(&statement)?;
        let value = rows.first().and_then(|r| r.get("count").or_else(|| r.first()));
        let count = match value {
            Some(v) => v.as_u64().ok_or_else(|| ProjectionError::TypeMismatch {
                label: "count".to_string(),
                expected: "unsigned integer",
                found: v.clone(),
            }),
            None => Err(ProjectionError::MissingColumn { label: "count".to_string() }),
        };
        count.map_err(|source| ExecutionError::Projection { statement: statement.sql.clone(), source }.into())
    }

    /// Runs a bulk update or delete and returns the affected row count.
    /// Values already fetched are not refreshed.
    pub fn execute_mutation(&mut self, plan: &MutationPlan) -> Result<u64, QueryError> {
        let resolved = PlanResolver::new(&self.storage).resolve_mutation(plan)?;
        let statement = self.translator.mutation(resolved)?;
        self.log(&statement);
        let affected = self.storage.execute_mutation(&statement)
            .map_err(|source| ExecutionError::Storage { statement: statement.sql.clone(), source })?;
        info!(table = %plan.target.table, affected, "mutation executed");
        Ok(affected)
    }

    fn boundary(&self, action: &str, result: Result<(), StorageError>) -> Result<(), QueryError> {
        result.map_err(|source| ExecutionError::Storage { statement: action.to_string(), source }.into())
    }

    /// Starts a unit of work. The guard rolls back unless committed.
    pub fn begin(&mut self) -> Result<UnitOfWork<'_, S>, QueryError> {
        self.boundary("BEGIN", self.storage.begin_unit_of_work())?;
        Ok(UnitOfWork::new(self))
    }

    pub(crate) fn commit_work(&mut self) -> Result<(), QueryError> {
        self.boundary("COMMIT", self.storage.commit())
    }

    pub(crate) fn rollback_work(&mut self) -> Result<(), QueryError> {
        self.boundary("ROLLBACK", self.storage.rollback())
    }

    /// Runs `work` in a unit of work: committed on `Ok`, rolled back on `Err`.
    pub fn unit_of_work<R, E, F>(&mut self, work: F) -> Result<R, E>
    where
        F: FnOnce(&mut Session<S>) -> Result<R, E>,
        E: From<QueryError>,
    {
        let mut uow = self.begin()?;
        let out = work(&mut *uow)?;
        uow.commit()?;
        Ok(out)
    }
}

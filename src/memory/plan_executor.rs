use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::{
    expr::ScalarExpr,
    memory::{
        aggregates::{accumulator_for, Accumulator},
        eval::Eval,
        helpers::Helpers,
        logical_plan::{AggregateCall, LogicalPlan},
        plan_builder::PlanBuilder,
        MemoryTable,
    },
    query::{JoinKind, QueryPlan},
    storage::{Row, StorageError},
};

/// Working row: `alias.column` (or output label) -> value.
pub type Record = IndexMap<String, Value>;

/// Tables of a store, keyed by lowercase name.
pub type Catalog = IndexMap<String, MemoryTable>;

type GroupEntry = (Vec<Value>, Vec<Box<dyn Accumulator>>, Vec<HashSet<String>>);

/// Runs logical plans against a catalog snapshot. `outer` is the row of the
/// enclosing query when this executor runs a correlated subquery.
pub struct PlanExecutor<'a> {
    catalog: &'a Catalog,
    outer: Option<&'a Record>,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(catalog: &'a Catalog, outer: Option<&'a Record>) -> Self {
        Self { catalog, outer }
    }

    fn eval(&self) -> Eval<'a> {
        Eval::new(self.catalog, self.outer)
    }

    pub fn run_query(&self, plan: &QueryPlan) -> Result<Vec<Row>, StorageError> {
        let logical = PlanBuilder::from_query(plan)?;
        trace!(?logical, "running logical plan");
        Ok(self.run_plan(&logical)?.into_iter().map(Row).collect())
    }

    pub fn run_plan(&self, plan: &LogicalPlan) -> Result<Vec<Record>, StorageError> {
        match plan {
            LogicalPlan::Scan { table, alias } => {
                let t = self.table(table)?;
                Ok(t.rows()
                    .map(|(_, doc)| doc.iter().map(|(k, v)| (format!("{}.{}", alias, k), v.clone())).collect())
                    .collect())
            }
            LogicalPlan::Join { left, right, kind, on } => {
                let left_rows = self.run_plan(left)?;
                let right_rows = self.run_plan(right)?;
                self.join(left_rows, right, right_rows, *kind, on.as_ref())
            }
            LogicalPlan::Filter { input, predicate } => {
                let eval = self.eval();
                let mut out = Vec::new();
                for row in self.run_plan(input)? {
                    if eval.predicate(predicate, &row)?.is_true() {
                        out.push(row);
                    }
                }
                Ok(out)
            }
            LogicalPlan::Aggregate { input, group_keys, group_outputs, aggs } => {
                let rows = self.run_plan(input)?;
                self.aggregate(rows, group_keys, group_outputs, aggs)
            }
            LogicalPlan::Sort { input, keys } => {
                let eval = self.eval();
                let mut keyed = Vec::new();
                for row in self.run_plan(input)? {
                    let mut values = Vec::with_capacity(keys.len());
                    for k in keys { values.push(eval.scalar(&k.expr, &row)?); }
                    keyed.push((values, row));
                }
                keyed.sort_by(|(a, _), (b, _)| {
                    for (i, k) in keys.iter().enumerate() {
                        let ord = Helpers::cmp_json_for_sort(&a[i], &b[i], k.is_ascending(), k.nulls.nulls_last());
                        if !ord.is_eq() { return ord; }
                    }
                    std::cmp::Ordering::Equal
                });
                Ok(keyed.into_iter().map(|(_, row)| row).collect())
            }
            LogicalPlan::Project { input, items } => {
                let eval = self.eval();
                let mut out = Vec::new();
                for row in self.run_plan(input)? {
                    let mut projected = Record::with_capacity(items.len());
                    for (expr, label) in items {
                        projected.insert(label.clone(), eval.scalar(expr, &row)?);
                    }
                    out.push(projected);
                }
                Ok(out)
            }
            LogicalPlan::Distinct { input } => {
                let mut seen = HashSet::new();
                Ok(self.run_plan(input)?
                    .into_iter()
                    .filter(|row| {
                        let values: Vec<Value> = row.values().cloned().collect();
                        seen.insert(Helpers::canonical_tuple(&values))
                    })
                    .collect())
            }
            LogicalPlan::Limit { input, limit, offset } => {
                let rows = self.run_plan(input)?;
                let skip = offset.map_or(0, |o| usize::try_from(o).unwrap_or(usize::MAX));
                let take = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
                Ok(rows.into_iter().skip(skip).take(take).collect())
            }
        }
    }

    fn table(&self, name: &str) -> Result<&'a MemoryTable, StorageError> {
        self.catalog.get(&name.to_lowercase())
            .ok_or_else(|| StorageError::UnknownTable(name.to_string()))
    }

    fn join(
        &self,
        left_rows: Vec<Record>,
        right: &LogicalPlan,
        right_rows: Vec<Record>,
        kind: JoinKind,
        on: Option<&crate::predicate::Predicate>,
    ) -> Result<Vec<Record>, StorageError> {
        let eval = self.eval();
        let right_keys = self.keyset_for_side(right, &right_rows);
        let mut out = Vec::new();
        for l in &left_rows {
            let mut matched = false;
            for r in &right_rows {
                let mut merged = l.clone();
                merged.extend(r.iter().map(|(k, v)| (k.clone(), v.clone())));
                let keep = match (kind, on) {
                    (JoinKind::Cross, _) | (_, None) => true,
                    (_, Some(p)) => eval.predicate(p, &merged)?.is_true(),
                };
                if keep {
                    matched = true;
                    out.push(merged);
                }
            }
            if kind == JoinKind::Left && !matched {
                let mut extended = l.clone();
                extended.extend(right_keys.iter().map(|k| (k.clone(), Value::Null)));
                out.push(extended);
            }
        }
        Ok(out)
    }

    /// Columns a null-extended right side carries: the table's known columns
    /// for a scan, otherwise whatever the rows showed.
    fn keyset_for_side(&self, side: &LogicalPlan, rows: &[Record]) -> BTreeSet<String> {
        if let LogicalPlan::Scan { table, alias } = side {
            if let Ok(t) = self.table(table) {
                return t.metadata().column_names().map(|c| format!("{}.{}", alias, c)).collect();
            }
        }
        rows.iter().flat_map(|r| r.keys().cloned()).collect()
    }

    fn aggregate(
        &self,
        rows: Vec<Record>,
        group_keys: &[ScalarExpr],
        group_outputs: &[String],
        calls: &[AggregateCall],
    ) -> Result<Vec<Record>, StorageError> {
        let eval = self.eval();
        let mut groups: IndexMap<String, GroupEntry> = IndexMap::new();
        let fresh = |keys: Vec<Value>| -> GroupEntry {
            (
                keys,
                calls.iter().map(|c| accumulator_for(c.func)).collect(),
                calls.iter().map(|_| HashSet::new()).collect(),
            )
        };

        for row in rows {
            let mut keys = Vec::with_capacity(group_keys.len());
            for k in group_keys { keys.push(eval.scalar(k, &row)?); }
            let mut args = Vec::with_capacity(calls.len());
            for c in calls {
                args.push(match &c.arg {
                    None => Vec::new(),
                    Some(e) => vec![eval.scalar(e, &row)?],
                });
            }

            let (_, accs, seen) = groups
                .entry(Helpers::canonical_tuple(&keys))
                .or_insert_with(|| fresh(keys));
            for (i, call) in calls.iter().enumerate() {
                if call.distinct && !seen[i].insert(Helpers::canonical_tuple(&args[i])) {
                    continue;
                }
                accs[i].update(&args[i])?;
            }
        }

        if groups.is_empty() && group_keys.is_empty() {
            groups.insert(String::new(), fresh(Vec::new()));
        }

        let mut out = Vec::with_capacity(groups.len());
        for (_, (keys, accs, _)) in groups {
            let mut record = Record::new();
            for (i, value) in keys.into_iter().enumerate() {
                if let Some(c) = group_keys[i].as_column() {
                    record.insert(c.key(), value.clone());
                }
                record.insert(group_outputs[i].clone(), value);
            }
            for (call, acc) in calls.iter().zip(accs.iter()) {
                record.insert(call.output.clone(), acc.finalize());
            }
            out.push(record);
        }
        Ok(out)
    }
}

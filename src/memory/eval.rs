use regex::Regex;
use serde_json::Value;

use crate::{
    expr::{ArithmeticOp, ComparatorOp, ScalarExpr, ScalarFunction, Truth},
    memory::{
        helpers::Helpers,
        plan_executor::{Catalog, PlanExecutor, Record},
    },
    predicate::Predicate,
    query::QueryPlan,
    storage::{Row, StorageError},
};

/// Row-level evaluation of expressions and predicates.
///
/// Column lookups try the current row first, then the enclosing query's row
/// (`outer`), which is how correlated subqueries see outer columns.
pub struct Eval<'a> {
    catalog: &'a Catalog,
    outer: Option<&'a Record>,
}

impl<'a> Eval<'a> {
    pub fn new(catalog: &'a Catalog, outer: Option<&'a Record>) -> Self {
        Self { catalog, outer }
    }

    fn lookup(&self, key: &str, row: &Record) -> Value {
        row.get(key)
            .or_else(|| self.outer.and_then(|o| o.get(key)))
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn scalar(&self, expr: &ScalarExpr, row: &Record) -> Result<Value, StorageError> {
        match expr {
            ScalarExpr::Column(c) => Ok(self.lookup(&c.key(), row)),
            ScalarExpr::Literal(l) => Ok(l.to_json()),
            ScalarExpr::Binary { op, left, right } => {
                let l = self.scalar(left, row)?;
                let r = self.scalar(right, row)?;
                Self::arithmetic(*op, &l, &r)
            }
            ScalarExpr::Function { func, args } => {
                let mut values = Vec::with_capacity(args.len());
                for a in args { values.push(self.scalar(a, row)?); }
                Self::function(func, &values)
            }
            ScalarExpr::Aggregate { func, .. } =>
                Err(StorageError::Evaluation(format!("{} outside of an aggregation", func))),
            ScalarExpr::Subquery(plan) => {
                let rows = self.subquery(plan, row)?;
                match rows.as_slice() {
                    [] => Ok(Value::Null),
                    [only] => Ok(only.first().cloned().unwrap_or(Value::Null)),
                    many => Err(StorageError::SubqueryCardinality { rows: many.len() }),
                }
            }
            ScalarExpr::Case(case) => {
                for branch in &case.branches {
                    if self.predicate(&branch.when, row)?.is_true() {
                        return self.scalar(&branch.then, row);
                    }
                }
                self.scalar(&case.otherwise, row)
            }
        }
    }

    pub fn predicate(&self, predicate: &Predicate, row: &Record) -> Result<Truth, StorageError> {
        Ok(match predicate {
            Predicate::And(list) => {
                let mut acc = Truth::True;
                for p in list {
                    acc = acc.and(self.predicate(p, row)?);
                    if acc == Truth::False { break; }
                }
                acc
            }
            Predicate::Or(list) => {
                let mut acc = Truth::False;
                for p in list {
                    acc = acc.or(self.predicate(p, row)?);
                    if acc == Truth::True { break; }
                }
                acc
            }
            Predicate::Not(inner) => self.predicate(inner, row)?.not(),
            Predicate::Compare { left, op, right } => {
                let l = self.scalar(left, row)?;
                let r = self.scalar(right, row)?;
                Self::compare(&l, *op, &r)
            }
            Predicate::Between { expr, low, high } => {
                let v = self.scalar(expr, row)?;
                let lo = self.scalar(low, row)?;
                let hi = self.scalar(high, row)?;
                Self::compare(&v, ComparatorOp::GtEq, &lo).and(Self::compare(&v, ComparatorOp::LtEq, &hi))
            }
            Predicate::InList { expr, list, negated } => {
                let v = self.scalar(expr, row)?;
                let mut candidates = Vec::with_capacity(list.len());
                for e in list { candidates.push(self.scalar(e, row)?); }
                let t = Self::membership(&v, &candidates);
                if *negated { t.not() } else { t }
            }
            Predicate::InSubquery { expr, plan, negated } => {
                let v = self.scalar(expr, row)?;
                let candidates: Vec<Value> = self.subquery(plan, row)?
                    .iter()
                    .map(|r| r.first().cloned().unwrap_or(Value::Null))
                    .collect();
                let t = Self::membership(&v, &candidates);
                if *negated { t.not() } else { t }
            }
            Predicate::Like { expr, pattern, escape, negated } => {
                let t = match (self.scalar(expr, row)?, self.scalar(pattern, row)?) {
                    (Value::String(s), Value::String(p)) => Truth::from_bool(Self::like_regex(&p, *escape)?.is_match(&s)),
                    _ => Truth::Unknown,
                };
                if *negated { t.not() } else { t }
            }
            Predicate::IsNull { expr, negated } => {
                let t = Truth::from_bool(self.scalar(expr, row)?.is_null());
                if *negated { t.not() } else { t }
            }
            Predicate::Const(b) => Truth::from_bool(*b),
        })
    }

    fn subquery(&self, plan: &QueryPlan, row: &Record) -> Result<Vec<Row>, StorageError> {
        let mut scope = self.outer.cloned().unwrap_or_default();
        scope.extend(row.iter().map(|(k, v)| (k.clone(), v.clone())));
        PlanExecutor::new(self.catalog, Some(&scope)).run_query(plan)
    }

    fn membership(v: &Value, candidates: &[Value]) -> Truth {
        if candidates.is_empty() { return Truth::False; }
        if v.is_null() { return Truth::Unknown; }
        let mut has_null = false;
        for c in candidates {
            if c.is_null() { has_null = true; continue; }
            if Self::compare(v, ComparatorOp::Eq, c).is_true() { return Truth::True; }
        }
        if has_null { Truth::Unknown } else { Truth::False }
    }

    pub fn compare(l: &Value, op: ComparatorOp, r: &Value) -> Truth {
        if l.is_null() || r.is_null() { return Truth::Unknown; }
        let Some(ord) = Helpers::compare_values(l, r) else { return Truth::Unknown };
        Truth::from_bool(match op {
            ComparatorOp::Eq => ord.is_eq(),
            ComparatorOp::NotEq => ord.is_ne(),
            ComparatorOp::Lt => ord.is_lt(),
            ComparatorOp::LtEq => ord.is_le(),
            ComparatorOp::Gt => ord.is_gt(),
            ComparatorOp::GtEq => ord.is_ge(),
        })
    }

    /// SQL LIKE as an anchored regex: `%` any run, `_` one char, and the
    /// escape char makes the next char literal.
    pub fn like_regex(pattern: &str, escape: Option<char>) -> Result<Regex, StorageError> {
        let mut re = String::from("(?s)^");
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            if Some(c) == escape {
                let literal = chars.next()
                    .ok_or_else(|| StorageError::Evaluation(format!("LIKE pattern '{}' ends with its escape", pattern)))?;
                re.push_str(&regex::escape(&literal.to_string()));
                continue;
            }
            match c {
                '%' => re.push_str(".*"),
                '_' => re.push('.'),
                other => re.push_str(&regex::escape(&other.to_string())),
            }
        }
        re.push('$');
        Regex::new(&re).map_err(|e| StorageError::Evaluation(e.to_string()))
    }

    fn arithmetic(op: ArithmeticOp, l: &Value, r: &Value) -> Result<Value, StorageError> {
        if l.is_null() || r.is_null() {
            return Ok(Value::Null);
        }
        if op == ArithmeticOp::Concat {
            let joined = Helpers::to_text(l).unwrap_or_default() + &Helpers::to_text(r).unwrap_or_default();
            return Ok(Value::String(joined));
        }
        if let (Some(a), Some(b)) = (l.as_i64(), r.as_i64()) {
            if op == ArithmeticOp::Div && b == 0 {
                return Err(StorageError::Evaluation("division by zero".into()));
            }
            let out = match op {
                ArithmeticOp::Add => a.checked_add(b),
                ArithmeticOp::Sub => a.checked_sub(b),
                ArithmeticOp::Mul => a.checked_mul(b),
                _ => a.checked_div(b),
            };
            return out.map(Value::from).ok_or_else(|| StorageError::Evaluation("integer overflow".into()));
        }
        let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
            return Err(StorageError::Evaluation(format!("cannot apply {} to {} and {}", op.symbol(), l, r)));
        };
        let out = match op {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Sub => a - b,
            ArithmeticOp::Mul => a * b,
            _ => a / b,
        };
        Ok(serde_json::Number::from_f64(out).map(Value::Number).unwrap_or(Value::Null))
    }

    fn function(func: &ScalarFunction, args: &[Value]) -> Result<Value, StorageError> {
        let text = |f: fn(&str) -> String| match args {
            [Value::String(s)] => Ok(Value::String(f(s))),
            [Value::Null] => Ok(Value::Null),
            _ => Err(StorageError::Evaluation(format!("{} expects one text argument", func.name()))),
        };
        match func {
            ScalarFunction::Upper => text(str::to_uppercase),
            ScalarFunction::Lower => text(str::to_lowercase),
            ScalarFunction::Trim => text(|s| s.trim().to_string()),
            ScalarFunction::Length => match args {
                [Value::String(s)] => Ok(Value::from(s.chars().count() as i64)),
                [Value::Null] => Ok(Value::Null),
                _ => Err(StorageError::Evaluation("length expects one text argument".into())),
            },
            ScalarFunction::StringValue => match args {
                [v] => Ok(Helpers::to_text(v).map(Value::String).unwrap_or(Value::Null)),
                _ => Err(StorageError::Evaluation("string_value expects one argument".into())),
            },
            ScalarFunction::Named(name) => Self::named_function(name, args),
        }
    }

    fn named_function(name: &str, args: &[Value]) -> Result<Value, StorageError> {
        match (name, args) {
            ("coalesce", _) => Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null)),
            (_, a) if a.iter().any(Value::is_null) => Ok(Value::Null),
            ("replace", [Value::String(s), Value::String(from), Value::String(to)]) =>
                Ok(Value::String(s.replace(from.as_str(), to))),
            ("abs", [Value::Number(n)]) => match n.as_i64() {
                Some(i) => i.checked_abs().map(Value::from)
                    .ok_or_else(|| StorageError::Evaluation("integer overflow".into())),
                None => Ok(n.as_f64().and_then(|f| serde_json::Number::from_f64(f.abs())).map(Value::Number).unwrap_or(Value::Null)),
            },
            ("substring", [Value::String(s), Value::Number(start), rest @ ..]) if rest.len() <= 1 => {
                let start = start.as_i64().unwrap_or(1);
                let end = match rest {
                    [Value::Number(len)] => Some(start.saturating_add(len.as_i64().unwrap_or(0))),
                    _ => None,
                };
                let from = start.max(1);
                let taken: String = s.chars()
                    .enumerate()
                    .filter(|(i, _)| {
                        let pos = *i as i64 + 1;
                        pos >= from && end.is_none_or(|e| pos < e)
                    })
                    .map(|(_, c)| c)
                    .collect();
                Ok(Value::String(taken))
            }
            _ => Err(StorageError::Evaluation(format!("unsupported call {}({} args)", name, args.len()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ColumnRef;
    use serde_json::json;
    use std::sync::Arc;

    fn row(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn col(source: &str, name: &str) -> ScalarExpr {
        ScalarExpr::Column(ColumnRef::new(source, name))
    }

    #[test]
    fn comparisons_follow_three_valued_logic() {
        assert_eq!(Eval::compare(&json!(2), ComparatorOp::Gt, &json!(1.5)), Truth::True);
        assert_eq!(Eval::compare(&json!("a"), ComparatorOp::Lt, &json!("b")), Truth::True);
        assert_eq!(Eval::compare(&Value::Null, ComparatorOp::Eq, &json!(1)), Truth::Unknown);
        assert_eq!(Eval::compare(&json!("a"), ComparatorOp::Eq, &json!(1)), Truth::Unknown);
    }

    #[test]
    fn like_honours_escape_char() {
        assert!(Eval::like_regex("50!%%", Some('!')).unwrap().is_match("50% off"));
        assert!(!Eval::like_regex("50!%%", Some('!')).unwrap().is_match("500 off"));
        assert!(Eval::like_regex("a_c", None).unwrap().is_match("abc"));
        assert!(!Eval::like_regex("a.c", None).unwrap().is_match("abc"));
        assert!(Eval::like_regex("x!", Some('!')).is_err());
    }

    #[test]
    fn not_in_with_null_candidate_is_unknown() {
        let catalog = Catalog::new();
        let eval = Eval::new(&catalog, None);
        let p = Predicate::InList {
            expr: ScalarExpr::literal(3),
            list: vec![ScalarExpr::literal(1), ScalarExpr::Literal(crate::expr::Literal::Null)],
            negated: true,
        };
        assert_eq!(eval.predicate(&p, &Record::new()).unwrap(), Truth::Unknown);
    }

    #[test]
    fn outer_row_is_visible_to_lookups() {
        let catalog = Catalog::new();
        let outer = row(&[("m.age", json!(40))]);
        let eval = Eval::new(&catalog, Some(&outer));
        let inner = row(&[("s.age", json!(10))]);
        assert_eq!(eval.scalar(&col("m", "age"), &inner).unwrap(), json!(40));
        assert_eq!(eval.scalar(&col("s", "age"), &inner).unwrap(), json!(10));
    }

    #[test]
    fn arithmetic_keeps_integers_and_propagates_null() {
        let catalog = Catalog::new();
        let eval = Eval::new(&catalog, None);
        let r = row(&[("m.age", json!(20)), ("m.name", Value::Null)]);
        let plus = ScalarExpr::binary(ArithmeticOp::Add, col("m", "age"), ScalarExpr::literal(1));
        assert_eq!(eval.scalar(&plus, &r).unwrap(), json!(21));
        let concat = ScalarExpr::binary(ArithmeticOp::Concat, col("m", "name"), ScalarExpr::literal("x"));
        assert_eq!(eval.scalar(&concat, &r).unwrap(), Value::Null);
        let div = ScalarExpr::binary(ArithmeticOp::Div, col("m", "age"), ScalarExpr::literal(0));
        assert!(eval.scalar(&div, &r).is_err());
    }

    #[test]
    fn named_functions_evaluate() {
        let call = |name: &str, args: Vec<Value>| Eval::function(&ScalarFunction::Named(Arc::from(name)), &args).unwrap();
        assert_eq!(call("replace", vec![json!("member1"), json!("member"), json!("m")]), json!("m1"));
        assert_eq!(call("coalesce", vec![Value::Null, json!(3)]), json!(3));
        assert_eq!(call("abs", vec![json!(-4)]), json!(4));
        assert_eq!(call("substring", vec![json!("hello"), json!(2), json!(3)]), json!("ell"));
        assert_eq!(call("substring", vec![json!("hello"), json!(3)]), json!("llo"));
    }
}

use std::sync::Arc;

use crate::{
    expr::{ArithmeticOp, ColumnRef, Literal, ScalarExpr, ScalarFunction},
    predicate::Predicate,
    query::{Direction, JoinKind, MutationKind, MutationPlan, OrderSpec, QueryPlan, SelectItem},
    schema::Source,
    translator::{SqlDialect, Statement, StatementPlan, TranslationError},
};

type Result<T> = std::result::Result<T, TranslationError>;

/// Renders resolved plans into SQL for one dialect.
///
/// Every literal, LIKE pattern and row-window bound becomes a parameter; the
/// text only ever contains identifiers, keywords and placeholders. Output is
/// deterministic: the same plan always renders the same statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    dialect: SqlDialect,
}

impl Translator {
    pub fn new(dialect: SqlDialect) -> Self { Self { dialect } }

    pub fn dialect(&self) -> SqlDialect { self.dialect }

    pub fn select(&self, plan: Arc<QueryPlan>) -> Result<Statement> {
        let mut w = SqlWriter::new(self.dialect);
        w.query(&plan)?;
        Ok(w.finish(StatementPlan::Select(plan)))
    }

    /// `SELECT COUNT(*)` over the plan's rows, ignoring ORDER BY and window.
    /// DISTINCT and grouped plans are counted through a derived table.
    pub fn count(&self, plan: &QueryPlan) -> Result<Statement> {
        let plan = Arc::new(QueryPlan { order_by: Vec::new(), offset: None, limit: None, ..plan.clone() });
        let mut w = SqlWriter::new(self.dialect);
        w.push("SELECT COUNT(*) AS ");
        w.ident("count");
        if plan.distinct || plan.is_grouped() {
            w.push(" FROM (");
            w.query(&plan)?;
            w.push(") ");
            w.ident("_q");
        } else {
            w.from_clause(&plan)?;
            w.where_clause(plan.predicate.as_ref())?;
        }
        Ok(w.finish(StatementPlan::Count(plan)))
    }

    pub fn mutation(&self, plan: Arc<MutationPlan>) -> Result<Statement> {
        let mut w = SqlWriter::new(self.dialect);
        w.target = Some(Arc::clone(&plan.target.alias));
        match &plan.kind {
            MutationKind::Update(assignments) => {
                w.push("UPDATE ");
                w.ident(&plan.target.table);
                w.push(" SET ");
                for (i, a) in assignments.iter().enumerate() {
                    if i > 0 { w.push(", "); }
                    w.ident(&a.column);
                    w.push(" = ");
                    w.expr(&a.value)?;
                }
            }
            MutationKind::Delete => {
                w.push("DELETE FROM ");
                w.ident(&plan.target.table);
            }
        }
        w.where_clause(plan.predicate.as_ref())?;
        Ok(w.finish(StatementPlan::Mutation(plan)))
    }
}

struct SqlWriter {
    dialect: SqlDialect,
    sql: String,
    params: Vec<Literal>,
    /// Mutation target alias; its columns are written unqualified.
    target: Option<Arc<str>>,
}

impl SqlWriter {
    fn new(dialect: SqlDialect) -> Self {
        Self { dialect, sql: String::new(), params: Vec::new(), target: None }
    }

    fn finish(self, plan: StatementPlan) -> Statement {
        Statement { sql: self.sql, params: self.params, plan }
    }

    fn push(&mut self, s: &str) { self.sql.push_str(s); }

    fn ident(&mut self, s: &str) {
        let quoted = self.dialect.quote(s);
        self.sql.push_str(&quoted);
    }

    fn placeholder(&mut self, lit: Literal) -> String {
        self.params.push(lit);
        self.dialect.placeholder(self.params.len())
    }

    fn bind(&mut self, lit: Literal) {
        let ph = self.placeholder(lit);
        self.sql.push_str(&ph);
    }

    /// Runs `f` against an empty buffer and returns what it wrote. Parameters
    /// stay bound in order, so the captured text must be emitted in place.
    fn capture(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<String> {
        let saved = std::mem::take(&mut self.sql);
        let result = f(self);
        let out = std::mem::replace(&mut self.sql, saved);
        result.map(|_| out)
    }

    fn column(&mut self, c: &ColumnRef) {
        let bare = self.target.as_ref().is_some_and(|alias| *alias == c.source);
        if c.is_qualified() && !bare {
            self.ident(&c.source);
            self.push(".");
        }
        self.ident(&c.name);
    }

    fn source(&mut self, s: &Source) {
        self.ident(&s.table);
        self.push(" ");
        self.ident(&s.alias);
    }

    fn query(&mut self, plan: &QueryPlan) -> Result<()> {
        self.push("SELECT ");
        if plan.distinct { self.push("DISTINCT "); }
        if plan.projection.is_empty() {
            self.push("*");
        }
        for (i, item) in plan.projection.iter().enumerate() {
            if i > 0 { self.push(", "); }
            match item {
                SelectItem::Expr { expr, .. } => {
                    self.expr(expr)?;
                    self.push(" AS ");
                    self.ident(&item.label(i));
                }
                SelectItem::AllColumns { source } => {
                    self.ident(&source.alias);
                    self.push(".*");
                }
            }
        }
        self.from_clause(plan)?;
        self.where_clause(plan.predicate.as_ref())?;
        if !plan.group_by.is_empty() {
            self.push(" GROUP BY ");
            for (i, e) in plan.group_by.iter().enumerate() {
                if i > 0 { self.push(", "); }
                self.expr(e)?;
            }
        }
        if let Some(having) = &plan.having {
            self.push(" HAVING ");
            self.predicate(having)?;
        }
        if !plan.order_by.is_empty() {
            self.push(" ORDER BY ");
            for (i, o) in plan.order_by.iter().enumerate() {
                if i > 0 { self.push(", "); }
                self.order_key(o)?;
            }
        }
        self.window(plan.limit, plan.offset);
        Ok(())
    }

    fn from_clause(&mut self, plan: &QueryPlan) -> Result<()> {
        self.push(" FROM ");
        for (i, s) in plan.from.iter().enumerate() {
            if i > 0 { self.push(", "); }
            self.source(s);
        }
        for join in &plan.joins {
            self.push(match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
                JoinKind::Cross => " CROSS JOIN ",
            });
            self.source(&join.target);
            if join.kind == JoinKind::Cross { continue; }
            self.push(" ON ");
            match &join.on {
                Some(on) => self.predicate(on)?,
                None => self.push("1 = 1"),
            }
        }
        Ok(())
    }

    fn where_clause(&mut self, predicate: Option<&Predicate>) -> Result<()> {
        if let Some(p) = predicate {
            self.push(" WHERE ");
            self.predicate(p)?;
        }
        Ok(())
    }

    fn window(&mut self, limit: Option<u64>, offset: Option<u64>) {
        let bound = |v: u64| Literal::Int(i64::try_from(v).unwrap_or(i64::MAX));
        let (limit, offset) = if self.dialect.offset_first() {
            let o = offset.map(|o| self.placeholder(bound(o)));
            let l = limit.map(|l| self.placeholder(bound(l)));
            (l, o)
        } else {
            let l = limit.map(|l| self.placeholder(bound(l)));
            let o = offset.map(|o| self.placeholder(bound(o)));
            (l, o)
        };
        let clause = self.dialect.window(limit.as_deref(), offset.as_deref());
        self.push(&clause);
    }

    fn order_key(&mut self, o: &OrderSpec) -> Result<()> {
        // Nulls sort first unless asked otherwise, on every dialect.
        if !self.dialect.supports_null_ordering() {
            let (null_rank, value_rank) = if o.nulls.nulls_last() { ("1", "0") } else { ("0", "1") };
            self.push("CASE WHEN ");
            self.expr(&o.expr)?;
            self.push(&format!(" IS NULL THEN {} ELSE {} END, ", null_rank, value_rank));
        }
        self.expr(&o.expr)?;
        self.push(match o.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
        if self.dialect.supports_null_ordering() {
            self.push(if o.nulls.nulls_last() { " NULLS LAST" } else { " NULLS FIRST" });
        }
        Ok(())
    }

    fn expr(&mut self, e: &ScalarExpr) -> Result<()> {
        match e {
            ScalarExpr::Column(c) => self.column(c),
            ScalarExpr::Literal(lit) => self.bind(lit.clone()),
            ScalarExpr::Binary { op: ArithmeticOp::Concat, left, right } => {
                let l = self.capture(|w| w.expr(left))?;
                let r = self.capture(|w| w.expr(right))?;
                let out = self.dialect.concat(&l, &r);
                self.push(&out);
            }
            ScalarExpr::Binary { op, left, right } => {
                self.push("(");
                self.expr(left)?;
                self.push(&format!(" {} ", op.symbol()));
                self.expr(right)?;
                self.push(")");
            }
            ScalarExpr::Function { func, args } => self.function(func, args)?,
            ScalarExpr::Aggregate { func, arg, distinct } => {
                self.push(&func.to_string());
                self.push("(");
                if *distinct { self.push("DISTINCT "); }
                match arg {
                    Some(a) => self.expr(a)?,
                    None => self.push("*"),
                }
                self.push(")");
            }
            ScalarExpr::Subquery(plan) => {
                self.push("(");
                self.query(plan)?;
                self.push(")");
            }
            ScalarExpr::Case(case) => {
                self.push("CASE");
                for branch in &case.branches {
                    self.push(" WHEN ");
                    self.predicate(&branch.when)?;
                    self.push(" THEN ");
                    self.expr(&branch.then)?;
                }
                self.push(" ELSE ");
                self.expr(&case.otherwise)?;
                self.push(" END");
            }
        }
        Ok(())
    }

    fn function(&mut self, func: &ScalarFunction, args: &[Arc<ScalarExpr>]) -> Result<()> {
        let name = match func {
            ScalarFunction::Upper => "UPPER",
            ScalarFunction::Lower => "LOWER",
            ScalarFunction::Trim => "TRIM",
            ScalarFunction::Length => self.dialect.length_function(),
            ScalarFunction::StringValue => {
                let inner = self.capture(|w| w.args(args))?;
                let out = self.dialect.cast_to_text(&inner);
                self.push(&out);
                return Ok(());
            }
            ScalarFunction::Named(name) => {
                let spec = self.dialect.function(name)
                    .ok_or_else(|| TranslationError::UnknownFunction(name.to_string()))?;
                if !spec.accepts(args.len()) {
                    return Err(TranslationError::FunctionArity {
                        name: name.to_string(),
                        expected: spec.arity(),
                        found: args.len(),
                    });
                }
                spec.sql_name
            }
        };
        self.push(name);
        self.push("(");
        self.args(args)?;
        self.push(")");
        Ok(())
    }

    fn args(&mut self, args: &[Arc<ScalarExpr>]) -> Result<()> {
        for (i, a) in args.iter().enumerate() {
            if i > 0 { self.push(", "); }
            self.expr(a)?;
        }
        Ok(())
    }

    fn predicate(&mut self, p: &Predicate) -> Result<()> {
        match p {
            Predicate::And(list) if list.is_empty() => self.push("1 = 1"),
            Predicate::Or(list) if list.is_empty() => self.push("1 = 0"),
            Predicate::And(list) => {
                for (i, part) in list.iter().enumerate() {
                    if i > 0 { self.push(" AND "); }
                    if matches!(part, Predicate::Or(l) if l.len() > 1) {
                        self.push("(");
                        self.predicate(part)?;
                        self.push(")");
                    } else {
                        self.predicate(part)?;
                    }
                }
            }
            Predicate::Or(list) => {
                for (i, part) in list.iter().enumerate() {
                    if i > 0 { self.push(" OR "); }
                    self.predicate(part)?;
                }
            }
            Predicate::Not(inner) => {
                self.push("NOT (");
                self.predicate(inner)?;
                self.push(")");
            }
            Predicate::Compare { left, op, right } => {
                self.expr(left)?;
                self.push(&format!(" {} ", op));
                self.expr(right)?;
            }
            Predicate::Between { expr, low, high } => {
                self.expr(expr)?;
                self.push(" BETWEEN ");
                self.expr(low)?;
                self.push(" AND ");
                self.expr(high)?;
            }
            Predicate::InList { list, negated, .. } if list.is_empty() => {
                self.push(if *negated { "1 = 1" } else { "1 = 0" });
            }
            Predicate::InList { expr, list, negated } => {
                self.expr(expr)?;
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, e) in list.iter().enumerate() {
                    if i > 0 { self.push(", "); }
                    self.expr(e)?;
                }
                self.push(")");
            }
            Predicate::InSubquery { expr, plan, negated } => {
                self.expr(expr)?;
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                self.query(plan)?;
                self.push(")");
            }
            Predicate::Like { expr, pattern, escape, negated } => {
                self.expr(expr)?;
                self.push(if *negated { " NOT LIKE " } else { " LIKE " });
                self.expr(pattern)?;
                if let Some(c) = escape {
                    let quoted = if *c == '\'' { "''".to_string() } else { c.to_string() };
                    self.push(&format!(" ESCAPE '{}'", quoted));
                }
            }
            Predicate::IsNull { expr, negated } => {
                self.expr(expr)?;
                self.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Predicate::Const(true) => self.push("1 = 1"),
            Predicate::Const(false) => self.push("1 = 0"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expr::{function, CaseBuilder}, query::{Projection, Query}};

    fn member() -> Source { Source::new("member", "m") }

    #[test]
    fn select_binds_every_value() {
        let m = member();
        let username = m.column::<String>("username");
        let age = m.column::<i64>("age");
        let q = Query::select(&username)
            .from(&m)
            .filter(age.gt(18).and(username.starts_with("mem")))
            .order_by(age.desc().nulls_last())
            .offset(1)
            .limit(2)
            .build()
            .unwrap();
        let st = Translator::new(SqlDialect::Postgres).select(Arc::clone(q.plan())).unwrap();
        assert_eq!(
            st.sql,
            "SELECT \"m\".\"username\" AS \"m.username\" FROM \"member\" \"m\" \
             WHERE \"m\".\"age\" > $1 AND \"m\".\"username\" LIKE $2 ESCAPE '!' \
             ORDER BY \"m\".\"age\" DESC NULLS LAST LIMIT $3 OFFSET $4"
        );
        assert_eq!(st.params, vec![Literal::Int(18), Literal::from("mem%"), Literal::Int(2), Literal::Int(1)]);
    }

    #[test]
    fn mysql_emulates_nulls_last() {
        let m = member();
        let age = m.column::<i64>("age");
        let q = Query::select(&age).from(&m).order_by(age.desc().nulls_last()).build().unwrap();
        let st = Translator::new(SqlDialect::MySql).select(Arc::clone(q.plan())).unwrap();
        assert_eq!(
            st.sql,
            "SELECT `m`.`age` AS `m.age` FROM `member` `m` \
             ORDER BY CASE WHEN `m`.`age` IS NULL THEN 1 ELSE 0 END, `m`.`age` DESC"
        );
    }

    #[test]
    fn default_null_ordering_puts_nulls_first() {
        let m = member();
        let age = m.column::<i64>("age");
        let q = Query::select(&age).from(&m).order_by(age.asc()).build().unwrap();

        let pg = Translator::new(SqlDialect::Postgres).select(Arc::clone(q.plan())).unwrap();
        assert!(pg.sql.ends_with("ORDER BY \"m\".\"age\" ASC NULLS FIRST"));

        let my = Translator::new(SqlDialect::MySql).select(Arc::clone(q.plan())).unwrap();
        assert!(my.sql.ends_with("ORDER BY CASE WHEN `m`.`age` IS NULL THEN 0 ELSE 1 END, `m`.`age` ASC"));
    }

    #[test]
    fn ansi_window_binds_offset_first() {
        let m = member();
        let age = m.column::<i64>("age");
        let q = Query::select(&age).from(&m).offset(10).limit(5).build().unwrap();
        let st = Translator::default().select(Arc::clone(q.plan())).unwrap();
        assert!(st.sql.ends_with(" OFFSET ? ROWS FETCH NEXT ? ROWS ONLY"));
        assert_eq!(st.params, vec![Literal::Int(10), Literal::Int(5)]);
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let m = member();
        let age = m.column::<i64>("age");
        let q = Query::select(&age).from(&m).filter(age.in_list(Vec::<i64>::new())).build().unwrap();
        let st = Translator::default().select(Arc::clone(q.plan())).unwrap();
        assert!(st.sql.ends_with(" WHERE 1 = 0"));
        assert!(st.params.is_empty());
    }

    #[test]
    fn grouped_count_uses_derived_table() {
        let m = member();
        let team = m.column::<i64>("team_id");
        let q = Query::select(&team.count()).from(&m).group_by(&team).build().unwrap();
        let st = Translator::default().count(q.plan()).unwrap();
        assert_eq!(
            st.sql,
            "SELECT COUNT(*) AS \"count\" FROM (SELECT COUNT(\"m\".\"team_id\") AS \"_c0\" \
             FROM \"member\" \"m\" GROUP BY \"m\".\"team_id\") \"_q\""
        );
    }

    #[test]
    fn plain_count_keeps_filter_and_drops_window() {
        let m = member();
        let age = m.column::<i64>("age");
        let q = Query::select(&age).from(&m).filter(age.lt(30)).order_by(age.asc()).limit(3).build().unwrap();
        let st = Translator::default().count(q.plan()).unwrap();
        assert_eq!(st.sql, "SELECT COUNT(*) AS \"count\" FROM \"member\" \"m\" WHERE \"m\".\"age\" < ?");
        assert_eq!(st.params, vec![Literal::Int(30)]);
    }

    #[test]
    fn update_renders_target_columns_bare() {
        let m = member();
        let age = m.column::<i64>("age");
        let plan = Query::update(&m).set(&age, age.add(1)).filter(age.lt(28)).build().unwrap();
        let st = Translator::default().mutation(Arc::new(plan)).unwrap();
        assert_eq!(
            st.sql,
            "UPDATE \"member\" SET \"age\" = (\"age\" + ?) WHERE \"age\" < ?"
        );
        assert_eq!(st.kind(), "mutation");
    }

    #[test]
    fn delete_without_filter_has_no_where() {
        let st = Translator::default().mutation(Arc::new(Query::delete(&member()).build().unwrap())).unwrap();
        assert_eq!(st.sql, "DELETE FROM \"member\"");
    }

    #[test]
    fn concat_and_case_follow_dialect() {
        let m = member();
        let username = m.column::<String>("username");
        let age = m.column::<i64>("age");
        let label = CaseBuilder::when(age.lt(20)).then("young").otherwise("old");
        let items = (username.concat("_").concat(age.string_value()), label);
        let q = Query::select(Projection::tuple(items)).from(&m).build().unwrap();
        let st = Translator::new(SqlDialect::MySql).select(Arc::clone(q.plan())).unwrap();
        assert_eq!(
            st.sql,
            "SELECT CONCAT(CONCAT(`m`.`username`, ?), CAST(`m`.`age` AS CHAR)) AS `_c0`, \
             CASE WHEN `m`.`age` < ? THEN ? ELSE ? END AS `_c1` FROM `member` `m`"
        );
        assert_eq!(st.params.len(), 4);
    }

    #[test]
    fn unknown_function_is_a_translation_error() {
        let m = member();
        let f = function::<String>("soundex", vec![m.column::<String>("username").into_node()]);
        let q = Query::select(&f).from(&m).build().unwrap();
        let err = Translator::default().select(Arc::clone(q.plan())).unwrap_err();
        assert!(matches!(err, TranslationError::UnknownFunction(name) if name == "soundex"));
    }

    #[test]
    fn function_arity_is_checked() {
        let m = member();
        let f = function::<String>("replace", vec![m.column::<String>("username").into_node()]);
        let q = Query::select(&f).from(&m).build().unwrap();
        let err = Translator::default().select(Arc::clone(q.plan())).unwrap_err();
        assert!(matches!(err, TranslationError::FunctionArity { found: 1, .. }));
    }

    #[test]
    fn translation_is_deterministic() {
        let m = member();
        let age = m.column::<i64>("age");
        let q = Query::select(&age).from(&m).filter(age.between(10, 20).or(age.is_null())).build().unwrap();
        let t = Translator::new(SqlDialect::Postgres);
        assert_eq!(t.select(Arc::clone(q.plan())).unwrap(), t.select(Arc::clone(q.plan())).unwrap());
    }
}

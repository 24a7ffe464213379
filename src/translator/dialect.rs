use indexmap::IndexMap;
use once_cell::sync::Lazy;

/// SQL flavour a statement is rendered for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SqlDialect {
    #[default]
    Ansi,
    Postgres,
    MySql,
}

/// A named SQL function callable through `function::<T>(name, args)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    pub sql_name: &'static str,
    pub min_args: usize,
    /// `None` = variadic.
    pub max_args: Option<usize>,
}

impl FunctionSpec {
    pub fn accepts(&self, args: usize) -> bool {
        args >= self.min_args && self.max_args.is_none_or(|max| args <= max)
    }

    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}..{}", self.min_args, max),
            None => format!("{}+", self.min_args),
        }
    }
}

static FUNCTIONS: Lazy<IndexMap<&'static str, FunctionSpec>> = Lazy::new(|| {
    IndexMap::from([
        ("replace", FunctionSpec { sql_name: "REPLACE", min_args: 3, max_args: Some(3) }),
        ("coalesce", FunctionSpec { sql_name: "COALESCE", min_args: 1, max_args: None }),
        ("abs", FunctionSpec { sql_name: "ABS", min_args: 1, max_args: Some(1) }),
        ("substring", FunctionSpec { sql_name: "SUBSTRING", min_args: 2, max_args: Some(3) }),
    ])
});

/// Upper bound MySQL expects when only an offset is given.
const MYSQL_MAX_LIMIT: &str = "18446744073709551615";

impl SqlDialect {
    /// Placeholder for the `index`-th bound parameter (1-based).
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${}", index),
            SqlDialect::Ansi | SqlDialect::MySql => "?".to_string(),
        }
    }

    pub fn quote(&self, ident: &str) -> String {
        match self {
            SqlDialect::MySql => format!("`{}`", ident.replace('`', "``")),
            SqlDialect::Ansi | SqlDialect::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    pub fn concat(&self, left: &str, right: &str) -> String {
        match self {
            SqlDialect::MySql => format!("CONCAT({}, {})", left, right),
            SqlDialect::Ansi | SqlDialect::Postgres => format!("({} || {})", left, right),
        }
    }

    pub fn cast_to_text(&self, expr: &str) -> String {
        match self {
            SqlDialect::Ansi => format!("CAST({} AS VARCHAR)", expr),
            SqlDialect::Postgres => format!("CAST({} AS TEXT)", expr),
            SqlDialect::MySql => format!("CAST({} AS CHAR)", expr),
        }
    }

    pub fn length_function(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "LENGTH",
            SqlDialect::Ansi | SqlDialect::MySql => "CHAR_LENGTH",
        }
    }

    /// Whether `NULLS FIRST` / `NULLS LAST` can be written directly.
    pub fn supports_null_ordering(&self) -> bool {
        !matches!(self, SqlDialect::MySql)
    }

    /// Renders the row window. `limit`/`offset` are placeholders already bound
    /// by the caller, in the order this dialect writes them.
    pub fn window(&self, limit: Option<&str>, offset: Option<&str>) -> String {
        match (self, limit, offset) {
            (_, None, None) => String::new(),
            (SqlDialect::Ansi, limit, offset) => {
                let mut out = String::new();
                if let Some(o) = offset { out.push_str(&format!(" OFFSET {} ROWS", o)); }
                if let Some(l) = limit { out.push_str(&format!(" FETCH NEXT {} ROWS ONLY", l)); }
                out
            }
            (_, Some(l), None) => format!(" LIMIT {}", l),
            (SqlDialect::MySql, None, Some(o)) => format!(" LIMIT {} OFFSET {}", MYSQL_MAX_LIMIT, o),
            (_, None, Some(o)) => format!(" OFFSET {}", o),
            (_, Some(l), Some(o)) => format!(" LIMIT {} OFFSET {}", l, o),
        }
    }

    /// Whether the window binds the offset before the limit.
    pub fn offset_first(&self) -> bool {
        matches!(self, SqlDialect::Ansi)
    }

    pub fn function(&self, name: &str) -> Option<&'static FunctionSpec> {
        FUNCTIONS.get(name)
    }
}

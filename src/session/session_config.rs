use crate::translator::SqlDialect;

/// Settings of a [`Session`](crate::session::Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub dialect: SqlDialect,
    /// Log every rendered statement at `debug`.
    pub log_statements: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { dialect: SqlDialect::default(), log_statements: true }
    }
}

impl SessionConfig {
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect, ..Self::default() }
    }

    pub fn quiet(self) -> Self {
        Self { log_statements: false, ..self }
    }
}

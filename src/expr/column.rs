use std::{fmt, sync::Arc};

/// A column of a source, addressed by the source's visible alias.
///
/// An empty `source` denotes an unqualified name; the memory evaluator uses
/// those for intermediate values such as aggregate outputs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub source: Arc<str>,
    pub name: Arc<str>,
}

impl ColumnRef {
    pub fn new(source: &str, name: &str) -> Self {
        Self { source: Arc::from(source), name: Arc::from(name) }
    }

    pub fn unqualified(name: &str) -> Self {
        Self::new("", name)
    }

    pub fn is_qualified(&self) -> bool {
        !self.source.is_empty()
    }

    /// Key under which the column lives in an evaluated row: `alias.name`.
    pub fn key(&self) -> String {
        if self.is_qualified() {
            format!("{}.{}", self.source, self.name)
        } else {
            self.name.to_string()
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl fmt::Debug for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column({})", self.key())
    }
}

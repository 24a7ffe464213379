use std::sync::Arc;

use crate::{expr::ScalarExpr, schema::Source};

/// One entry of a projection list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Expr { expr: ScalarExpr, alias: Option<Arc<str>> },
    /// Every column of a source (entity projection).
    AllColumns { source: Source },
}

impl SelectItem {
    pub fn expr(expr: ScalarExpr) -> Self {
        SelectItem::Expr { expr, alias: None }
    }

    pub fn aliased(expr: ScalarExpr, alias: &str) -> Self {
        SelectItem::Expr { expr, alias: Some(Arc::from(alias)) }
    }

    /// Output label of the item at `index`: its alias, `source.column` for a
    /// bare column, `_c{index}` otherwise. Entity items label their columns
    /// `alias.column`.
    pub fn label(&self, index: usize) -> String {
        match self {
            SelectItem::Expr { alias: Some(alias), .. } => alias.to_string(),
            SelectItem::Expr { expr: ScalarExpr::Column(c), .. } => c.key(),
            SelectItem::Expr { .. } => format!("_c{}", index),
            SelectItem::AllColumns { source } => source.alias.to_string(),
        }
    }

    /// Name used when assigning the item to a DTO field: the alias, else the
    /// bare column name.
    pub fn field_name(&self) -> Option<String> {
        match self {
            SelectItem::Expr { alias: Some(alias), .. } => Some(alias.to_string()),
            SelectItem::Expr { expr: ScalarExpr::Column(c), .. } => Some(c.name.to_string()),
            _ => None,
        }
    }

    pub fn scalar(&self) -> Option<&ScalarExpr> {
        match self {
            SelectItem::Expr { expr, .. } => Some(expr),
            SelectItem::AllColumns { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_prefer_alias_then_column_then_position() {
        let col = ScalarExpr::column("m", "username");
        assert_eq!(SelectItem::aliased(col.clone(), "name").label(0), "name");
        assert_eq!(SelectItem::expr(col.clone()).label(0), "m.username");
        assert_eq!(SelectItem::expr(ScalarExpr::literal(1)).label(3), "_c3");
        assert_eq!(SelectItem::expr(col).field_name().as_deref(), Some("username"));
        assert_eq!(SelectItem::expr(ScalarExpr::literal(1)).field_name(), None);
    }
}

/// A declared, named link from a column of one table to a column of another.
///
/// `member.team` = `member.team_id -> team.id`. Joining along it without an
/// explicit ON condition uses that equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub name: String,
    pub table: String,
    pub column: String,
    pub target_table: String,
    pub target_column: String,
}

impl Relationship {
    pub fn new(name: &str, table: &str, column: &str, target_table: &str, target_column: &str) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_ascii_lowercase(),
            column: column.to_string(),
            target_table: target_table.to_ascii_lowercase(),
            target_column: target_column.to_string(),
        }
    }
}

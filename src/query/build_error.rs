use thiserror::Error;

/// Reasons a query or mutation cannot be built. Raised only by `build()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("query has no source; call from() first")]
    NoSource,
    #[error("query has no projection items")]
    NoProjection,
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("alias '{0}' is used by more than one source")]
    DuplicateAlias(String),
    #[error("{clause} references unknown source '{alias}'")]
    UnknownSource { alias: String, clause: &'static str },
    #[error("relation '{relation}' is owned by unknown source '{owner}'")]
    UnknownRelationOwner { owner: String, relation: String },
    #[error("join of '{alias}' needs an ON condition")]
    MissingJoinCondition { alias: String },
    #[error("on() called before any join")]
    OnWithoutJoin,
    #[error("cross join of '{alias}' cannot carry an ON condition")]
    OnCrossJoin { alias: String },
    #[error("fetch_join() called before any join")]
    FetchWithoutJoin,
    #[error("fetch join of '{alias}' is invalid: {reason}")]
    InvalidFetchJoin { alias: String, reason: &'static str },
    #[error("aggregate functions are not allowed in {clause}")]
    MisplacedAggregate { clause: &'static str },
    #[error("group by requires an aggregate in the projection, having or order by")]
    GroupByWithoutAggregate,
    #[error("having requires group by or aggregates")]
    HavingWithoutGrouping,
    #[error("{clause} expression '{expr}' is neither grouped nor aggregated")]
    NotGrouped { expr: String, clause: &'static str },
    #[error("entity projection of '{alias}' is not allowed in a grouped query")]
    EntityInGroupedQuery { alias: String },
    #[error("subquery must project exactly one scalar column")]
    SubqueryNotScalar,
    #[error("projection label '{0}' is used by more than one item")]
    DuplicateLabel(String),
    #[error("projection item {index} has no field name; give it an alias")]
    MissingFieldName { index: usize },
    #[error("cannot assign '{column}': not a column of '{target}'")]
    InvalidAssignment { column: String, target: String },
    #[error("update sets no columns")]
    NoAssignments,
}

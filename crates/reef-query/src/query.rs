use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use reef_crdt::{EntryName, PointText, RowName, TableName};

use crate::error::{QueryError, QueryResult};

/// A compiled query: a table key plus a SELECT or JOIN payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub table: TableName,
    pub op: QueryOp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOp {
    Select(QuerySelect),
    Join(QueryJoin),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySelect {
    /// Maximum number of rows to emit. Zero means unlimited.
    #[serde(default)]
    pub limit: u64,
    /// Match-all when absent.
    #[serde(default)]
    pub where_clause: Option<Where>,
}

/// A tree of AND/OR over predicate leaves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Where {
    And(Vec<Where>),
    Or(Vec<Where>),
    Predicate(Predicate),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub op: PredicateOp,
    /// Entry names whose points participate in the match.
    #[serde(default)]
    pub keys: Vec<EntryName>,
    /// Literal values participating in the match.
    #[serde(default)]
    pub literals: Vec<PointText>,
    /// When set, the row key itself participates as a value.
    #[serde(default)]
    pub include_row_key: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredicateOp {
    StrEq,
    StrNeq,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryJoin {
    pub rows: Vec<RowJoin>,
}

/// One row of a JOIN: a row key and entry values to merge under it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowJoin {
    pub row_key: RowName,
    pub entries: BTreeMap<EntryName, PointText>,
}

impl Query {
    pub fn select(table: impl Into<TableName>, select: QuerySelect) -> Self {
        Self {
            table: table.into(),
            op: QueryOp::Select(select),
        }
    }

    pub fn join(table: impl Into<TableName>, rows: Vec<RowJoin>) -> Self {
        Self {
            table: table.into(),
            op: QueryOp::Join(QueryJoin { rows }),
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self.op, QueryOp::Select(_))
    }

    /// Structural validation, applied before a query is admitted.
    pub fn validate(&self) -> QueryResult<()> {
        if self.table.is_empty() {
            return Err(QueryError::Validation("expected table key".into()));
        }
        match &self.op {
            QueryOp::Select(select) => {
                if let Some(where_clause) = &select.where_clause {
                    validate_where(where_clause)?;
                }
            }
            QueryOp::Join(join) => {
                if join.rows.is_empty() {
                    return Err(QueryError::Validation("join has no rows".into()));
                }
                for row in &join.rows {
                    if row.row_key.is_empty() {
                        return Err(QueryError::Validation("join row has no key".into()));
                    }
                }
            }
        }
        Ok(())
    }
}

fn validate_where(where_clause: &Where) -> QueryResult<()> {
    match where_clause {
        Where::And(clauses) | Where::Or(clauses) => {
            for clause in clauses {
                validate_where(clause)?;
            }
            Ok(())
        }
        Where::Predicate(predicate) => {
            if predicate.keys.is_empty()
                && predicate.literals.is_empty()
                && !predicate.include_row_key
            {
                return Err(QueryError::Validation("predicate matches nothing".into()));
            }
            Ok(())
        }
    }
}

impl Predicate {
    pub fn str_eq(keys: Vec<EntryName>, literals: Vec<PointText>) -> Self {
        Self {
            op: PredicateOp::StrEq,
            keys,
            literals,
            include_row_key: false,
        }
    }

    pub fn str_neq(keys: Vec<EntryName>, literals: Vec<PointText>) -> Self {
        Self {
            op: PredicateOp::StrNeq,
            keys,
            literals,
            include_row_key: false,
        }
    }
}

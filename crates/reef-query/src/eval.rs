//! Query evaluation.
//!
//! One recursive evaluator over the tagged AST. SELECT walks the named
//! table's rows in sorted row-name order and keeps matches up to the limit;
//! JOIN builds the table to be merged into the namespace. Errors propagate
//! immediately; there is no partial result on failure.

use std::collections::BTreeSet;

use reef_crdt::{Entry, Namespace, Point, Row, RowName, Table};

use crate::error::QueryResult;
use crate::query::{Predicate, PredicateOp, QueryJoin, QuerySelect, Where};

/// Run a SELECT against a namespace snapshot.
///
/// The result is a namespace holding the (possibly empty) table of matching
/// rows under the queried table name. A missing table is an error.
pub fn evaluate_select(
    namespace: &Namespace,
    table_name: &str,
    select: &QuerySelect,
) -> QueryResult<Namespace> {
    let table = namespace.get_table(table_name)?;

    let mut matched = Table::empty();
    let mut count: u64 = 0;
    for (row_name, row) in table.rows() {
        if select.limit > 0 && count >= select.limit {
            break;
        }
        let matches = match &select.where_clause {
            Some(where_clause) => match_where(row_name, row, where_clause),
            None => true,
        };
        if matches {
            matched = matched.join_row(row_name.clone(), row.clone());
            count += 1;
        }
    }

    Ok(Namespace::empty().join_table(table_name.to_string(), matched))
}

/// Evaluate a where tree against one row.
pub fn match_where(row_name: &RowName, row: &Row, where_clause: &Where) -> bool {
    match where_clause {
        Where::And(clauses) => clauses
            .iter()
            .all(|clause| match_where(row_name, row, clause)),
        Where::Or(clauses) => clauses
            .iter()
            .any(|clause| match_where(row_name, row, clause)),
        Where::Predicate(predicate) => match_predicate(row_name, row, predicate),
    }
}

// A predicate gathers value sources: one set per named entry (its point
// texts), one singleton per literal, and optionally the row key. StrEq holds
// iff all sources share a common value; StrNeq is its negation.
fn match_predicate(row_name: &RowName, row: &Row, predicate: &Predicate) -> bool {
    let mut sources: Vec<BTreeSet<&str>> = Vec::new();

    for key in &predicate.keys {
        match row.get_entry(key) {
            Ok(entry) => sources.push(entry.values().into_iter().collect()),
            // A row without the named entry can never satisfy equality.
            Err(_) => sources.push(BTreeSet::new()),
        }
    }
    for literal in &predicate.literals {
        sources.push(BTreeSet::from([literal.as_str()]));
    }
    if predicate.include_row_key {
        sources.push(BTreeSet::from([row_name.as_str()]));
    }

    let all_share_value = match sources.split_first() {
        None => false,
        Some((first, rest)) => first
            .iter()
            .any(|value| rest.iter().all(|source| source.contains(value))),
    };

    match predicate.op {
        PredicateOp::StrEq => all_share_value,
        PredicateOp::StrNeq => !all_share_value,
    }
}

/// Build the table a JOIN merges into the namespace: one row per row join,
/// each entry value becoming a single point.
pub fn table_from_join(join: &QueryJoin) -> Table {
    let mut table = Table::empty();
    for row_join in &join.rows {
        let mut row = Row::empty();
        for (entry_name, value) in &row_join.entries {
            row = row.join_entry(
                entry_name.clone(),
                Entry::make(vec![Point::new(value.clone())]),
            );
        }
        table = table.join_row(row_join.row_key.clone(), row);
    }
    table
}

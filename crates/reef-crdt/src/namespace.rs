use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CrdtError, CrdtResult};
use crate::point::Entry;
use crate::{EntryName, RowName, TableName};

/// A mapping from entry names to entries. Join is key-wise entry join.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    entries: BTreeMap<EntryName, Entry>,
}

impl Row {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn make(entries: BTreeMap<EntryName, Entry>) -> Self {
        Self { entries }
    }

    pub fn join(&self, other: &Row) -> Row {
        let mut entries = self.entries.clone();
        for (name, entry) in &other.entries {
            entries
                .entry(name.clone())
                .and_modify(|mine| *mine = mine.join(entry))
                .or_insert_with(|| entry.clone());
        }
        Row { entries }
    }

    pub fn join_entry(&self, name: impl Into<EntryName>, entry: Entry) -> Row {
        let mut addition = Row::empty();
        addition.entries.insert(name.into(), entry);
        self.join(&addition)
    }

    pub fn get_entry(&self, name: &str) -> CrdtResult<&Entry> {
        self.entries
            .get(name)
            .ok_or_else(|| CrdtError::NoSuchEntry(name.to_string()))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&EntryName, &Entry)> {
        self.entries.iter()
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &EntryName> {
        self.entries.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A mapping from row names to rows. Join is key-wise row join.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    rows: BTreeMap<RowName, Row>,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn make(rows: BTreeMap<RowName, Row>) -> Self {
        Self { rows }
    }

    pub fn join(&self, other: &Table) -> Table {
        let mut rows = self.rows.clone();
        for (name, row) in &other.rows {
            rows.entry(name.clone())
                .and_modify(|mine| *mine = mine.join(row))
                .or_insert_with(|| row.clone());
        }
        Table { rows }
    }

    pub fn join_row(&self, name: impl Into<RowName>, row: Row) -> Table {
        let mut addition = Table::empty();
        addition.rows.insert(name.into(), row);
        self.join(&addition)
    }

    pub fn get_row(&self, name: &str) -> CrdtResult<&Row> {
        self.rows
            .get(name)
            .ok_or_else(|| CrdtError::NoSuchRow(name.to_string()))
    }

    /// Rows in sorted row-name order.
    pub fn rows(&self) -> impl Iterator<Item = (&RowName, &Row)> {
        self.rows.iter()
    }

    pub fn all_rows(&self) -> Vec<&Row> {
        self.rows.values().collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The root CRDT: a mapping from table names to tables.
///
/// Join is key-wise table join; it is total, commutative, associative and
/// idempotent. `join` returns a new value, leaving both inputs unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    tables: BTreeMap<TableName, Table>,
}

impl Namespace {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn make(tables: BTreeMap<TableName, Table>) -> Self {
        Self { tables }
    }

    pub fn join(&self, other: &Namespace) -> Namespace {
        let mut tables = self.tables.clone();
        for (name, table) in &other.tables {
            tables
                .entry(name.clone())
                .and_modify(|mine| *mine = mine.join(table))
                .or_insert_with(|| table.clone());
        }
        Namespace { tables }
    }

    pub fn join_table(&self, name: impl Into<TableName>, table: Table) -> Namespace {
        let mut addition = Namespace::empty();
        addition.tables.insert(name.into(), table);
        self.join(&addition)
    }

    pub fn get_table(&self, name: &str) -> CrdtResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| CrdtError::NoSuchTable(name.to_string()))
    }

    pub fn tables(&self) -> impl Iterator<Item = (&TableName, &Table)> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &TableName> {
        self.tables.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point;

    fn table_with(row: &str, entry: &str, value: &str) -> Table {
        Table::empty().join_row(
            row,
            Row::empty().join_entry(entry, Entry::make(vec![Point::new(value)])),
        )
    }

    #[test]
    fn empty_namespace() {
        let ns = Namespace::empty();
        assert!(ns.is_empty());
        assert_eq!(ns, Namespace::make(BTreeMap::new()));
    }

    #[test]
    fn make_namespace() {
        let mut tables = BTreeMap::new();
        tables.insert("foo".to_string(), Table::empty());
        let ns = Namespace::make(tables);
        assert!(!ns.is_empty());
        assert!(ns.get_table("foo").is_ok());
    }

    #[test]
    fn copy_is_structural() {
        let ns = Namespace::empty().join_table("foo", table_with("r", "e", "v"));
        let copy = ns.clone();
        assert_eq!(ns, copy);
    }

    #[test]
    fn join_namespace_does_not_mutate_inputs() {
        let foo = Namespace::empty().join_table("foo", Table::empty());
        let bar = Namespace::empty().join_table("bar", Table::empty());

        let joined = foo.join(&bar);

        assert!(joined.get_table("foo").is_ok());
        assert!(joined.get_table("bar").is_ok());
        assert!(foo.get_table("bar").is_err());
        assert!(bar.get_table("foo").is_err());
    }

    #[test]
    fn join_namespace_laws() {
        let a = Namespace::empty().join_table("t1", table_with("r1", "e1", "v1"));
        let b = Namespace::empty().join_table("t1", table_with("r1", "e1", "v2"));
        let c = Namespace::empty().join_table("t2", table_with("r2", "e2", "v3"));

        assert_eq!(a.join(&a), a, "idempotent");
        assert_eq!(a.join(&b), b.join(&a), "commutative");
        assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)), "associative");
        assert_eq!(a.join(&Namespace::empty()), a, "empty is identity");
    }

    #[test]
    fn join_table_deep_merges() {
        let ns = Namespace::empty().join_table("t", table_with("r", "e", "v1"));
        let merged = ns.join_table("t", table_with("r", "e", "v2"));

        let entry = merged
            .get_table("t")
            .unwrap()
            .get_row("r")
            .unwrap()
            .get_entry("e")
            .unwrap();
        assert_eq!(entry.values(), vec!["v1", "v2"]);
    }

    #[test]
    fn get_table_not_found() {
        let err = Namespace::empty().get_table("ghost").unwrap_err();
        assert_eq!(err, CrdtError::NoSuchTable("ghost".to_string()));
    }

    #[test]
    fn namespace_equality_matrix() {
        let table = Table::empty();
        let ns_a = Namespace::empty().join_table("foo", table.clone());
        let ns_b = Namespace::empty().join_table("bar", table.clone());
        let ns_c = Namespace::empty();
        let ns_d = Namespace::empty().join_table("foo", table.join_row("howdy", Row::empty()));

        let all = [&ns_a, &ns_b, &ns_c, &ns_d];
        for (i, left) in all.iter().enumerate() {
            for (j, right) in all.iter().enumerate() {
                if i == j {
                    assert_eq!(left, right);
                } else {
                    assert_ne!(left, right);
                }
            }
        }
    }

    #[test]
    fn table_join_laws() {
        let a = table_with("r1", "e", "v1");
        let b = table_with("r1", "e", "v2");
        let c = table_with("r2", "e", "v3");

        assert_eq!(a.join(&a), a);
        assert_eq!(a.join(&b), b.join(&a));
        assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
        assert_eq!(a.join(&Table::empty()), a);
    }

    #[test]
    fn table_join_row() {
        let row = Row::empty().join_entry("bar", Entry::from_texts(["hello"]));
        let table = Table::empty().join_row("foo", row.clone());

        assert_eq!(table.get_row("foo").unwrap(), &row);
        assert!(Table::empty().get_row("foo").is_err());
    }

    #[test]
    fn table_rows_iterate_sorted() {
        let table = Table::empty()
            .join_row("zeta", Row::empty())
            .join_row("alpha", Row::empty());
        let names: Vec<&str> = table.rows().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn table_all_rows() {
        let full = Row::empty().join_entry("baz", Entry::empty());
        let table = Table::empty()
            .join_row("foo", Row::empty())
            .join_row("bar", full.clone());
        let rows = table.all_rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.contains(&&full));
    }

    #[test]
    fn row_join_laws() {
        let a = Row::empty().join_entry("e", Entry::from_texts(["1"]));
        let b = Row::empty().join_entry("e", Entry::from_texts(["2"]));
        let c = Row::empty().join_entry("f", Entry::from_texts(["3"]));

        assert_eq!(a.join(&a), a);
        assert_eq!(a.join(&b), b.join(&a));
        assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
        assert_eq!(a.join(&Row::empty()), a);
    }

    #[test]
    fn row_join_entry_merges() {
        let row = Row::empty()
            .join_entry("e", Entry::from_texts(["a"]))
            .join_entry("e", Entry::from_texts(["b"]));
        assert_eq!(row.get_entry("e").unwrap().values(), vec!["a", "b"]);
    }

    #[test]
    fn row_get_entry_not_found() {
        let err = Row::empty().get_entry("nope").unwrap_err();
        assert_eq!(err, CrdtError::NoSuchEntry("nope".to_string()));
    }
}

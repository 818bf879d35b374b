use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CrdtError, CrdtResult};
use crate::link::{Address, Link};
use crate::namespace::Namespace;
use crate::TableName;

/// The peer-discoverable manifest: a mapping from table names to the set of
/// namespace-snapshot links that contribute to that table.
///
/// Join is key-wise set union of links; links to the same address merge
/// their signature sets. Like every CRDT here, the index is grow-only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    tables: BTreeMap<TableName, Vec<Link>>,
}

impl Index {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The index addition produced by persisting `namespace` at `link`:
    /// every table in the snapshot maps to that one link.
    pub fn from_namespace(namespace: &Namespace, link: Link) -> Self {
        let mut index = Self::empty();
        for name in namespace.table_names() {
            index = index.join_table(name.clone(), link.clone());
        }
        index
    }

    pub fn join(&self, other: &Index) -> Index {
        let mut tables = self.tables.clone();
        for (name, links) in &other.tables {
            let mine = tables.entry(name.clone()).or_default();
            for link in links {
                insert_link(mine, link.clone());
            }
        }
        Index { tables }
    }

    pub fn join_table(&self, name: impl Into<TableName>, link: Link) -> Index {
        let mut joined = self.clone();
        let links = joined.tables.entry(name.into()).or_default();
        insert_link(links, link);
        joined
    }

    /// The links for one table, sorted by address.
    pub fn get_table_links(&self, name: &str) -> CrdtResult<&[Link]> {
        self.tables
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| CrdtError::NoSuchTable(name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&TableName, &[Link])> {
        self.tables.iter().map(|(name, links)| (name, links.as_slice()))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &TableName> {
        self.tables.keys()
    }

    /// Every distinct snapshot address referenced by this index, sorted.
    pub fn all_addresses(&self) -> Vec<Address> {
        let mut addrs: Vec<Address> = self
            .tables
            .values()
            .flatten()
            .map(|link| link.address().clone())
            .collect();
        addrs.sort();
        addrs.dedup();
        addrs
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// Links stay sorted by address; duplicate addresses merge signature sets.
fn insert_link(links: &mut Vec<Link>, link: Link) {
    match links.binary_search_by(|l| l.address().cmp(link.address())) {
        Ok(i) => links[i] = links[i].merge(&link),
        Err(i) => links.insert(i, link),
    }
}

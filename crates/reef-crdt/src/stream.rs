//! Canonical stream forms.
//!
//! Maps serialize differently depending on insertion history in many codecs;
//! streams do not. A namespace flattens to a sorted list of
//! (table, row, entry, point) tuples and an index to a sorted list of
//! (table, address) tuples, so structurally equal values always produce
//! byte-identical encodings. Empty containers carry no stream entries.

use serde::{Deserialize, Serialize};

use reef_crypto::Signature;

use crate::index::Index;
use crate::link::{Address, Link};
use crate::namespace::{Namespace, Row, Table};
use crate::point::{Entry, Point};
use crate::{EntryName, PointText, RowName, TableName};

/// One point of a namespace, with its full path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespaceStreamEntry {
    pub table: TableName,
    pub row: RowName,
    pub entry: EntryName,
    pub point: PointText,
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

/// One link of an index, with its table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexStreamEntry {
    pub table: TableName,
    pub address: Address,
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

/// A point separated from the stream because it violated a codec limit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidNamespaceEntry {
    pub table: TableName,
    pub row: RowName,
    pub entry: EntryName,
    pub reason: String,
}

impl Namespace {
    /// The full canonical stream, sorted.
    pub fn stream(&self) -> Vec<NamespaceStreamEntry> {
        self.stream_with_limit(usize::MAX).0
    }

    /// The canonical stream with oversized points separated out.
    ///
    /// Separation is the codec's sole partial-failure contract: an invalid
    /// point never aborts the encode of the rest of the namespace.
    pub fn stream_with_limit(
        &self,
        max_point_size: usize,
    ) -> (Vec<NamespaceStreamEntry>, Vec<InvalidNamespaceEntry>) {
        let mut stream = Vec::new();
        let mut invalid = Vec::new();

        for (table_name, table) in self.tables() {
            for (row_name, row) in table.rows() {
                for (entry_name, entry) in row.entries() {
                    for point in entry.points() {
                        if point.text().len() > max_point_size {
                            invalid.push(InvalidNamespaceEntry {
                                table: table_name.clone(),
                                row: row_name.clone(),
                                entry: entry_name.clone(),
                                reason: format!(
                                    "point size {} exceeds limit {}",
                                    point.text().len(),
                                    max_point_size
                                ),
                            });
                            continue;
                        }
                        stream.push(NamespaceStreamEntry {
                            table: table_name.clone(),
                            row: row_name.clone(),
                            entry: entry_name.clone(),
                            point: point.text().to_string(),
                            signatures: point.signatures().to_vec(),
                        });
                    }
                }
            }
        }

        // BTreeMap iteration plus sorted entries already yields sorted
        // output; the sort is kept so the stream is canonical even if the
        // invariant above ever changes.
        stream.sort();
        (stream, invalid)
    }

    /// Rebuild a namespace from stream entries, in any order.
    pub fn from_stream(entries: &[NamespaceStreamEntry]) -> Namespace {
        let mut ns = Namespace::empty();
        for se in entries {
            let point = Point::signed(se.point.clone(), se.signatures.clone());
            let row = Row::empty().join_entry(se.entry.clone(), Entry::make(vec![point]));
            let table = Table::empty().join_row(se.row.clone(), row);
            ns = ns.join_table(se.table.clone(), table);
        }
        ns
    }
}

impl Index {
    /// The canonical stream, sorted.
    pub fn stream(&self) -> Vec<IndexStreamEntry> {
        let mut stream = Vec::new();
        for (table, links) in self.tables() {
            for link in links {
                stream.push(IndexStreamEntry {
                    table: table.clone(),
                    address: link.address().clone(),
                    signatures: link.signatures().to_vec(),
                });
            }
        }
        stream.sort();
        stream
    }

    /// Rebuild an index from stream entries, in any order.
    pub fn from_stream(entries: &[IndexStreamEntry]) -> Index {
        let mut index = Index::empty();
        for se in entries {
            let link = Link::signed(se.address.clone(), se.signatures.clone());
            index = index.join_table(se.table.clone(), link);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reef_crypto::SigningKey;

    fn sample_namespace() -> Namespace {
        let row = Row::empty()
            .join_entry("e1", Entry::from_texts(["v1", "v2"]))
            .join_entry("e2", Entry::from_texts(["v3"]));
        Namespace::empty()
            .join_table("t1", Table::empty().join_row("r1", row.clone()))
            .join_table("t2", Table::empty().join_row("r2", row))
    }

    #[test]
    fn stream_roundtrip() {
        let ns = sample_namespace();
        let rebuilt = Namespace::from_stream(&ns.stream());
        assert_eq!(ns, rebuilt);
    }

    #[test]
    fn stream_is_sorted_and_stable() {
        let ns = sample_namespace();
        let stream = ns.stream();
        let mut sorted = stream.clone();
        sorted.sort();
        assert_eq!(stream, sorted);
        // Structurally equal values produce identical streams.
        assert_eq!(stream, ns.clone().stream());
    }

    #[test]
    fn stream_roundtrip_preserves_signatures() {
        let key = SigningKey::from_bytes([8u8; 32]);
        let point = Point::signed("v", vec![key.sign(b"v")]);
        let ns = Namespace::empty().join_table(
            "t",
            Table::empty().join_row(
                "r",
                Row::empty().join_entry("e", Entry::make(vec![point])),
            ),
        );

        let rebuilt = Namespace::from_stream(&ns.stream());
        assert_eq!(ns, rebuilt);
        let entry = rebuilt
            .get_table("t")
            .unwrap()
            .get_row("r")
            .unwrap()
            .get_entry("e")
            .unwrap();
        assert!(entry.points()[0].is_signed());
    }

    #[test]
    fn oversized_points_are_separated_not_fatal() {
        let row = Row::empty().join_entry(
            "e",
            Entry::from_texts(["ok", "waaaaaaaaaaaay too long"]),
        );
        let ns = Namespace::empty().join_table("t", Table::empty().join_row("r", row));

        let (stream, invalid) = ns.stream_with_limit(10);

        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].point, "ok");
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].entry, "e");
        assert!(invalid[0].reason.contains("exceeds limit"));
    }

    #[test]
    fn empty_namespace_streams_empty() {
        assert!(Namespace::empty().stream().is_empty());
        assert_eq!(Namespace::from_stream(&[]), Namespace::empty());
    }

    #[test]
    fn index_stream_roundtrip() {
        let key = SigningKey::from_bytes([4u8; 32]);
        let signed = Link::signed(Address::new("a2"), vec![key.sign(b"a2")]);
        let index = Index::empty()
            .join_table("t", Link::new(Address::new("a1")))
            .join_table("u", signed);

        let rebuilt = Index::from_stream(&index.stream());
        assert_eq!(index, rebuilt);
    }

    #[test]
    fn index_stream_is_sorted() {
        let index = Index::empty()
            .join_table("zz", Link::new(Address::new("a1")))
            .join_table("aa", Link::new(Address::new("a2")));
        let stream = index.stream();
        assert_eq!(stream[0].table, "aa");
        assert_eq!(stream[1].table, "zz");
    }
}

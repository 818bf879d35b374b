//! Join-semilattice data model for the reef key-value database.
//!
//! The root type is [`Namespace`]: a map of tables, each a map of rows, each
//! a map of entries, each a set of [`Point`]s. Every level supports `join`,
//! which is commutative, associative and idempotent, so any two replicas of
//! a namespace can be merged in any order and converge. There is no delete:
//! the model is grow-only.
//!
//! [`Index`] is the peer-discoverable manifest: it maps table names to the
//! [`Link`]s (content addresses) of namespace snapshots that contribute to
//! that table. Fetching every linked snapshot and joining them reconstructs
//! the table's logical state.
//!
//! Canonical streams ([`stream`]) flatten these maps into sorted tuple lists
//! so that structurally equal values encode to byte-identical blobs.

pub mod error;
pub mod index;
pub mod link;
pub mod namespace;
pub mod point;
pub mod stream;

pub use error::{CrdtError, CrdtResult};
pub use index::Index;
pub use link::{Address, Link};
pub use namespace::{Namespace, Row, Table};
pub use point::{Entry, Point};
pub use stream::{IndexStreamEntry, InvalidNamespaceEntry, NamespaceStreamEntry};

/// Name of a table within a namespace.
pub type TableName = String;
/// Name of a row within a table.
pub type RowName = String;
/// Name of an entry within a row.
pub type EntryName = String;
/// The text value carried by a point.
pub type PointText = String;

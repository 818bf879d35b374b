use serde::{Deserialize, Serialize};

use reef_crypto::Signature;

use crate::PointText;

/// An immutable string value, optionally bearing signatures.
///
/// Two points are equal when their text and their signature *sets* are
/// equal; signatures are held sorted and deduplicated so derived equality
/// has set semantics.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    text: PointText,
    #[serde(default)]
    signatures: Vec<Signature>,
}

impl Point {
    /// An unsigned point.
    pub fn new(text: impl Into<PointText>) -> Self {
        Self {
            text: text.into(),
            signatures: Vec::new(),
        }
    }

    /// A point carrying signatures.
    pub fn signed(text: impl Into<PointText>, signatures: Vec<Signature>) -> Self {
        let mut point = Self::new(text);
        point.merge_signatures(signatures);
        point
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// Returns `true` if at least one signature verifies over the text.
    pub fn has_valid_signature(&self) -> bool {
        self.signatures
            .iter()
            .any(|sig| sig.is_valid_for(self.text.as_bytes()))
    }

    pub(crate) fn merge_signatures(&mut self, extra: Vec<Signature>) {
        self.signatures.extend(extra);
        self.signatures.sort();
        self.signatures.dedup();
    }
}

impl From<&str> for Point {
    fn from(text: &str) -> Self {
        Point::new(text)
    }
}

/// An unordered set of points. Join is set union; points with equal text
/// merge their signature sets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    points: Vec<Point>,
}

impl Entry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn make(points: Vec<Point>) -> Self {
        let mut entry = Self::empty();
        for point in points {
            entry.insert(point);
        }
        entry
    }

    /// Convenience constructor from bare text values.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PointText>,
    {
        Self::make(texts.into_iter().map(|t| Point::new(t)).collect())
    }

    pub fn join(&self, other: &Entry) -> Entry {
        let mut joined = self.clone();
        for point in &other.points {
            joined.insert(point.clone());
        }
        joined
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The point texts, in sorted order.
    pub fn values(&self) -> Vec<&str> {
        self.points.iter().map(Point::text).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn contains_text(&self, text: &str) -> bool {
        self.points
            .binary_search_by(|p| p.text().cmp(text))
            .is_ok()
    }

    // Points stay sorted by text; a duplicate text merges signature sets.
    fn insert(&mut self, point: Point) {
        match self
            .points
            .binary_search_by(|p| p.text().cmp(point.text()))
        {
            Ok(i) => {
                let Point { signatures, .. } = point;
                self.points[i].merge_signatures(signatures);
            }
            Err(i) => self.points.insert(i, point),
        }
    }
}

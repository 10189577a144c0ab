use std::collections::HashSet;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// One scraped listing from a search-results page.
///
/// `price` and `rating` are kept as display text ("1,299", "4.5 out of 5 stars").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    pub price: String,
    pub rating: String,
}

impl BookRecord {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        price: impl Into<String>,
        rating: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            price: price.into(),
            rating: rating.into(),
        }
    }
}

/// Bounded, title-unique list of records produced by one collector run.
///
/// The only way to build one is [`BookCollection::bounded`], which truncates
/// to the requested size and then drops any record whose title was already
/// seen, so every instance upholds both invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookCollection {
    records: Vec<BookRecord>,
}

impl BookCollection {
    /// Truncate `records` to `target_count`, then keep the first record per title.
    pub fn bounded(mut records: Vec<BookRecord>, target_count: NonZeroUsize) -> Self {
        records.truncate(target_count.get());

        let mut seen = HashSet::with_capacity(records.len());
        records.retain(|record| seen.insert(record.title.clone()));

        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BookRecord> {
        self.records.iter()
    }

    pub fn titles(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.title.as_str()).collect()
    }
}

impl IntoIterator for BookCollection {
    type Item = BookRecord;
    type IntoIter = std::vec::IntoIter<BookRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a BookCollection {
    type Item = &'a BookRecord;
    type IntoIter = std::slice::Iter<'a, BookRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A row of the `books` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredBook {
    pub id: i64,
    pub title: String,
    pub authors: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
}

//! Repository interfaces for the books table.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::book::{BookRecord, StoredBook};

#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Create the `books` table if it does not exist yet.
    async fn ensure_table(&self) -> Result<()>;

    /// Insert one record as a new row and return the generated id.
    async fn insert_book(&self, book: &BookRecord) -> Result<i64>;

    async fn list_books(&self) -> Result<Vec<StoredBook>>;

    async fn count_books(&self) -> Result<i64>;
}

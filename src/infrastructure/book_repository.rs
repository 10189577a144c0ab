//! SQLite-backed repository for the `books` table

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::domain::book::{BookRecord, StoredBook};
use crate::domain::repositories::BookRepository;

pub const CREATE_BOOKS_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS books (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        authors TEXT,
        price TEXT,
        rating TEXT
    )
"#;

pub const INSERT_BOOK_SQL: &str =
    "INSERT INTO books (title, authors, price, rating) VALUES (?, ?, ?, ?)";

#[derive(Clone)]
pub struct SqliteBookRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn ensure_table(&self) -> Result<()> {
        sqlx::query(CREATE_BOOKS_TABLE_SQL)
            .execute(&*self.pool)
            .await
            .context("Failed to create books table")?;
        Ok(())
    }

    async fn insert_book(&self, book: &BookRecord) -> Result<i64> {
        let result = sqlx::query(INSERT_BOOK_SQL)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.price)
            .bind(&book.rating)
            .execute(&*self.pool)
            .await
            .with_context(|| format!("Failed to insert book '{}'", book.title))?;
        Ok(result.last_insert_rowid())
    }

    async fn list_books(&self) -> Result<Vec<StoredBook>> {
        let books = sqlx::query_as::<_, StoredBook>(
            "SELECT id, title, authors, price, rating FROM books ORDER BY id",
        )
        .fetch_all(&*self.pool)
        .await
        .context("Failed to list books")?;
        Ok(books)
    }

    async fn count_books(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
            .fetch_one(&*self.pool)
            .await
            .context("Failed to count books")?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::DatabaseConnection;

    async fn repository() -> Result<SqliteBookRepository> {
        let db = DatabaseConnection::new("sqlite::memory:").await?;
        Ok(SqliteBookRepository::new(db.pool().clone()))
    }

    #[tokio::test]
    async fn test_ensure_table_is_idempotent() -> Result<()> {
        let repo = repository().await?;
        repo.ensure_table().await?;
        repo.ensure_table().await?;

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'books'",
        )
        .fetch_one(&*repo.pool)
        .await?;
        assert_eq!(tables, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_maps_author_to_authors() -> Result<()> {
        let repo = repository().await?;
        repo.ensure_table().await?;

        let first = repo
            .insert_book(&BookRecord::new("Streaming Systems", "Tyler Akidau", "39.", "4.6 out of 5 stars"))
            .await?;
        let second = repo
            .insert_book(&BookRecord::new("Data Pipelines Pocket Reference", "James Densmore", "24.", "4.5 out of 5 stars"))
            .await?;
        assert!(second > first);

        let rows = repo.list_books().await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, first);
        assert_eq!(rows[0].title, "Streaming Systems");
        assert_eq!(rows[0].authors.as_deref(), Some("Tyler Akidau"));
        assert_eq!(rows[0].price.as_deref(), Some("39."));
        assert_eq!(rows[0].rating.as_deref(), Some("4.6 out of 5 stars"));
        assert_eq!(repo.count_books().await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_without_table_fails() -> Result<()> {
        let repo = repository().await?;
        let err = repo
            .insert_book(&BookRecord::new("t", "a", "1", "r"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to insert book 't'"));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_titles_across_runs_are_stored() -> Result<()> {
        // Dedup is per run only; the table itself has no uniqueness constraint
        let repo = repository().await?;
        repo.ensure_table().await?;
        let book = BookRecord::new("Same", "a", "1", "r");
        repo.insert_book(&book).await?;
        repo.insert_book(&book).await?;
        assert_eq!(repo.count_books().await?, 2);
        Ok(())
    }
}

use std::sync::Arc;

use tracing::info;

use crate::application::error::PipelineError;
use crate::domain::book::BookCollection;
use crate::domain::repositories::BookRepository;

/// Last step of a run: one insert per collected record, in order.
///
/// No transaction spans the records; rows inserted before a failure stay.
#[derive(Clone)]
pub struct BookLoader {
    repository: Arc<dyn BookRepository>,
}

impl BookLoader {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self { repository }
    }

    /// Consume the collection and return the number of rows inserted.
    pub async fn load(&self, collection: BookCollection) -> Result<usize, PipelineError> {
        if collection.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let mut inserted = 0;
        for book in collection {
            self.repository
                .insert_book(&book)
                .await
                .map_err(|source| PipelineError::Insert {
                    title: book.title.clone(),
                    inserted_before: inserted,
                    source,
                })?;
            inserted += 1;
        }

        info!("Book data inserted successfully: {} rows", inserted);
        Ok(inserted)
    }
}

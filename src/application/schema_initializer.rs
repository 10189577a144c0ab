use std::sync::Arc;

use tracing::info;

use crate::application::error::PipelineError;
use crate::domain::repositories::BookRepository;

/// First step of a run: make sure the destination table exists.
#[derive(Clone)]
pub struct SchemaInitializer {
    repository: Arc<dyn BookRepository>,
}

impl SchemaInitializer {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self { repository }
    }

    /// Idempotent; an existing table is left untouched.
    pub async fn ensure_table(&self) -> Result<(), PipelineError> {
        self.repository
            .ensure_table()
            .await
            .map_err(PipelineError::Schema)?;
        info!("books table ready");
        Ok(())
    }
}

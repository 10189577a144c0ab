//! books-etl - scheduled book listing ETL
//!
//! Scrapes a paginated search-results page, deduplicates listings by title
//! and inserts them into a `books` table, once per configured interval.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::sync::Arc;

use anyhow::Result;

use crate::application::{EtlPipeline, EtlScheduler};
use crate::infrastructure::{
    AppConfig, BookListParser, DatabaseConnection, HttpClient, HttpClientConfig,
    SqliteBookRepository,
};

/// Everything a run needs, built from configuration
pub struct App {
    pub config: AppConfig,
    pub database: DatabaseConnection,
    pub pipeline: Arc<EtlPipeline>,
}

impl App {
    /// Open the datastore and build the pipeline.
    pub async fn build(config: AppConfig) -> Result<Self> {
        let database = DatabaseConnection::from_config(&config.database).await?;
        let repository = Arc::new(SqliteBookRepository::new(database.pool().clone()));
        let source = Arc::new(HttpClient::new(HttpClientConfig::from(&config.source))?);
        let parser = BookListParser::with_config(&config.source.selectors)?;

        let pipeline = Arc::new(EtlPipeline::from_parts(
            source,
            repository,
            parser,
            config.source.max_pages,
        ));

        Ok(Self {
            config,
            database,
            pipeline,
        })
    }

    pub fn scheduler(&self) -> Result<EtlScheduler> {
        EtlScheduler::new(self.pipeline.clone(), &self.config.scheduler)
    }
}

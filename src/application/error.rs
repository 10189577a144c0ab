//! Errors that fail a pipeline run

use thiserror::Error;

use crate::application::pipeline::RunReport;
use crate::domain::run_state::RunStateError;
use crate::infrastructure::parsing::ParsingError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No book data found: nothing to load")]
    EmptyInput,

    #[error("Failed to ensure books table: {0:#}")]
    Schema(#[source] anyhow::Error),

    #[error("Request for page {page} failed: {source:#}")]
    Fetch {
        page: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParsingError),

    #[error("Failed to insert '{title}' after {inserted_before} rows: {source:#}")]
    Insert {
        title: String,
        inserted_before: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    State(#[from] RunStateError),
}

impl PipelineError {
    /// Rows already committed when the error occurred
    pub fn rows_committed(&self) -> usize {
        match self {
            Self::Insert { inserted_before, .. } => *inserted_before,
            _ => 0,
        }
    }
}

/// A failed run: the report up to the failure plus the error that ended it.
#[derive(Error, Debug)]
#[error("run {} failed: {}", .report.run_id, .error)]
pub struct RunFailure {
    pub report: RunReport,
    #[source]
    pub error: PipelineError,
}

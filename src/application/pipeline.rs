//! One ETL run: ensure table → collect → load
//!
//! Each run gets its own id and state machine. A failure in any step moves
//! the run to `Failed` and nothing after that step executes.

use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::application::collector::BookCollector;
use crate::application::error::{PipelineError, RunFailure};
use crate::application::loader::BookLoader;
use crate::application::schema_initializer::SchemaInitializer;
use crate::domain::repositories::BookRepository;
use crate::domain::run_state::{RunState, RunStateMachine};
use crate::domain::services::PageSource;
use crate::infrastructure::parsing::BookListParser;

/// Summary of one run, successful or not
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub state: RunState,
    /// State the run was in when it failed
    pub failed_in: Option<RunState>,
    pub requested: usize,
    pub collected: usize,
    pub inserted: usize,
    pub error: Option<String>,
}

impl RunReport {
    fn start(requested: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            state: RunState::Idle,
            failed_in: None,
            requested,
            collected: 0,
            inserted: 0,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == RunState::Loaded
    }
}

pub struct EtlPipeline {
    schema: SchemaInitializer,
    collector: BookCollector,
    loader: BookLoader,
}

impl EtlPipeline {
    pub fn new(schema: SchemaInitializer, collector: BookCollector, loader: BookLoader) -> Self {
        Self {
            schema,
            collector,
            loader,
        }
    }

    /// Wire all three steps around one page source and one repository.
    pub fn from_parts(
        source: Arc<dyn PageSource>,
        repository: Arc<dyn BookRepository>,
        parser: BookListParser,
        max_pages: u32,
    ) -> Self {
        Self::new(
            SchemaInitializer::new(repository.clone()),
            BookCollector::new(source, parser).with_max_pages(max_pages),
            BookLoader::new(repository),
        )
    }

    pub async fn run(&self, target_count: NonZeroUsize) -> Result<RunReport, RunFailure> {
        let mut report = RunReport::start(target_count.get());
        let span = info_span!("etl_run", run_id = %report.run_id);

        async move {
            info!("Starting run (target {} books)", report.requested);
            let mut machine = RunStateMachine::new();

            let outcome = self.execute(target_count, &mut machine, &mut report).await;
            report.finished_at = Some(Utc::now());

            match outcome {
                Ok(()) => {
                    report.state = machine.current();
                    info!(
                        "Run finished: {} collected, {} inserted",
                        report.collected, report.inserted
                    );
                    Ok(report)
                }
                Err(error) => {
                    let failed_in = machine.current();
                    // From a non-terminal state this cannot be rejected
                    let _ = machine.fail();
                    report.failed_in = Some(failed_in);
                    report.state = RunState::Failed;
                    report.inserted = error.rows_committed();
                    report.error = Some(error.to_string());
                    error!("Run failed in state {}: {}", failed_in, error);
                    Err(RunFailure { report, error })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        target_count: NonZeroUsize,
        machine: &mut RunStateMachine,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        self.schema.ensure_table().await?;
        report.state = machine.advance()?;

        let collection = self.collector.collect(target_count).await?;
        report.collected = collection.len();
        report.state = machine.advance()?;

        report.inserted = self.loader.load(collection).await?;
        report.state = machine.advance()?;

        Ok(())
    }
}

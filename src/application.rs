//! Application layer - the three ETL steps and what drives them
//!
//! `SchemaInitializer → BookCollector → BookLoader`, wired by `EtlPipeline`
//! and triggered by `EtlScheduler`.

pub mod collector;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod scheduler;
pub mod schema_initializer;

pub use collector::{BookCollector, StopReason};
pub use error::{PipelineError, RunFailure};
pub use loader::BookLoader;
pub use pipeline::{EtlPipeline, RunReport};
pub use scheduler::{EtlScheduler, RetryPolicy, SchedulerSummary};
pub use schema_initializer::SchemaInitializer;

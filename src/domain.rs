//! Domain module - core entities and the seams the pipeline talks through
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod book;
pub mod repositories;
pub mod run_state;
pub mod services;

pub use book::{BookCollection, BookRecord, StoredBook};
pub use repositories::BookRepository;
pub use run_state::{RunState, RunStateError, RunStateMachine};
pub use services::{PageFetch, PageSource};

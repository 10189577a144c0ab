//! Infrastructure layer: configuration, logging, HTTP, HTML parsing and storage

pub mod book_repository;
pub mod config;
pub mod database_connection;
pub mod http_client;
pub mod logging;
pub mod parsing;

// Re-export commonly used items
pub use book_repository::SqliteBookRepository;
pub use config::{AppConfig, ConfigManager};
pub use database_connection::DatabaseConnection;
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::init_logging_with_config;
pub use parsing::{BookListParser, ParsedPage, ParsingError, ParsingResult};

//! HTML parsing for search-result pages

pub mod book_list_parser;
pub mod error;

pub use book_list_parser::{BookListParser, ParsedPage};
pub use error::{ParsingError, ParsingResult};

/// Generic HTML parser trait for type-safe parsing
pub trait HtmlParser {
    type Output;

    /// Parse a full HTML document
    fn parse(&self, html: &str) -> ParsingResult<Self::Output>;
}

//! Book listing parser for search-result pages
//!
//! Each container matching the container selector is one candidate listing.
//! A candidate becomes a [`BookRecord`] only when all four fields are present
//! and non-blank; otherwise it is skipped.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

use super::{HtmlParser, ParsingError, ParsingResult};
use crate::domain::book::BookRecord;
use crate::infrastructure::config::BookListSelectors;

/// Result of parsing one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Containers matched on the page, well-formed or not
    pub candidates: usize,
    /// Well-formed listings in page order (may repeat titles)
    pub records: Vec<BookRecord>,
}

impl ParsedPage {
    pub fn skipped(&self) -> usize {
        self.candidates - self.records.len()
    }
}

pub struct BookListParser {
    container: Selector,
    title: Selector,
    author: Selector,
    price: Selector,
    rating: Selector,
}

impl BookListParser {
    /// Create a parser with the default (Amazon) selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&BookListSelectors::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &BookListSelectors) -> ParsingResult<Self> {
        Ok(Self {
            container: compile("container", &selectors.container)?,
            title: compile("title", &selectors.title)?,
            author: compile("author", &selectors.author)?,
            price: compile("price", &selectors.price)?,
            rating: compile("rating", &selectors.rating)?,
        })
    }

    pub fn parse_document(&self, document: &Html) -> ParsedPage {
        let mut page = ParsedPage::default();

        for (index, element) in document.select(&self.container).enumerate() {
            page.candidates += 1;
            match self.extract_record(&element) {
                Ok(record) => page.records.push(record),
                Err(e) => trace!("Skipping listing {}: {}", index, e),
            }
        }

        debug!(
            "Parsed {} listings from {} candidates",
            page.records.len(),
            page.candidates
        );
        page
    }

    fn extract_record(&self, element: &ElementRef) -> ParsingResult<BookRecord> {
        Ok(BookRecord {
            title: required(element, &self.title, "title")?,
            author: required(element, &self.author, "author")?,
            price: required(element, &self.price, "price")?,
            rating: required(element, &self.rating, "rating")?,
        })
    }
}

impl HtmlParser for BookListParser {
    type Output = ParsedPage;

    fn parse(&self, html: &str) -> ParsingResult<Self::Output> {
        let document = Html::parse_document(html);
        Ok(self.parse_document(&document))
    }
}

fn compile(field: &str, selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(field, selector, e))
}

fn required(element: &ElementRef, selector: &Selector, field: &'static str) -> ParsingResult<String> {
    element
        .select(selector)
        .next()
        .map(|e| normalize_text(&e.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .ok_or(ParsingError::RequiredFieldMissing { field })
}

/// Trim leading and trailing whitespace; inner spacing is kept as scraped
pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_string()
}

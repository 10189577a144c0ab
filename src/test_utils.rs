//! Test utilities for books-etl
//!
//! Stand-ins for the network and the datastore so pipeline behavior can be
//! checked without either, plus an HTML builder shaped like a real
//! search-results page.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::domain::book::{BookRecord, StoredBook};
use crate::domain::repositories::BookRepository;
use crate::domain::services::{PageFetch, PageSource};

/// Status returned once a scripted source runs out of responses
pub const EXHAUSTED_STATUS: u16 = 404;

enum Script {
    Sequence(Mutex<VecDeque<PageFetch>>),
    Repeat(PageFetch),
}

/// Page source that replays canned responses in call order.
pub struct ScriptedPageSource {
    script: Script,
    transport_error_on_call: Option<usize>,
    requested: Mutex<Vec<u32>>,
}

impl ScriptedPageSource {
    /// Serve `responses` one per call, then `404`.
    pub fn new(responses: Vec<PageFetch>) -> Self {
        Self {
            script: Script::Sequence(Mutex::new(responses.into())),
            transport_error_on_call: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(response: PageFetch) -> Self {
        Self {
            script: Script::Repeat(response),
            transport_error_on_call: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing(status: u16) -> Self {
        Self::repeating(PageFetch::Failed { status })
    }

    /// Like [`new`](Self::new), but call number `call` (1-based) fails at the transport level.
    pub fn with_transport_error_on(call: usize, responses: Vec<PageFetch>) -> Self {
        Self {
            transport_error_on_call: Some(call),
            ..Self::new(responses)
        }
    }

    /// Page numbers requested so far, in order
    pub fn requested_pages(&self) -> Vec<u32> {
        self.requested.lock().map(|pages| pages.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageSource for ScriptedPageSource {
    async fn fetch_page(&self, page: u32) -> Result<PageFetch> {
        let call = {
            let mut requested = self.requested.lock().map_err(|_| anyhow!("poisoned"))?;
            requested.push(page);
            requested.len()
        };

        if self.transport_error_on_call == Some(call) {
            return Err(anyhow!("connection reset while fetching page {page}"));
        }

        match &self.script {
            Script::Repeat(response) => Ok(response.clone()),
            Script::Sequence(queue) => Ok(queue
                .lock()
                .map_err(|_| anyhow!("poisoned"))?
                .pop_front()
                .unwrap_or(PageFetch::Failed {
                    status: EXHAUSTED_STATUS,
                })),
        }
    }
}

#[derive(Default)]
struct RecordingState {
    ensure_calls: usize,
    insert_calls: usize,
    rows: Vec<BookRecord>,
}

/// In-memory repository that records every call.
#[derive(Default)]
pub struct RecordingBookRepository {
    state: Mutex<RecordingState>,
    fail_schema: bool,
    fail_insert_at: Option<usize>,
}

impl RecordingBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_schema() -> Self {
        Self {
            fail_schema: true,
            ..Self::default()
        }
    }

    /// The insert with zero-based index `index` fails; earlier ones succeed.
    pub fn failing_insert_at(index: usize) -> Self {
        Self {
            fail_insert_at: Some(index),
            ..Self::default()
        }
    }

    pub fn ensure_calls(&self) -> usize {
        self.state.lock().map(|s| s.ensure_calls).unwrap_or_default()
    }

    /// Insert attempts, including failed ones
    pub fn insert_calls(&self) -> usize {
        self.state.lock().map(|s| s.insert_calls).unwrap_or_default()
    }

    /// Records that were successfully inserted, in order
    pub fn inserted(&self) -> Vec<BookRecord> {
        self.state.lock().map(|s| s.rows.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BookRepository for RecordingBookRepository {
    async fn ensure_table(&self) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| anyhow!("poisoned"))?;
        state.ensure_calls += 1;
        if self.fail_schema {
            return Err(anyhow!("permission denied for schema public"));
        }
        Ok(())
    }

    async fn insert_book(&self, book: &BookRecord) -> Result<i64> {
        let mut state = self.state.lock().map_err(|_| anyhow!("poisoned"))?;
        let index = state.insert_calls;
        state.insert_calls += 1;
        if self.fail_insert_at == Some(index) {
            return Err(anyhow!("connection lost"));
        }
        state.rows.push(book.clone());
        Ok(state.rows.len() as i64)
    }

    async fn list_books(&self) -> Result<Vec<StoredBook>> {
        let state = self.state.lock().map_err(|_| anyhow!("poisoned"))?;
        Ok(state
            .rows
            .iter()
            .enumerate()
            .map(|(i, book)| StoredBook {
                id: i as i64 + 1,
                title: book.title.clone(),
                authors: Some(book.author.clone()),
                price: Some(book.price.clone()),
                rating: Some(book.rating.clone()),
            })
            .collect())
    }

    async fn count_books(&self) -> Result<i64> {
        let state = self.state.lock().map_err(|_| anyhow!("poisoned"))?;
        Ok(state.rows.len() as i64)
    }
}

/// One listing on a generated search-results page
#[derive(Debug, Clone)]
pub struct Listing {
    pub title: String,
    pub author: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
}

impl Listing {
    pub fn valid(title: &str) -> Self {
        Self {
            title: title.to_string(),
            author: Some(format!("{title} Author")),
            price: Some("29.".to_string()),
            rating: Some("4.5 out of 5 stars".to_string()),
        }
    }

    pub fn without_author(mut self) -> Self {
        self.author = None;
        self
    }

    pub fn without_price(mut self) -> Self {
        self.price = None;
        self
    }

    pub fn without_rating(mut self) -> Self {
        self.rating = None;
        self
    }

    pub fn to_record(&self) -> Option<BookRecord> {
        Some(BookRecord::new(
            self.title.clone(),
            self.author.clone()?,
            self.price.clone()?,
            self.rating.clone()?,
        ))
    }

    fn to_html(&self) -> String {
        let mut html = String::from(r#"<div data-component-type="s-search-result" class="s-result-item s-asin">"#);
        html.push_str(&format!(
            r#"<h2><a class="a-link-normal"><span class="a-size-medium a-color-base a-text-normal">{}</span></a></h2>"#,
            self.title
        ));
        if let Some(author) = &self.author {
            html.push_str(&format!(r#"<div class="a-row"><span>by </span><a class="a-size-base a-link-normal">{author}</a></div>"#));
        }
        if let Some(rating) = &self.rating {
            html.push_str(&format!(r#"<i class="a-icon a-icon-star-small"><span class="a-icon-alt">{rating}</span></i>"#));
        }
        if let Some(price) = &self.price {
            html.push_str(&format!(
                r#"<span class="a-price"><span class="a-price-symbol">$</span><span class="a-price-whole">{price}</span><span class="a-price-fraction">99</span></span>"#
            ));
        }
        html.push_str("</div>");
        html
    }
}

/// Full search-results document containing `listings`
pub fn listing_page(listings: &[Listing]) -> String {
    let body: String = listings.iter().map(Listing::to_html).collect();
    format!(
        r#"<!doctype html><html><head><title>Amazon.com : data engineering books</title></head><body><div class="s-main-slot s-result-list">{body}</div></body></html>"#
    )
}

//! Book collector: pages through search results until it has enough titles
//!
//! Stops early, without error, when a page comes back with a non-success
//! status, when a page has no listings at all, or when the page ceiling is
//! reached. Whatever was gathered so far is returned.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::error::PipelineError;
use crate::domain::book::BookCollection;
use crate::domain::services::{PageFetch, PageSource};
use crate::infrastructure::config::defaults;
use crate::infrastructure::parsing::{BookListParser, HtmlParser};

/// Why the page loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    FailedStatus { page: u32, status: u16 },
    NoListings { page: u32 },
    PageLimit { max_pages: u32 },
}

pub struct BookCollector {
    source: Arc<dyn PageSource>,
    parser: BookListParser,
    max_pages: u32,
}

impl BookCollector {
    pub fn new(source: Arc<dyn PageSource>, parser: BookListParser) -> Self {
        Self {
            source,
            parser,
            max_pages: defaults::MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub async fn collect(&self, target_count: NonZeroUsize) -> Result<BookCollection, PipelineError> {
        self.collect_with_reason(target_count)
            .await
            .map(|(collection, _)| collection)
    }

    /// Like [`collect`](Self::collect), also reporting why paging stopped.
    pub async fn collect_with_reason(
        &self,
        target_count: NonZeroUsize,
    ) -> Result<(BookCollection, StopReason), PipelineError> {
        let target = target_count.get();
        let mut books = Vec::new();
        let mut seen_titles = HashSet::new();
        let mut page: u32 = 1;
        let mut reason = StopReason::TargetReached;

        while books.len() < target {
            if page > self.max_pages {
                reason = StopReason::PageLimit {
                    max_pages: self.max_pages,
                };
                break;
            }

            let fetched = self
                .source
                .fetch_page(page)
                .await
                .map_err(|source| PipelineError::Fetch { page, source })?;

            let body = match fetched {
                PageFetch::Success(body) => body,
                PageFetch::Failed { status } => {
                    reason = StopReason::FailedStatus { page, status };
                    break;
                }
            };

            let parsed = self.parser.parse(&body)?;
            if parsed.candidates == 0 {
                reason = StopReason::NoListings { page };
                break;
            }

            let before = books.len();
            for record in parsed.records {
                if seen_titles.insert(record.title.clone()) {
                    books.push(record);
                } else {
                    debug!("Skipping duplicate title: {}", record.title);
                }
            }
            debug!(
                "Page {}: {} candidates, {} new books ({} total)",
                page,
                parsed.candidates,
                books.len() - before,
                books.len()
            );

            page += 1;
        }

        match reason {
            StopReason::TargetReached => {}
            StopReason::FailedStatus { page, status } => warn!(
                "Failed to retrieve page {} (status {}), stopping with {} books",
                page,
                status,
                books.len()
            ),
            StopReason::NoListings { page } => {
                info!("Page {} has no listings, stopping with {} books", page, books.len())
            }
            StopReason::PageLimit { max_pages } => warn!(
                "Reached page limit {} with {} of {} books",
                max_pages,
                books.len(),
                target
            ),
        }

        let collection = BookCollection::bounded(books, target_count);
        info!("Collected {} books (target {})", collection.len(), target);
        Ok((collection, reason))
    }
}

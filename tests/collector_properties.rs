//! Property tests for the collection bound and title uniqueness
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use books_etl::application::BookCollector;
use books_etl::domain::{BookCollection, BookRecord, PageFetch};
use books_etl::infrastructure::BookListParser;
use books_etl::test_utils::{Listing, ScriptedPageSource, listing_page};
use proptest::prelude::*;

fn titles_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    // Small title alphabet so duplicates within and across pages are common
    let title = prop::sample::select(vec!["A", "B", "C", "D", "E", "F", "G", "H"]).prop_map(String::from);
    prop::collection::vec(prop::collection::vec(title, 0..6), 0..5)
}

fn collect_blocking(pages: &[Vec<String>], target: NonZeroUsize) -> BookCollection {
    let responses = pages
        .iter()
        .map(|titles| {
            let listings: Vec<Listing> = titles.iter().map(|t| Listing::valid(t)).collect();
            PageFetch::Success(listing_page(&listings))
        })
        .collect();
    let collector = BookCollector::new(
        Arc::new(ScriptedPageSource::new(responses)),
        BookListParser::new().unwrap(),
    );

    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(collector.collect(target))
        .unwrap()
}

proptest! {
    #[test]
    fn collected_titles_are_unique_and_bounded(pages in titles_strategy(), target in 1usize..12) {
        let target = NonZeroUsize::new(target).unwrap();
        let collection = collect_blocking(&pages, target);

        prop_assert!(collection.len() <= target.get());
        let unique: HashSet<&str> = collection.titles().into_iter().collect();
        prop_assert_eq!(unique.len(), collection.len());
    }

    #[test]
    fn bounded_keeps_first_occurrence_order(titles in prop::collection::vec("[a-d]", 0..20), target in 1usize..25) {
        let records: Vec<BookRecord> = titles
            .iter()
            .map(|t| BookRecord::new(t.as_str(), "author", "10.", "4.0 out of 5 stars"))
            .collect();
        let collection = BookCollection::bounded(records, NonZeroUsize::new(target).unwrap());

        let mut expected = Vec::new();
        let mut seen = HashSet::new();
        for title in titles.iter().take(target) {
            if seen.insert(title.as_str()) {
                expected.push(title.as_str());
            }
        }
        prop_assert_eq!(collection.titles(), expected);
    }
}

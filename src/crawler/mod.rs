//! Crawler module for fetching and walking forum pages
//!
//! This module contains the core crawling logic, including:
//! - Global request spacing
//! - HTTP fetching with retry logic
//! - HTML extraction with configurable selectors
//! - The three-level traversal that drives persistence

mod coordinator;
mod fetcher;
mod parser;
mod rate_limiter;

pub use coordinator::{run_crawl, run_crawl_until, CrawlOutcome, Crawler};
pub use fetcher::{build_http_client, FetchError, FetchFailure, FetchedFile, Fetcher};
pub use parser::{
    LinkEntry, PageExtractor, PostEntry, PostListPage, SelectorExtractor, ThreadListPage,
    ThreadMeta,
};
pub use rate_limiter::RateLimiter;

//! Crawl statistics
//!
//! Two views of the same data:
//! - [`CrawlStats`] counts what the current run did and is logged as progress
//! - [`load_statistics`] reads totals back out of the database for `--stats`

use crate::output::summary::OutputResult;
use crate::storage::{ForumStore, ForumTotals};
use std::time::{Duration, Instant};

/// A progress snapshot is logged after this many saved threads
pub const THREAD_REPORT_INTERVAL: u64 = 10;

/// A progress snapshot is logged after this many inserted posts
pub const POST_REPORT_INTERVAL: u64 = 100;

/// Counters for a single crawl run
///
/// Reset at the start of every run. They only report on the crawl and never
/// feed back into what gets fetched.
#[derive(Debug, Clone)]
pub struct CrawlStats {
    pub subforums: u64,
    pub threads: u64,
    pub posts: u64,
    pub files: u64,
    pub pages_fetched: u64,
    pub fetch_failures: u64,
    pub skipped: u64,
    started: Instant,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self {
            subforums: 0,
            threads: 0,
            posts: 0,
            files: 0,
            pages_fetched: 0,
            fetch_failures: 0,
            skipped: 0,
            started: Instant::now(),
        }
    }

    /// Counts a saved thread and reports whether a snapshot is due
    pub fn record_thread(&mut self) -> bool {
        self.threads += 1;
        self.threads % THREAD_REPORT_INTERVAL == 0
    }

    /// Counts an inserted post and reports whether a snapshot is due
    pub fn record_post(&mut self) -> bool {
        self.posts += 1;
        self.posts % POST_REPORT_INTERVAL == 0
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Logs a snapshot of the counters
    ///
    /// `users` comes from the store, since distinct users can only be known
    /// after deduplication.
    pub fn log_snapshot(&self, heading: &str, users: u64) {
        tracing::info!(
            "{}: {}s elapsed, {} subforums, {} threads, {} posts, {} users, {} files, \
             {} pages fetched, {} fetch failures, {} skipped records",
            heading,
            self.elapsed().as_secs(),
            self.subforums,
            self.threads,
            self.posts,
            users,
            self.files,
            self.pages_fetched,
            self.fetch_failures,
            self.skipped
        );
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Database totals shown by `--stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStatistics {
    pub totals: ForumTotals,

    /// Subforums with no parent
    pub root_subforums: u64,
}

/// Loads statistics from storage
///
/// # Returns
///
/// * `Ok(DatabaseStatistics)` - Successfully loaded statistics
/// * `Err(OutputError)` - Failed to query statistics
pub fn load_statistics(store: &dyn ForumStore) -> OutputResult<DatabaseStatistics> {
    let totals = store.forum_totals()?;
    let root_subforums = store.list_subforums(None)?.len() as u64;

    Ok(DatabaseStatistics {
        totals,
        root_subforums,
    })
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &DatabaseStatistics) {
    println!("=== Forum Statistics ===\n");

    println!("Overview:");
    println!(
        "  Subforums: {} ({} at the top level)",
        stats.totals.subforums, stats.root_subforums
    );
    println!("  Threads: {}", stats.totals.threads);
    println!("  Posts: {}", stats.totals.posts);
    println!("  Users: {}", stats.totals.users);
    println!("  Files: {}", stats.totals.files);
    println!();

    let per_thread = if stats.totals.threads > 0 {
        stats.totals.posts as f64 / stats.totals.threads as f64
    } else {
        0.0
    };
    println!("Average posts per thread: {:.1}", per_thread);
}

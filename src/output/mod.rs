//! Output module for crawl progress and database reports
//!
//! This module handles:
//! - Run counters logged while the crawl is in progress
//! - Database statistics for `--stats`
//! - The Markdown forum report for `--export-summary`

mod markdown;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, CrawlStats, DatabaseStatistics};
pub use summary::{ForumSummary, OutputError, OutputResult, SubforumSummary, ThreadSummary};

use crate::storage::ForumStore;

/// Builds the forum report from the store's read accessors
///
/// Walks root subforums in insertion order and collects thread, post and
/// user counts for each, plus per-thread post and user counts.
///
/// # Returns
///
/// * `Ok(ForumSummary)` - Successfully generated summary
/// * `Err(OutputError)` - A read query failed
pub fn generate_summary(store: &dyn ForumStore) -> OutputResult<ForumSummary> {
    let totals = store.forum_totals()?;

    let mut subforums = Vec::new();
    for subforum in store.list_subforums(None)? {
        let mut thread_details = Vec::new();
        for thread in store.list_threads(&subforum.url)? {
            thread_details.push(ThreadSummary {
                posts: store.count_posts_in_thread(&thread.url)?,
                users: store.count_users_in_thread(&thread.url)?,
                title: thread.title,
                url: thread.url,
                creator: thread.creator,
                created_at: thread.created_at,
            });
        }

        subforums.push(SubforumSummary {
            threads: store.count_threads_in_subforum(&subforum.url)?,
            posts: store.count_posts_in_subforum(&subforum.url)?,
            users: store.count_users_in_subforum(&subforum.url)?,
            title: subforum.title,
            url: subforum.url,
            thread_details,
        });
    }

    Ok(ForumSummary {
        generated_at: chrono::Utc::now().to_rfc3339(),
        totals,
        subforums,
    })
}

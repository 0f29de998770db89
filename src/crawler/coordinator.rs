//! Crawl traversal - walks the forum top-down and persists what it finds
//!
//! The crawl has three nested levels:
//! - Level 1: the forum root page lists subforums
//! - Level 2: each subforum is a chain of thread-list pages
//! - Level 3: each thread is a chain of post-list pages
//!
//! Pages in a chain are fetched and saved strictly in link order. A page that
//! cannot be fetched after all retries ends only the chain it belongs to.

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{LinkEntry, PageExtractor, SelectorExtractor, ThreadMeta};
use crate::output::CrawlStats;
use crate::storage::{ForumStore, SqliteStorage};
use crate::url::resolve_href;
use crate::Result;
use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Creator recorded when a thread's first page yields none
const UNKNOWN_CREATOR: &str = "Unknown";

/// Stored as `posted_at` when a post carries no date
///
/// The post's date is part of its deduplication key, so it must not be a
/// value that changes between crawls.
const UNDATED: &str = "";

/// Filename used when an attachment has neither link text nor a path segment
const FALLBACK_FILENAME: &str = "attachment";

/// Crawl context: everything one crawl run needs, with no global state
pub struct Crawler<S: ForumStore = SqliteStorage, E: PageExtractor = SelectorExtractor> {
    store: S,
    fetcher: Fetcher,
    extractor: E,
    stats: CrawlStats,
    base_url: Url,
    subforum_delay: Duration,
    download_attachments: bool,
}

impl Crawler {
    /// Creates a crawler backed by the configured SQLite database
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Storage opened, selectors compiled and client built
    /// * `Err(ScraperError)` - Failed to initialize
    pub fn new(config: &Config) -> Result<Self> {
        let store = SqliteStorage::new(Path::new(&config.output.database_path))?;
        let extractor = SelectorExtractor::new(&config.selectors)?;
        let fetcher = Fetcher::from_config(config)?;

        Self::with_parts(config, store, fetcher, extractor)
    }
}

impl<S: ForumStore, E: PageExtractor> Crawler<S, E> {
    /// Creates a crawler from already-built parts
    pub fn with_parts(
        config: &Config,
        store: S,
        fetcher: Fetcher,
        extractor: E,
    ) -> Result<Self> {
        let base_url = Url::parse(&config.forum.base_url)?;

        Ok(Self {
            store,
            fetcher,
            extractor,
            stats: CrawlStats::new(),
            base_url,
            subforum_delay: Duration::from_millis(config.crawler.subforum_delay),
            download_attachments: config.crawler.download_attachments,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Counters for the most recent (or current) run
    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// Consumes the crawler and hands back its store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs one full crawl of the forum
    ///
    /// Only a failure to fetch the root page is returned as an error; every
    /// failure below it is logged and counted, and the crawl moves on.
    pub async fn run(&mut self) -> Result<()> {
        self.stats = CrawlStats::new();
        let root_url = self.base_url.clone();
        tracing::info!("Starting crawl of {}", root_url);

        let html = match self.fetcher.fetch(root_url.as_str()).await {
            Ok(html) => {
                self.stats.pages_fetched += 1;
                html
            }
            Err(e) => {
                self.stats.fetch_failures += 1;
                tracing::error!("Failed to fetch forum root: {}", e);
                return Err(e.into());
            }
        };

        let entries = self.extractor.subforums(&html);
        tracing::info!("Found {} subforums", entries.len());

        let total = entries.len();
        for (index, entry) in entries.into_iter().enumerate() {
            let Some((title, url)) = self.resolve_entry(entry, "subforum") else {
                continue;
            };

            match self.store.upsert_subforum(&title, url.as_str(), None) {
                Ok(record) => {
                    self.stats.subforums += 1;
                    tracing::info!("Added subforum: {} (id {})", record.title, record.id);
                }
                Err(e) => {
                    self.stats.skipped += 1;
                    tracing::error!("Failed to save subforum {}: {}", url, e);
                    continue;
                }
            }

            self.crawl_subforum(&url).await;

            if index + 1 < total && !self.subforum_delay.is_zero() {
                tracing::debug!("Waiting {:?} before next subforum", self.subforum_delay);
                tokio::time::sleep(self.subforum_delay).await;
            }
        }

        self.report("Crawl complete");
        Ok(())
    }

    /// Level 2: follows the thread-list chain of one subforum
    async fn crawl_subforum(&mut self, subforum_url: &Url) {
        let mut visited = HashSet::new();
        let mut next = Some(subforum_url.clone());

        while let Some(page_url) = next.take() {
            if !visited.insert(page_url.to_string()) {
                tracing::warn!("Pagination loops back to {}, stopping", page_url);
                break;
            }

            let Some(html) = self.fetch_page(&page_url).await else {
                break;
            };

            let page = self.extractor.thread_list(&html);
            tracing::info!("Found {} threads on {}", page.threads.len(), page_url);

            for entry in page.threads {
                let Some((title, thread_url)) = self.resolve_entry(entry, "thread") else {
                    continue;
                };

                let (creator, created_at) = self.thread_meta(&thread_url).await;

                if let Err(e) = self.store.upsert_thread(
                    subforum_url.as_str(),
                    &title,
                    thread_url.as_str(),
                    &creator,
                    &created_at,
                ) {
                    self.stats.skipped += 1;
                    tracing::error!("Failed to save thread {}: {}", thread_url, e);
                    continue;
                }
                tracing::info!("Added thread: {} ({})", title, created_at);

                let snapshot_due = self.stats.record_thread();
                self.crawl_thread(&thread_url).await;
                if snapshot_due {
                    self.report("Progress");
                }
            }

            next = self.next_page(page.next_page.as_deref());
        }
    }

    /// Level 3: follows the post-list chain of one thread
    async fn crawl_thread(&mut self, thread_url: &Url) {
        let mut visited = HashSet::new();
        let mut next = Some(thread_url.clone());

        while let Some(page_url) = next.take() {
            if !visited.insert(page_url.to_string()) {
                tracing::warn!("Pagination loops back to {}, stopping", page_url);
                break;
            }

            let Some(html) = self.fetch_page(&page_url).await else {
                break;
            };

            let page = self.extractor.post_list(&html);
            tracing::info!("Found {} posts on {}", page.posts.len(), page_url);

            for post in page.posts {
                let (Some(username), Some(comment)) = (post.username, post.comment) else {
                    self.stats.skipped += 1;
                    tracing::warn!("Skipping post without username or content on {}", page_url);
                    continue;
                };

                let posted_at = post.posted_at.unwrap_or_else(|| UNDATED.to_string());
                let user_url = post
                    .profile_href
                    .and_then(|href| resolve_href(&self.base_url, &href).ok());

                let inserted = self.store.insert_post(
                    thread_url.as_str(),
                    &username,
                    &comment,
                    &posted_at,
                    user_url.as_ref().map(Url::as_str),
                );

                match inserted {
                    Ok(Some(post_id)) => {
                        if self.stats.record_post() {
                            self.report("Progress");
                        }
                        if self.download_attachments && !post.attachments.is_empty() {
                            self.save_attachments(post_id, post.attachments).await;
                        }
                    }
                    Ok(None) => {
                        tracing::debug!("Duplicate post by {} in {} ignored", username, thread_url);
                    }
                    Err(e) => {
                        self.stats.skipped += 1;
                        tracing::error!("Failed to save post by {} in {}: {}", username, thread_url, e);
                    }
                }
            }

            next = self.next_page(page.next_page.as_deref());
        }
    }

    /// Reads creator and creation date from a thread's first page
    ///
    /// Falls back to "Unknown" and the current time when the page cannot be
    /// fetched or does not carry them.
    async fn thread_meta(&mut self, thread_url: &Url) -> (String, String) {
        let meta = match self.fetch_page(thread_url).await {
            Some(html) => self.extractor.thread_meta(&html),
            None => ThreadMeta::default(),
        };

        let creator = meta.creator.unwrap_or_else(|| UNKNOWN_CREATOR.to_string());
        let created_at = meta
            .created_at
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());
        (creator, created_at)
    }

    async fn save_attachments(&mut self, post_id: i64, attachments: Vec<LinkEntry>) {
        for attachment in attachments {
            let Some(href) = attachment.href else {
                continue;
            };
            let url = match resolve_href(&self.base_url, &href) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping attachment '{}': {}", href, e);
                    continue;
                }
            };

            let file = match self.fetcher.fetch_file(url.as_str()).await {
                Ok(file) => file,
                Err(e) => {
                    self.stats.fetch_failures += 1;
                    tracing::warn!("Failed to download attachment: {}", e);
                    continue;
                }
            };

            let filename = attachment
                .title
                .or_else(|| last_path_segment(&url))
                .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

            match self
                .store
                .insert_file(post_id, &filename, file.mime_type.as_deref(), &file.bytes)
            {
                Ok(_) => {
                    self.stats.files += 1;
                    tracing::info!("Saved attachment {} ({} bytes)", filename, file.bytes.len());
                }
                Err(e) => tracing::error!("Failed to save attachment {}: {}", url, e),
            }
        }
    }

    /// Fetches one page, logging and counting the outcome
    async fn fetch_page(&mut self, url: &Url) -> Option<String> {
        match self.fetcher.fetch(url.as_str()).await {
            Ok(html) => {
                self.stats.pages_fetched += 1;
                Some(html)
            }
            Err(e) => {
                self.stats.fetch_failures += 1;
                tracing::error!("{}", e);
                None
            }
        }
    }

    /// Checks that a subforum or thread link has both parts and resolves it
    fn resolve_entry(&mut self, entry: LinkEntry, kind: &str) -> Option<(String, Url)> {
        let Some(title) = entry.title else {
            self.stats.skipped += 1;
            tracing::warn!("Skipping {} with empty title", kind);
            return None;
        };
        let Some(href) = entry.href else {
            self.stats.skipped += 1;
            tracing::warn!("Skipping {} \"{}\" with no URL", kind, title);
            return None;
        };

        match resolve_href(&self.base_url, &href) {
            Ok(url) => Some((title, url)),
            Err(e) => {
                self.stats.skipped += 1;
                tracing::warn!("Skipping {} \"{}\": {}", kind, title, e);
                None
            }
        }
    }

    fn next_page(&self, href: Option<&str>) -> Option<Url> {
        let href = href?;
        match resolve_href(&self.base_url, href) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Ignoring next page link '{}': {}", href, e);
                None
            }
        }
    }

    fn report(&self, heading: &str) {
        let users = self.store.count_users().unwrap_or_else(|e| {
            tracing::warn!("Failed to count users: {}", e);
            0
        });
        self.stats.log_snapshot(heading, users);
    }
}

fn last_path_segment(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
}

/// How a crawl session ended
#[derive(Debug, Clone)]
pub enum CrawlOutcome {
    /// Every subforum on the root page was processed
    Completed(CrawlStats),

    /// The shutdown signal fired first; records saved so far are committed
    Interrupted(CrawlStats),
}

impl CrawlOutcome {
    pub fn stats(&self) -> &CrawlStats {
        match self {
            CrawlOutcome::Completed(stats) | CrawlOutcome::Interrupted(stats) => stats,
        }
    }
}

/// Runs one crawl session: open the store, crawl until done or until
/// `shutdown` resolves, then close the store
///
/// When `shutdown` wins, the crawl is dropped at its current await point.
/// Single-record writes are atomic, so nothing half-written is left behind.
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - The crawl finished or was interrupted
/// * `Err(ScraperError)` - Setup failed or the forum root could not be fetched
pub async fn run_crawl_until<F>(config: &Config, shutdown: F) -> Result<CrawlOutcome>
where
    F: Future<Output = ()>,
{
    let mut crawler = Crawler::new(config)?;

    let finished = tokio::select! {
        result = crawler.run() => Some(result),
        _ = shutdown => None,
    };

    let stats = crawler.stats().clone();
    crawler.into_store().close()?;

    match finished {
        Some(Ok(())) => Ok(CrawlOutcome::Completed(stats)),
        Some(Err(e)) => Err(e),
        None => Ok(CrawlOutcome::Interrupted(stats)),
    }
}

/// Runs a complete crawl with no shutdown signal
///
/// # Returns
///
/// * `Ok(CrawlStats)` - Counters of the finished run
/// * `Err(ScraperError)` - Setup failed or the forum root could not be fetched
pub async fn run_crawl(config: &Config) -> Result<CrawlStats> {
    let outcome = run_crawl_until(config, std::future::pending::<()>()).await?;
    Ok(outcome.stats().clone())
}

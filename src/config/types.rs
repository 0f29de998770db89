use serde::Deserialize;

/// Main configuration structure for Forum-Scraper
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub forum: ForumConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// The forum being crawled
#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    /// Root page listing the subforums; also the base for resolving hrefs
    #[serde(rename = "base-url")]
    pub base_url: String,
}

/// Crawler pacing and retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum time between any two requests (milliseconds)
    #[serde(rename = "delay-between-requests")]
    pub delay_between_requests: u64,

    /// Pause after finishing a subforum before starting the next (milliseconds)
    #[serde(rename = "subforum-delay", default)]
    pub subforum_delay: u64,

    /// Attempts per page before giving up
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base backoff between attempts; attempt `n` waits `n * retry-delay` (milliseconds)
    #[serde(rename = "retry-delay")]
    pub retry_delay: u64,

    /// Fetch and store post attachments
    #[serde(rename = "download-attachments", default)]
    pub download_attachments: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

/// CSS selectors used to pull records out of forum pages
///
/// Defaults match vBulletin-style markup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Subforum links on the root page
    #[serde(rename = "subforum-link")]
    pub subforum_link: String,

    /// Thread links on a thread-list page
    #[serde(rename = "thread-link")]
    pub thread_link: String,

    /// "Next page" link on thread-list and post-list pages
    #[serde(rename = "next-page")]
    pub next_page: String,

    /// One element per post on a post-list page
    #[serde(rename = "post-container")]
    pub post_container: String,

    /// Author name, relative to the post container
    #[serde(rename = "post-username")]
    pub post_username: String,

    /// Post body, relative to the post container
    #[serde(rename = "post-content")]
    pub post_content: String,

    /// Post timestamp, relative to the post container
    #[serde(rename = "post-date")]
    pub post_date: String,

    /// Thread creator on the thread's first page
    #[serde(rename = "thread-author")]
    pub thread_author: String,

    /// Thread creation date on the thread's first page
    #[serde(rename = "thread-date")]
    pub thread_date: String,

    /// Attachment links, relative to the post container
    #[serde(rename = "attachment-link")]
    pub attachment_link: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            subforum_link: "h2.forumtitle a".to_string(),
            thread_link: "h3.threadtitle a".to_string(),
            next_page: ".pagination .next a".to_string(),
            post_container: ".postcontainer".to_string(),
            post_username: ".username".to_string(),
            post_content: ".postcontent".to_string(),
            post_date: ".postdate".to_string(),
            thread_author: ".postauthor".to_string(),
            thread_date: ".postdate".to_string(),
            attachment_link: ".attachments a".to_string(),
        }
    }
}

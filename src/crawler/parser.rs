//! HTML extraction for the three forum page types
//!
//! This module turns fetched markup into typed records:
//! - Subforum links on the root page
//! - Thread links and the "next page" link on a thread-list page
//! - Creator and creation date on a thread's first page
//! - Posts and the "next page" link on a post-list page
//!
//! Hrefs are returned exactly as they appear in the markup; the traversal
//! resolves them against the forum base URL.

use crate::config::SelectorConfig;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};

/// A titled link (subforum, thread or attachment)
///
/// Either part may be missing when the markup is malformed; the caller
/// decides whether to skip the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub title: Option<String>,
    pub href: Option<String>,
}

/// Contents of one thread-list page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadListPage {
    pub threads: Vec<LinkEntry>,
    pub next_page: Option<String>,
}

/// Metadata found on a thread's first page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadMeta {
    pub creator: Option<String>,
    pub created_at: Option<String>,
}

/// One post as found on a post-list page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostEntry {
    pub username: Option<String>,
    pub comment: Option<String>,
    pub posted_at: Option<String>,
    pub profile_href: Option<String>,
    pub attachments: Vec<LinkEntry>,
}

/// Contents of one post-list page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostListPage {
    pub posts: Vec<PostEntry>,
    pub next_page: Option<String>,
}

/// Turns page markup into records, one method per page type
pub trait PageExtractor {
    /// Subforum links on the forum root page, in document order
    fn subforums(&self, html: &str) -> Vec<LinkEntry>;

    /// Thread links and pagination on a thread-list page
    fn thread_list(&self, html: &str) -> ThreadListPage;

    /// Creator and creation date from a thread's first page
    fn thread_meta(&self, html: &str) -> ThreadMeta;

    /// Posts and pagination on a post-list page
    fn post_list(&self, html: &str) -> PostListPage;
}

/// [`PageExtractor`] driven by configurable CSS selectors
#[derive(Debug)]
pub struct SelectorExtractor {
    subforum_link: Selector,
    thread_link: Selector,
    next_page: Selector,
    post_container: Selector,
    post_username: Selector,
    post_content: Selector,
    post_date: Selector,
    thread_author: Selector,
    thread_date: Selector,
    attachment_link: Selector,
    anchor: Selector,
}

impl SelectorExtractor {
    /// Compiles every selector in the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(SelectorExtractor)` - All selectors parsed
    /// * `Err(ConfigError::InvalidSelector)` - A selector did not parse
    pub fn new(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            subforum_link: compile("subforum-link", &config.subforum_link)?,
            thread_link: compile("thread-link", &config.thread_link)?,
            next_page: compile("next-page", &config.next_page)?,
            post_container: compile("post-container", &config.post_container)?,
            post_username: compile("post-username", &config.post_username)?,
            post_content: compile("post-content", &config.post_content)?,
            post_date: compile("post-date", &config.post_date)?,
            thread_author: compile("thread-author", &config.thread_author)?,
            thread_date: compile("thread-date", &config.thread_date)?,
            attachment_link: compile("attachment-link", &config.attachment_link)?,
            anchor: compile("anchor", "a[href]")?,
        })
    }

    fn next_page_href(&self, document: &Html) -> Option<String> {
        document
            .select(&self.next_page)
            .find_map(|element| non_empty(element.value().attr("href")))
    }

    fn post_entry(&self, post: ElementRef<'_>) -> PostEntry {
        let username_element = post.select(&self.post_username).next();

        // The profile link is either the username element itself or an anchor inside it
        let profile_href = username_element.and_then(|element| {
            non_empty(element.value().attr("href")).or_else(|| {
                element
                    .select(&self.anchor)
                    .find_map(|a| non_empty(a.value().attr("href")))
            })
        });

        let attachments = post
            .select(&self.attachment_link)
            .map(link_entry)
            .collect();

        PostEntry {
            username: username_element.and_then(element_text),
            comment: first_text(post, &self.post_content),
            posted_at: first_text(post, &self.post_date),
            profile_href,
            attachments,
        }
    }
}

impl PageExtractor for SelectorExtractor {
    fn subforums(&self, html: &str) -> Vec<LinkEntry> {
        let document = Html::parse_document(html);
        document.select(&self.subforum_link).map(link_entry).collect()
    }

    fn thread_list(&self, html: &str) -> ThreadListPage {
        let document = Html::parse_document(html);
        ThreadListPage {
            threads: document.select(&self.thread_link).map(link_entry).collect(),
            next_page: self.next_page_href(&document),
        }
    }

    fn thread_meta(&self, html: &str) -> ThreadMeta {
        let document = Html::parse_document(html);
        let root = document.root_element();
        ThreadMeta {
            creator: first_text(root, &self.thread_author),
            created_at: first_text(root, &self.thread_date),
        }
    }

    fn post_list(&self, html: &str) -> PostListPage {
        let document = Html::parse_document(html);
        PostListPage {
            posts: document
                .select(&self.post_container)
                .map(|post| self.post_entry(post))
                .collect(),
            next_page: self.next_page_href(&document),
        }
    }
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })
}

fn link_entry(element: ElementRef<'_>) -> LinkEntry {
    LinkEntry {
        title: element_text(element),
        href: non_empty(element.value().attr("href")),
    }
}

/// Trimmed text content of an element, `None` when blank
fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).next().and_then(element_text)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

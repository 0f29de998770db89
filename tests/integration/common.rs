//! Shared fixtures: configuration and forum page builders

use forum_scraper::config::{
    Config, CrawlerConfig, ForumConfig, OutputConfig, SelectorConfig, UserAgentConfig,
};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER_AGENT: &str = "TestBot/1.0.0 (+https://example.com/contact; test@example.com)";

/// Creates a test configuration pointing at the mock server's root page
pub fn create_test_config(server: &MockServer, db_path: &Path) -> Config {
    Config {
        forum: ForumConfig {
            base_url: format!("{}/", server.uri()),
        },
        crawler: CrawlerConfig {
            delay_between_requests: 1, // Very short for testing
            subforum_delay: 1,
            max_retries: 2,
            retry_delay: 10,
            download_attachments: false,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            summary_path: db_path
                .with_file_name("summary.md")
                .to_string_lossy()
                .into_owned(),
        },
        selectors: SelectorConfig::default(),
    }
}

/// Absolute URL of `path` on the mock server
pub fn url_of(server: &MockServer, path: &str) -> String {
    format!("{}{}", server.uri(), path)
}

/// Serves `body` as HTML for GET `route`
pub async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serves `body` for GET `route` and expects exactly `times` requests
pub async fn mount_page_expecting(server: &MockServer, route: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(times)
        .mount(server)
        .await;
}

/// Answers every GET `route` with `status`
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub fn root_page(subforums: &[(&str, &str)]) -> String {
    let links: String = subforums
        .iter()
        .map(|(title, href)| {
            format!(r#"<h2 class="forumtitle"><a href="{href}">{title}</a></h2>"#)
        })
        .collect();
    format!("<html><body>{links}</body></html>")
}

pub fn thread_list_page(threads: &[(&str, &str)], next: Option<&str>) -> String {
    let links: String = threads
        .iter()
        .map(|(title, href)| {
            format!(r#"<h3 class="threadtitle"><a href="{href}">{title}</a></h3>"#)
        })
        .collect();
    format!("<html><body>{links}{}</body></html>", pagination(next))
}

/// A post as it appears on a post-list page
///
/// A `None` username or an empty `posted_at` leaves that element out.
pub struct TestPost<'a> {
    pub username: Option<&'a str>,
    pub comment: &'a str,
    pub posted_at: &'a str,
    pub attachment: Option<(&'a str, &'a str)>,
}

impl<'a> TestPost<'a> {
    pub fn new(username: &'a str, comment: &'a str, posted_at: &'a str) -> Self {
        Self {
            username: Some(username),
            comment,
            posted_at,
            attachment: None,
        }
    }
}

pub fn post_page(posts: &[TestPost<'_>], next: Option<&str>) -> String {
    let containers: String = posts
        .iter()
        .map(|post| {
            let author = post
                .username
                .map(|name| {
                    format!(
                        r#"<div class="postauthor"><a class="username" href="/members/{name}">{name}</a></div>"#
                    )
                })
                .unwrap_or_default();
            let attachment = post
                .attachment
                .map(|(name, href)| {
                    format!(r#"<div class="attachments"><a href="{href}">{name}</a></div>"#)
                })
                .unwrap_or_default();
            let date = if post.posted_at.is_empty() {
                String::new()
            } else {
                format!(r#"<span class="postdate">{}</span>"#, post.posted_at)
            };
            format!(
                r#"<div class="postcontainer">{author}{date}<div class="postcontent">{}</div>{attachment}</div>"#,
                post.comment
            )
        })
        .collect();
    format!("<html><body>{containers}{}</body></html>", pagination(next))
}

fn pagination(next: Option<&str>) -> String {
    match next {
        Some(href) => format!(
            r#"<div class="pagination"><span class="next"><a href="{href}">Next</a></span></div>"#
        ),
        None => String::new(),
    }
}

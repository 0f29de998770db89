//! Integration tests for the crawler
//!
//! These tests serve a small forum from wiremock and check what ends up in
//! the SQLite database after a full crawl.

use crate::common::{
    create_test_config, mount_page, mount_page_expecting, mount_status, post_page, root_page,
    thread_list_page, url_of, TestPost,
};
use forum_scraper::crawler::{run_crawl, run_crawl_until, CrawlOutcome, Crawler};
use forum_scraper::output::generate_summary;
use forum_scraper::storage::{ForumStore, SqliteStorage};
use forum_scraper::ScraperError;
use wiremock::matchers::{method, path};
use std::time::Duration;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn open_db(dir: &tempfile::TempDir) -> SqliteStorage {
    SqliteStorage::new(&dir.path().join("forum.db")).expect("Failed to open database")
}

/// Root with two subforums; "General" has one thread with two posts
async fn mount_small_forum(server: &MockServer) {
    mount_page(
        server,
        "/",
        root_page(&[("General", "/f1"), ("Off-topic", "/f2")]),
    )
    .await;
    mount_page(server, "/f1", thread_list_page(&[("Hello", "/t1")], None)).await;
    mount_page(server, "/f2", thread_list_page(&[], None)).await;
    mount_page(
        server,
        "/t1",
        post_page(
            &[
                TestPost::new("alice", "Hi everyone", "2024-01-01T10:00:00Z"),
                TestPost::new("bob", "Welcome!", "2024-01-01T11:00:00Z"),
            ],
            None,
        ),
    )
    .await;
}

#[tokio::test]
async fn test_full_crawl_small_forum() {
    let mock_server = MockServer::start().await;
    mount_small_forum(&mock_server).await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    let stats = run_crawl(&config).await.expect("Crawl should succeed");
    assert_eq!(stats.subforums, 2);
    assert_eq!(stats.threads, 1);
    assert_eq!(stats.posts, 2);
    assert_eq!(stats.fetch_failures, 0);

    let store = open_db(&temp_dir);

    // Two root subforums in document order with distinct ids
    let subforums = store.list_subforums(None).unwrap();
    assert_eq!(subforums.len(), 2);
    assert_eq!(subforums[0].title, "General");
    assert_eq!(subforums[0].url, url_of(&mock_server, "/f1"));
    assert_eq!(subforums[1].title, "Off-topic");
    assert_ne!(subforums[0].id, subforums[1].id);
    assert!(subforums.iter().all(|s| s.parent_id.is_none()));

    // The thread is stored under its absolute URL with first-page metadata
    let threads = store.list_threads(&subforums[0].url).unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].title, "Hello");
    assert_eq!(threads[0].url, url_of(&mock_server, "/t1"));
    assert_eq!(threads[0].creator, "alice");
    assert_eq!(threads[0].created_at, "2024-01-01T10:00:00Z");
    assert!(store.list_threads(&subforums[1].url).unwrap().is_empty());

    let posts = store.list_posts(&threads[0].url).unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].username, "alice");
    assert_eq!(posts[0].comment, "Hi everyone");
    assert_eq!(
        posts[0].user_url.as_deref(),
        Some(url_of(&mock_server, "/members/alice").as_str())
    );
    assert_eq!(posts[1].username, "bob");

    let alice = store.get_user("alice").unwrap().expect("alice is tracked");
    assert_eq!(alice.post_count, 1);
    assert_eq!(alice.first_seen, "2024-01-01T10:00:00Z");
    assert_eq!(store.count_users().unwrap(), 2);
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let mock_server = MockServer::start().await;
    mount_small_forum(&mock_server).await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    run_crawl(&config).await.expect("First crawl should succeed");
    let first = open_db(&temp_dir).forum_totals().unwrap();

    let second_stats = run_crawl(&config).await.expect("Second crawl should succeed");
    let store = open_db(&temp_dir);
    let second = store.forum_totals().unwrap();

    assert_eq!(first, second);
    assert_eq!(second.posts, 2);
    // Duplicate posts are not counted as new
    assert_eq!(second_stats.posts, 0);
    assert_eq!(store.get_user("alice").unwrap().unwrap().post_count, 1);
}

#[tokio::test]
async fn test_recrawl_of_undated_post_is_idempotent() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", root_page(&[("General", "/f1")])).await;
    mount_page(&mock_server, "/f1", thread_list_page(&[("Hello", "/t1")], None)).await;
    mount_page(
        &mock_server,
        "/t1",
        post_page(&[TestPost::new("alice", "No date on this one", "")], None),
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    let first = run_crawl(&config).await.unwrap();
    let second = run_crawl(&config).await.unwrap();
    assert_eq!(first.posts, 1);
    assert_eq!(second.posts, 0);

    let store = open_db(&temp_dir);
    let posts = store.list_posts(&url_of(&mock_server, "/t1")).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].posted_at, "");
    assert_eq!(store.get_user("alice").unwrap().unwrap().post_count, 1);
}

#[tokio::test]
async fn test_post_without_username_is_skipped() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", root_page(&[("General", "/f1")])).await;
    mount_page(&mock_server, "/f1", thread_list_page(&[("Hello", "/t1")], None)).await;
    mount_page(
        &mock_server,
        "/t1",
        post_page(
            &[
                TestPost {
                    username: None,
                    comment: "Who wrote this?",
                    posted_at: "2024-01-01T09:00:00Z",
                    attachment: None,
                },
                TestPost::new("alice", "I did", "2024-01-01T10:00:00Z"),
            ],
            None,
        ),
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    let stats = run_crawl(&config).await.unwrap();
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.posts, 1);

    let store = open_db(&temp_dir);
    let posts = store.list_posts(&url_of(&mock_server, "/t1")).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].username, "alice");
}

#[tokio::test]
async fn test_thread_list_pagination_visits_every_page_once() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", root_page(&[("General", "/f1")])).await;
    mount_page_expecting(
        &mock_server,
        "/f1",
        thread_list_page(&[("One", "/t1")], Some("/f1/page2")),
        1,
    )
    .await;
    mount_page_expecting(
        &mock_server,
        "/f1/page2",
        thread_list_page(&[("Two", "/t2")], Some("/f1/page3")),
        1,
    )
    .await;
    mount_page_expecting(
        &mock_server,
        "/f1/page3",
        thread_list_page(&[("Three", "/t3")], None),
        1,
    )
    .await;
    for thread in ["/t1", "/t2", "/t3"] {
        mount_page(
            &mock_server,
            thread,
            post_page(&[TestPost::new("alice", thread, "2024-01-01")], None),
        )
        .await;
    }

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    run_crawl(&config).await.unwrap();

    let store = open_db(&temp_dir);
    let titles: Vec<String> = store
        .list_threads(&url_of(&mock_server, "/f1"))
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["One", "Two", "Three"]);
    assert_eq!(store.get_user("alice").unwrap().unwrap().post_count, 3);
}

#[tokio::test]
async fn test_post_pagination_follows_next_links() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", root_page(&[("General", "/f1")])).await;
    mount_page(&mock_server, "/f1", thread_list_page(&[("Long", "/t1")], None)).await;
    // First page is fetched twice: once for thread metadata, once for posts
    mount_page_expecting(
        &mock_server,
        "/t1",
        post_page(
            &[TestPost::new("alice", "page one", "2024-01-01")],
            Some("/t1/page2"),
        ),
        2,
    )
    .await;
    mount_page_expecting(
        &mock_server,
        "/t1/page2",
        post_page(&[TestPost::new("bob", "page two", "2024-01-02")], None),
        1,
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    run_crawl(&config).await.unwrap();

    let store = open_db(&temp_dir);
    let posts = store.list_posts(&url_of(&mock_server, "/t1")).unwrap();
    let comments: Vec<&str> = posts.iter().map(|p| p.comment.as_str()).collect();
    assert_eq!(comments, vec!["page one", "page two"]);
}

#[tokio::test]
async fn test_self_linking_pagination_stops() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", root_page(&[("General", "/f1")])).await;
    mount_page_expecting(
        &mock_server,
        "/f1",
        thread_list_page(&[("Loop", "/t1")], Some("/f1#again")),
        1,
    )
    .await;
    mount_page_expecting(
        &mock_server,
        "/t1",
        post_page(&[TestPost::new("alice", "round", "2024-01-01")], Some("/t1")),
        2,
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    let stats = run_crawl(&config).await.unwrap();
    assert_eq!(stats.threads, 1);
    assert_eq!(stats.posts, 1);
}

#[tokio::test]
async fn test_failed_subforum_does_not_stop_siblings() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        root_page(&[("Broken", "/f1"), ("Working", "/f2")]),
    )
    .await;
    mount_status(&mock_server, "/f1", 500).await;
    mount_page(&mock_server, "/f2", thread_list_page(&[("Fine", "/t2")], None)).await;
    mount_page(
        &mock_server,
        "/t2",
        post_page(&[TestPost::new("carol", "still here", "2024-02-01")], None),
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    let stats = run_crawl(&config).await.unwrap();
    assert_eq!(stats.fetch_failures, 1);

    let store = open_db(&temp_dir);
    // The subforum row is saved before its pages are fetched
    assert_eq!(store.list_subforums(None).unwrap().len(), 2);
    assert!(store
        .list_threads(&url_of(&mock_server, "/f1"))
        .unwrap()
        .is_empty());
    assert_eq!(
        store.list_threads(&url_of(&mock_server, "/f2")).unwrap().len(),
        1
    );
    assert_eq!(store.get_user("carol").unwrap().unwrap().post_count, 1);
}

#[tokio::test]
async fn test_unreachable_thread_gets_default_metadata() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", root_page(&[("General", "/f1")])).await;
    mount_page(&mock_server, "/f1", thread_list_page(&[("Gone", "/t9")], None)).await;
    mount_status(&mock_server, "/t9", 404).await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    let stats = run_crawl(&config).await.unwrap();
    // Metadata fetch and first post page both fail
    assert_eq!(stats.fetch_failures, 2);

    let store = open_db(&temp_dir);
    let threads = store.list_threads(&url_of(&mock_server, "/f1")).unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].creator, "Unknown");
    assert!(chrono::DateTime::parse_from_rfc3339(&threads[0].created_at).is_ok());
    assert!(store.list_posts(&threads[0].url).unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_root_fails_the_crawl() {
    let mock_server = MockServer::start().await;
    mount_status(&mock_server, "/", 500).await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    match run_crawl(&config).await {
        Err(ScraperError::Fetch(e)) => assert_eq!(e.attempts, 2),
        other => panic!("Expected fetch error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_shutdown_interrupts_crawl_and_keeps_saved_records() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", root_page(&[("General", "/f1")])).await;
    Mock::given(method("GET"))
        .and(path("/f1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(thread_list_page(&[], None))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    let outcome = run_crawl_until(&config, tokio::time::sleep(Duration::from_millis(300)))
        .await
        .expect("Interrupted crawl is not an error");

    match outcome {
        CrawlOutcome::Interrupted(stats) => assert_eq!(stats.subforums, 1),
        CrawlOutcome::Completed(_) => panic!("Crawl should have been interrupted"),
    }

    // The store was closed cleanly and still holds what was saved
    let store = open_db(&temp_dir);
    assert_eq!(store.list_subforums(None).unwrap().len(), 1);
}

#[tokio::test]
async fn test_run_crawl_until_completes_before_shutdown() {
    let mock_server = MockServer::start().await;
    mount_small_forum(&mock_server).await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    let outcome = run_crawl_until(&config, std::future::pending::<()>())
        .await
        .expect("Crawl should succeed");

    match outcome {
        CrawlOutcome::Completed(stats) => assert_eq!(stats.posts, 2),
        CrawlOutcome::Interrupted(_) => panic!("Crawl should have completed"),
    }
}

#[tokio::test]
async fn test_attachments_downloaded_once() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", root_page(&[("General", "/f1")])).await;
    mount_page(&mock_server, "/f1", thread_list_page(&[("Pics", "/t1")], None)).await;
    mount_page(
        &mock_server,
        "/t1",
        post_page(
            &[TestPost {
                username: Some("alice"),
                comment: "Look at this",
                posted_at: "2024-01-01",
                attachment: Some(("sunset.png", "/files/42")),
            }],
            None,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/42"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![1, 2, 3, 4]),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));
    config.crawler.download_attachments = true;

    let stats = run_crawl(&config).await.unwrap();
    assert_eq!(stats.files, 1);

    // The post is a duplicate the second time, so nothing is downloaded
    let stats = run_crawl(&config).await.unwrap();
    assert_eq!(stats.files, 0);

    let store = open_db(&temp_dir);
    let posts = store.list_posts(&url_of(&mock_server, "/t1")).unwrap();
    let files = store.list_files(posts[0].id).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].filename, "sunset.png");
    assert_eq!(files[0].mime_type.as_deref(), Some("image/png"));
    assert_eq!(files[0].file_data, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_attachments_ignored_when_disabled() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", root_page(&[("General", "/f1")])).await;
    mount_page(&mock_server, "/f1", thread_list_page(&[("Pics", "/t1")], None)).await;
    mount_page(
        &mock_server,
        "/t1",
        post_page(
            &[TestPost {
                username: Some("alice"),
                comment: "Look at this",
                posted_at: "2024-01-01",
                attachment: Some(("sunset.png", "/files/42")),
            }],
            None,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/42"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    let stats = run_crawl(&config).await.unwrap();
    assert_eq!(stats.files, 0);
}

#[tokio::test]
async fn test_summary_after_crawl() {
    let mock_server = MockServer::start().await;
    mount_small_forum(&mock_server).await;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server, &temp_dir.path().join("forum.db"));

    let mut crawler = Crawler::new(&config).unwrap();
    crawler.run().await.unwrap();

    let summary = generate_summary(crawler.store()).unwrap();
    assert_eq!(summary.subforums.len(), 2);
    assert_eq!(summary.subforums[0].posts, 2);
    assert_eq!(summary.subforums[0].users, 2);
    assert_eq!(summary.subforums[0].thread_details[0].title, "Hello");

    crawler.into_store().close().unwrap();
}

//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Forum-Scraper database.

use crate::storage::{StorageError, StorageResult};
use rusqlite::Connection;
use std::collections::HashSet;

/// Tables that must exist before a crawl can start
pub const REQUIRED_TABLES: &[&str] = &["subforums", "threads", "posts", "users", "files"];

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Forum categories; parent_id links nested subforums
CREATE TABLE IF NOT EXISTS subforums (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    url TEXT UNIQUE NOT NULL,
    parent_id INTEGER,
    FOREIGN KEY (parent_id) REFERENCES subforums(id)
);

CREATE INDEX IF NOT EXISTS idx_subforums_parent ON subforums(parent_id);

-- Discussion threads, keyed by URL
CREATE TABLE IF NOT EXISTS threads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subforum_url TEXT NOT NULL,
    title TEXT NOT NULL,
    url TEXT UNIQUE NOT NULL,
    creator TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (subforum_url) REFERENCES subforums(url)
);

CREATE INDEX IF NOT EXISTS idx_threads_subforum ON threads(subforum_url);

-- Posts; identical content in the same thread is stored once
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_url TEXT NOT NULL,
    username TEXT NOT NULL,
    comment TEXT NOT NULL,
    posted_at TEXT NOT NULL,
    user_url TEXT,
    FOREIGN KEY (thread_url) REFERENCES threads(url),
    UNIQUE(thread_url, username, comment, posted_at)
);

CREATE INDEX IF NOT EXISTS idx_posts_thread ON posts(thread_url, posted_at);
CREATE INDEX IF NOT EXISTS idx_posts_username ON posts(username);

-- Per-user activity index, derived from post inserts
CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    first_seen TEXT NOT NULL,
    post_count INTEGER DEFAULT 1
);

-- Post attachments
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    mime_type TEXT,
    file_data BLOB NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id)
);

CREATE INDEX IF NOT EXISTS idx_files_post ON files(post_id);
"#;

/// Creates any missing tables and then checks that all required tables exist
///
/// # Returns
///
/// * `Ok(())` - Schema is ready
/// * `Err(StorageError::MissingTables)` - A required table is still absent
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    validate_tables(conn)
}

/// Checks that every table in [`REQUIRED_TABLES`] exists
pub fn validate_tables(conn: &Connection) -> StorageResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let existing = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;

    let missing: Vec<String> = REQUIRED_TABLES
        .iter()
        .filter(|table| !existing.contains(**table))
        .map(|table| table.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(StorageError::MissingTables(missing));
    }

    tracing::debug!("Database tables validated");
    Ok(())
}

//! Storage module for persisting crawled forum data
//!
//! This module handles all database operations for the scraper, including:
//! - SQLite database initialization and schema validation
//! - First-write-wins upserts for subforums, threads and posts
//! - The derived per-user activity index
//! - File attachments linked to posts
//! - Read accessors used by reporting

mod schema;
mod sqlite;
mod traits;

pub use schema::REQUIRED_TABLES;
pub use sqlite::{remove_database_files, SqliteStorage};
pub use traits::{ForumStore, StorageError, StorageResult};

/// A subforum row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubforumRecord {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub parent_id: Option<i64>,
}

/// A thread row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRecord {
    pub id: i64,
    pub subforum_url: String,
    pub title: String,
    pub url: String,
    pub creator: String,
    pub created_at: String,
}

/// A post row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: i64,
    pub thread_url: String,
    pub username: String,
    pub comment: String,
    pub posted_at: String,
    pub user_url: Option<String>,
}

/// A row of the user activity index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub first_seen: String,
    pub post_count: u64,
}

/// A stored attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: i64,
    pub post_id: i64,
    pub filename: String,
    pub mime_type: Option<String>,
    pub file_data: Vec<u8>,
}

/// Row counts across the whole database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForumTotals {
    pub subforums: u64,
    pub threads: u64,
    pub posts: u64,
    pub users: u64,
    pub files: u64,
}

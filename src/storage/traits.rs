//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{
    FileRecord, ForumTotals, PostRecord, SubforumRecord, ThreadRecord, UserRecord,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Post {post_id} does not exist")]
    Referential { post_id: i64 },

    #[error("Missing required tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),

    #[error("Subforum not found after insert: {0}")]
    SubforumNotFound(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for forum storage backends
///
/// Writes follow an insert-or-ignore contract keyed on natural keys (URLs):
/// the first write of a key wins and later writes with the same key are
/// dropped without error. Re-running a crawl is therefore always safe, at the
/// cost of never refreshing content that changed on the site.
pub trait ForumStore {
    // ===== Writes =====

    /// Inserts a subforum unless its URL is already known
    ///
    /// Returns the stored row. On conflict the existing row is returned
    /// unchanged; `title` and `parent_id` are not updated.
    fn upsert_subforum(
        &mut self,
        title: &str,
        url: &str,
        parent_id: Option<i64>,
    ) -> StorageResult<SubforumRecord>;

    /// Inserts a thread unless its URL is already known
    fn upsert_thread(
        &mut self,
        subforum_url: &str,
        title: &str,
        url: &str,
        creator: &str,
        created_at: &str,
    ) -> StorageResult<()>;

    /// Inserts a post unless an identical one exists in the thread
    ///
    /// A real insert also updates the user index in the same transaction.
    ///
    /// # Returns
    ///
    /// * `Some(id)` - The post was new
    /// * `None` - Duplicate; nothing was written and the user index is untouched
    fn insert_post(
        &mut self,
        thread_url: &str,
        username: &str,
        comment: &str,
        posted_at: &str,
        user_url: Option<&str>,
    ) -> StorageResult<Option<i64>>;

    /// Records one more post for `username`
    ///
    /// New users start at a post count of 1 with `first_seen = posted_at`;
    /// known users get their count incremented and keep `first_seen`.
    fn upsert_user(&mut self, username: &str, posted_at: &str) -> StorageResult<()>;

    /// Stores an attachment for an existing post
    ///
    /// Files have no natural key and are always inserted.
    fn insert_file(
        &mut self,
        post_id: i64,
        filename: &str,
        mime_type: Option<&str>,
        data: &[u8],
    ) -> StorageResult<i64>;

    // ===== Reads =====

    /// Lists subforums under `parent_id`; `None` lists the root subforums
    fn list_subforums(&self, parent_id: Option<i64>) -> StorageResult<Vec<SubforumRecord>>;

    /// Lists the threads of a subforum
    fn list_threads(&self, subforum_url: &str) -> StorageResult<Vec<ThreadRecord>>;

    /// Lists the posts of a thread ordered by `posted_at` ascending
    fn list_posts(&self, thread_url: &str) -> StorageResult<Vec<PostRecord>>;

    /// Lists the attachments of a post
    fn list_files(&self, post_id: i64) -> StorageResult<Vec<FileRecord>>;

    /// Looks up a user in the activity index
    fn get_user(&self, username: &str) -> StorageResult<Option<UserRecord>>;

    // ===== Statistics =====

    fn count_threads_in_subforum(&self, subforum_url: &str) -> StorageResult<u64>;

    fn count_posts_in_subforum(&self, subforum_url: &str) -> StorageResult<u64>;

    /// Distinct posting users across all threads of a subforum
    fn count_users_in_subforum(&self, subforum_url: &str) -> StorageResult<u64>;

    fn count_posts_in_thread(&self, thread_url: &str) -> StorageResult<u64>;

    /// Distinct posting users in a thread
    fn count_users_in_thread(&self, thread_url: &str) -> StorageResult<u64>;

    /// Size of the user activity index
    fn count_users(&self) -> StorageResult<u64>;

    /// Row counts for every table
    fn forum_totals(&self) -> StorageResult<ForumTotals>;
}

//! Report types and errors for read-side output

use crate::storage::{ForumTotals, StorageError};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Per-thread line of the forum report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSummary {
    pub title: String,
    pub url: String,
    pub creator: String,
    pub created_at: String,
    pub posts: u64,
    pub users: u64,
}

/// Per-subforum section of the forum report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubforumSummary {
    pub title: String,
    pub url: String,
    pub threads: u64,
    pub posts: u64,
    pub users: u64,
    pub thread_details: Vec<ThreadSummary>,
}

/// Everything the Markdown report renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForumSummary {
    /// When the report was generated (RFC 3339)
    pub generated_at: String,

    /// Whole-database totals
    pub totals: ForumTotals,

    /// Root subforums in insertion order
    pub subforums: Vec<SubforumSummary>,
}

impl ForumSummary {
    /// Average posts per thread across the database
    pub fn posts_per_thread(&self) -> f64 {
        if self.totals.threads == 0 {
            0.0
        } else {
            self.totals.posts as f64 / self.totals.threads as f64
        }
    }
}

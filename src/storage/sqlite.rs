//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ForumStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ForumStore, StorageError, StorageResult};
use crate::storage::{
    FileRecord, ForumTotals, PostRecord, SubforumRecord, ThreadRecord, UserRecord,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

/// SQLite storage backend
///
/// Holds the single long-lived connection used for the whole crawl.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path` and prepares the schema
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Database is ready
    /// * `Err(StorageError)` - Failed to open, or the schema did not validate
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // WAL for crash safety, NORMAL sync as the durability/speed trade-off
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Flushes and closes the connection
    pub fn close(self) -> StorageResult<()> {
        self.conn.close().map_err(|(_, e)| StorageError::from(e))?;
        tracing::info!("Database connection closed");
        Ok(())
    }

    fn count(&self, sql: &str, key: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, params![key], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_all(&self, table: &str) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }
}

/// Bumps the activity index for one newly stored post
fn track_user(conn: &Connection, username: &str, posted_at: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (username, first_seen, post_count) VALUES (?1, ?2, 1)
         ON CONFLICT(username) DO UPDATE SET post_count = post_count + 1",
        params![username, posted_at],
    )?;
    Ok(())
}

fn subforum_from_row(row: &Row<'_>) -> rusqlite::Result<SubforumRecord> {
    Ok(SubforumRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        parent_id: row.get(3)?,
    })
}

fn thread_from_row(row: &Row<'_>) -> rusqlite::Result<ThreadRecord> {
    Ok(ThreadRecord {
        id: row.get(0)?,
        subforum_url: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        creator: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        thread_url: row.get(1)?,
        username: row.get(2)?,
        comment: row.get(3)?,
        posted_at: row.get(4)?,
        user_url: row.get(5)?,
    })
}

impl ForumStore for SqliteStorage {
    // ===== Writes =====

    fn upsert_subforum(
        &mut self,
        title: &str,
        url: &str,
        parent_id: Option<i64>,
    ) -> StorageResult<SubforumRecord> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO subforums (title, url, parent_id) VALUES (?1, ?2, ?3)",
            params![title, url, parent_id],
        )?;

        if inserted == 1 {
            return Ok(SubforumRecord {
                id: self.conn.last_insert_rowid(),
                title: title.to_string(),
                url: url.to_string(),
                parent_id,
            });
        }

        self.conn
            .query_row(
                "SELECT id, title, url, parent_id FROM subforums WHERE url = ?1",
                params![url],
                subforum_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::SubforumNotFound(url.to_string()))
    }

    fn upsert_thread(
        &mut self,
        subforum_url: &str,
        title: &str,
        url: &str,
        creator: &str,
        created_at: &str,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO threads (subforum_url, title, url, creator, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![subforum_url, title, url, creator, created_at],
        )?;
        Ok(())
    }

    fn insert_post(
        &mut self,
        thread_url: &str,
        username: &str,
        comment: &str,
        posted_at: &str,
        user_url: Option<&str>,
    ) -> StorageResult<Option<i64>> {
        let tx = self.conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO posts (thread_url, username, comment, posted_at, user_url)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![thread_url, username, comment, posted_at, user_url],
        )?;

        let post_id = if inserted == 1 {
            let id = tx.last_insert_rowid();
            track_user(&tx, username, posted_at)?;
            Some(id)
        } else {
            None
        };

        tx.commit()?;
        Ok(post_id)
    }

    fn upsert_user(&mut self, username: &str, posted_at: &str) -> StorageResult<()> {
        track_user(&self.conn, username, posted_at)?;
        Ok(())
    }

    fn insert_file(
        &mut self,
        post_id: i64,
        filename: &str,
        mime_type: Option<&str>,
        data: &[u8],
    ) -> StorageResult<i64> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
            params![post_id],
            |row| row.get(0),
        )?;

        if !exists {
            return Err(StorageError::Referential { post_id });
        }

        self.conn.execute(
            "INSERT INTO files (post_id, filename, mime_type, file_data) VALUES (?1, ?2, ?3, ?4)",
            params![post_id, filename, mime_type, data],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    // ===== Reads =====

    fn list_subforums(&self, parent_id: Option<i64>) -> StorageResult<Vec<SubforumRecord>> {
        // `IS` matches NULL as well as concrete ids
        let mut stmt = self.conn.prepare(
            "SELECT id, title, url, parent_id FROM subforums WHERE parent_id IS ?1 ORDER BY id",
        )?;

        let subforums = stmt
            .query_map(params![parent_id], subforum_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(subforums)
    }

    fn list_threads(&self, subforum_url: &str) -> StorageResult<Vec<ThreadRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, subforum_url, title, url, creator, created_at
             FROM threads WHERE subforum_url = ?1 ORDER BY id",
        )?;

        let threads = stmt
            .query_map(params![subforum_url], thread_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(threads)
    }

    fn list_posts(&self, thread_url: &str) -> StorageResult<Vec<PostRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, thread_url, username, comment, posted_at, user_url
             FROM posts WHERE thread_url = ?1 ORDER BY posted_at ASC, id ASC",
        )?;

        let posts = stmt
            .query_map(params![thread_url], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    fn list_files(&self, post_id: i64) -> StorageResult<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, post_id, filename, mime_type, file_data FROM files WHERE post_id = ?1 ORDER BY id",
        )?;

        let files = stmt
            .query_map(params![post_id], |row| {
                Ok(FileRecord {
                    id: row.get(0)?,
                    post_id: row.get(1)?,
                    filename: row.get(2)?,
                    mime_type: row.get(3)?,
                    file_data: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(files)
    }

    fn get_user(&self, username: &str) -> StorageResult<Option<UserRecord>> {
        let user = self
            .conn
            .query_row(
                "SELECT username, first_seen, post_count FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserRecord {
                        username: row.get(0)?,
                        first_seen: row.get(1)?,
                        post_count: row.get::<_, i64>(2)? as u64,
                    })
                },
            )
            .optional()?;

        Ok(user)
    }

    // ===== Statistics =====

    fn count_threads_in_subforum(&self, subforum_url: &str) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM threads WHERE subforum_url = ?1",
            subforum_url,
        )
    }

    fn count_posts_in_subforum(&self, subforum_url: &str) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM posts
             INNER JOIN threads ON posts.thread_url = threads.url
             WHERE threads.subforum_url = ?1",
            subforum_url,
        )
    }

    fn count_users_in_subforum(&self, subforum_url: &str) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(DISTINCT posts.username) FROM posts
             INNER JOIN threads ON posts.thread_url = threads.url
             WHERE threads.subforum_url = ?1",
            subforum_url,
        )
    }

    fn count_posts_in_thread(&self, thread_url: &str) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM posts WHERE thread_url = ?1",
            thread_url,
        )
    }

    fn count_users_in_thread(&self, thread_url: &str) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(DISTINCT username) FROM posts WHERE thread_url = ?1",
            thread_url,
        )
    }

    fn count_users(&self) -> StorageResult<u64> {
        self.count_all("users")
    }

    fn forum_totals(&self) -> StorageResult<ForumTotals> {
        Ok(ForumTotals {
            subforums: self.count_all("subforums")?,
            threads: self.count_all("threads")?,
            posts: self.count_all("posts")?,
            users: self.count_all("users")?,
            files: self.count_all("files")?,
        })
    }
}

/// Deletes a database file together with its WAL and shared-memory files
///
/// Missing files are ignored. This is the out-of-band reset used by `--fresh`.
pub fn remove_database_files(path: &Path) -> std::io::Result<()> {
    let mut candidates = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        candidates.push(PathBuf::from(side));
    }

    for candidate in candidates {
        match std::fs::remove_file(&candidate) {
            Ok(()) => tracing::debug!("Removed {}", candidate.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

//! Store Gateway (§4.B): a thin, typed wrapper around a single SQLite
//! connection. Schema: `Stories`/`Comments` relational tables plus
//! `StoriesContent`/`CommentsContent` FTS5 virtual tables mirroring their
//! text content, keyed by the same id (`rowid`).
//!
//! Grounded in the teacher's `rusqlite::Connection` handling
//! (`parallel.rs::open_db`, `sequential.rs`'s `PRAGMA cache_size`), adapted
//! from a read-only export source to the read-write single-writer
//! connection §5 describes.

use eyre::{Context, Result};
use rusqlite::{Connection, params};
use std::collections::HashSet;
use std::path::Path;

pub struct Store {
    conn: Connection,
}

/// A resolved comment row, as read back for scoring.
#[derive(Debug, Clone)]
pub struct ResolvedComment {
    pub comment_id: i64,
    pub story_id: i64,
    pub thread_rank: i64,
    pub level: i64,
    pub story_comment_count: i64,
}

impl Store {
    /// Open (creating if absent) the database at `path`, apply the schema,
    /// and set the single-writer PRAGMAs §5 documents as the unsafe-but-fast
    /// default. Pass `durable = true` to keep SQLite's normal journaling and
    /// fsync behavior instead.
    pub fn open(path: &Path, durable: bool) -> Result<Self> {
        let conn = Connection::open(path)
            .wrap_err_with(|| format!("failed to open database at {}", path.display()))?;

        if !durable {
            conn.execute_batch(
                "PRAGMA journal_mode = OFF;
                 PRAGMA synchronous = OFF;
                 PRAGMA locking_mode = EXCLUSIVE;",
            )
            .wrap_err("failed to apply fast-import PRAGMAs")?;
        }

        let store = Store { conn };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS Stories (
                    StoryId INTEGER PRIMARY KEY,
                    CommentCount INTEGER NOT NULL DEFAULT 0,
                    File TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS Comments (
                    CommentId INTEGER PRIMARY KEY,
                    StoryId INTEGER NOT NULL DEFAULT 0,
                    ParentId INTEGER NOT NULL,
                    ThreadRank INTEGER NOT NULL DEFAULT 0,
                    Level INTEGER NOT NULL DEFAULT 0,
                    File TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS StoryKids (
                    StoryId INTEGER NOT NULL,
                    Position INTEGER NOT NULL,
                    KidId INTEGER NOT NULL,
                    PRIMARY KEY (StoryId, Position)
                );
                CREATE VIRTUAL TABLE IF NOT EXISTS StoriesContent USING fts5(Content);
                CREATE VIRTUAL TABLE IF NOT EXISTS CommentsContent USING fts5(Content);",
            )
            .wrap_err("failed to create schema")
    }

    /// Distinct `source_file` values already recorded, across both tables,
    /// so `import` can skip files it has already ingested.
    pub fn known_files(&self) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT File FROM Stories UNION SELECT File FROM Comments")
            .wrap_err("failed to prepare known-files query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .wrap_err("failed to query known files")?;
        rows.collect::<rusqlite::Result<_>>()
            .wrap_err("failed to collect known files")
    }

    /// Run `body` inside a single transaction, committing on `Ok` and
    /// rolling back (via `Drop`) on `Err`.
    pub fn transaction<T>(&mut self, body: impl FnOnce(&rusqlite::Transaction) -> Result<T>) -> Result<T> {
        let tx = self.conn.transaction().wrap_err("failed to begin transaction")?;
        let value = body(&tx)?;
        tx.commit().wrap_err("failed to commit transaction")?;
        Ok(value)
    }

    /// `kids` is persisted in its upstream order (§3: "Kids"), not
    /// reconstructed later from comment insertion order — the source dump
    /// doesn't guarantee kids are listed in id order, and `thread_rank`
    /// depends on the real positions.
    pub fn insert_story(
        tx: &rusqlite::Transaction,
        story_id: i64,
        comment_count: i64,
        source_file: &str,
        title: &str,
        kids: &[i64],
    ) -> Result<()> {
        tx.execute(
            "INSERT INTO Stories (StoryId, CommentCount, File) VALUES (?1, ?2, ?3)",
            params![story_id, comment_count, source_file],
        )
        .wrap_err("failed to insert story")?;
        tx.execute(
            "INSERT INTO StoriesContent (rowid, Content) VALUES (?1, ?2)",
            params![story_id, title],
        )
        .wrap_err("failed to insert story content")?;
        for (position, kid_id) in kids.iter().enumerate() {
            tx.execute(
                "INSERT INTO StoryKids (StoryId, Position, KidId) VALUES (?1, ?2, ?3)",
                params![story_id, position as i64, kid_id],
            )
            .wrap_err("failed to insert story kid")?;
        }
        Ok(())
    }

    pub fn insert_comment(
        tx: &rusqlite::Transaction,
        comment_id: i64,
        parent_id: i64,
        source_file: &str,
        normalized_text: &str,
    ) -> Result<()> {
        tx.execute(
            "INSERT INTO Comments (CommentId, StoryId, ParentId, ThreadRank, Level, File)
             VALUES (?1, 0, ?2, 0, 0, ?3)",
            params![comment_id, parent_id, source_file],
        )
        .wrap_err("failed to insert comment")?;
        tx.execute(
            "INSERT INTO CommentsContent (rowid, Content) VALUES (?1, ?2)",
            params![comment_id, normalized_text],
        )
        .wrap_err("failed to insert comment content")?;
        Ok(())
    }

    /// `(story_id, comment_count)` for every story.
    pub fn story_comment_counts(&self) -> Result<Vec<(i64, i64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT StoryId, CommentCount FROM Stories")
            .wrap_err("failed to prepare story query")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .wrap_err("failed to query stories")?;
        rows.collect::<rusqlite::Result<_>>().wrap_err("failed to collect stories")
    }

    /// Known story ids, for the resolver's "have we reached a story yet?"
    /// check.
    pub fn known_story_ids(&self) -> Result<HashSet<i64>> {
        Ok(self.story_comment_counts()?.into_iter().map(|(id, _)| id).collect())
    }

    /// The story's `kids` sequence as persisted at ingest time, in its
    /// original upstream order (§3).
    pub fn story_kids(&self, story_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT KidId FROM StoryKids WHERE StoryId = ?1 ORDER BY Position")
            .wrap_err("failed to prepare kids query")?;
        let rows = stmt
            .query_map(params![story_id], |row| row.get(0))
            .wrap_err("failed to query kids")?;
        rows.collect::<rusqlite::Result<_>>().wrap_err("failed to collect kids")
    }

    /// `comment_id -> parent_id` for every comment, loaded en masse for the
    /// resolver's sparse parent-chain walk.
    pub fn all_parents(&self) -> Result<std::collections::HashMap<i64, i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT CommentId, ParentId FROM Comments")
            .wrap_err("failed to prepare parent map query")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .wrap_err("failed to query parents")?;
        rows.collect::<rusqlite::Result<_>>().wrap_err("failed to collect parents")
    }

    /// Unresolved comment ids (`StoryId = 0`).
    pub fn unresolved_comment_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT CommentId FROM Comments WHERE StoryId = 0")
            .wrap_err("failed to prepare unresolved query")?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .wrap_err("failed to query unresolved comments")?;
        rows.collect::<rusqlite::Result<_>>().wrap_err("failed to collect unresolved comments")
    }

    pub fn update_comment_position(
        tx: &rusqlite::Transaction,
        comment_id: i64,
        story_id: i64,
        thread_rank: i64,
        level: i64,
    ) -> Result<()> {
        tx.execute(
            "UPDATE Comments SET StoryId = ?2, ThreadRank = ?3, Level = ?4 WHERE CommentId = ?1",
            params![comment_id, story_id, thread_rank, level],
        )
        .wrap_err("failed to update comment position")?;
        Ok(())
    }

    pub fn increment_story_comment_count(tx: &rusqlite::Transaction, story_id: i64) -> Result<()> {
        tx.execute(
            "UPDATE Stories SET CommentCount = CommentCount + 1 WHERE StoryId = ?1",
            params![story_id],
        )
        .wrap_err("failed to bump story comment count")?;
        Ok(())
    }

    /// All resolved comments with their thread coordinates and owning
    /// story's comment count — exactly what the scorer needs.
    pub fn resolved_comments(&self) -> Result<Vec<ResolvedComment>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT c.CommentId, c.StoryId, c.ThreadRank, c.Level, s.CommentCount
                 FROM Comments c JOIN Stories s ON s.StoryId = c.StoryId
                 WHERE c.StoryId > 0",
            )
            .wrap_err("failed to prepare resolved-comments query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ResolvedComment {
                    comment_id: row.get(0)?,
                    story_id: row.get(1)?,
                    thread_rank: row.get(2)?,
                    level: row.get(3)?,
                    story_comment_count: row.get(4)?,
                })
            })
            .wrap_err("failed to query resolved comments")?;
        rows.collect::<rusqlite::Result<_>>().wrap_err("failed to collect resolved comments")
    }

    /// Comment ids matching an FTS5 boolean query against stored comment
    /// content. Quoted phrases are not supported, per FTS5's default
    /// tokenizer semantics.
    pub fn comments_matching(&self, query: &str) -> Result<HashSet<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT rowid FROM CommentsContent WHERE Content MATCH ?1")
            .wrap_err("failed to prepare match query")?;
        let rows = stmt
            .query_map(params![query], |row| row.get(0))
            .wrap_err("failed to run match query")?;
        rows.collect::<rusqlite::Result<_>>().wrap_err("failed to collect match results")
    }

    pub fn count_stories_matching(&self, query: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM StoriesContent WHERE Content MATCH ?1",
                params![query],
                |row| row.get(0),
            )
            .wrap_err("failed to count matching stories")
    }

    pub fn count_comments_matching(&self, query: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM CommentsContent WHERE Content MATCH ?1",
                params![query],
                |row| row.get(0),
            )
            .wrap_err("failed to count matching comments")
    }

    /// Create the scratch `scores` table used by `rank`, replacing any
    /// prior contents.
    pub fn reset_scores_table(tx: &rusqlite::Transaction) -> Result<()> {
        tx.execute_batch(
            "DROP TABLE IF EXISTS scores;
             CREATE TABLE scores (CommentId INTEGER PRIMARY KEY, Score INTEGER NOT NULL);",
        )
        .wrap_err("failed to reset scores table")
    }

    pub fn insert_score(tx: &rusqlite::Transaction, comment_id: i64, score: i64) -> Result<()> {
        tx.execute(
            "INSERT INTO scores (CommentId, Score) VALUES (?1, ?2)",
            params![comment_id, score],
        )
        .wrap_err("failed to insert score")?;
        Ok(())
    }

    /// Scored comment content in descending-score order, optionally
    /// truncated to the top `limit` rows (`limit <= 0` means unbounded).
    pub fn scored_comment_texts(&self, limit: i64) -> Result<Vec<String>> {
        let sql = if limit > 0 {
            "SELECT cc.Content FROM scores sc
             JOIN CommentsContent cc ON cc.rowid = sc.CommentId
             ORDER BY sc.Score DESC LIMIT ?1"
        } else {
            "SELECT cc.Content FROM scores sc
             JOIN CommentsContent cc ON cc.rowid = sc.CommentId
             ORDER BY sc.Score DESC"
        };
        let mut stmt = self.conn.prepare(sql).wrap_err("failed to prepare scored-text query")?;
        let rows = if limit > 0 {
            stmt.query_map(params![limit], |row| row.get(0))
        } else {
            stmt.query_map([], |row| row.get(0))
        }
        .wrap_err("failed to query scored text")?;
        rows.collect::<rusqlite::Result<_>>().wrap_err("failed to collect scored text")
    }

    pub fn story_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM Stories", [], |row| row.get(0))
            .wrap_err("failed to count stories")
    }

    pub fn comment_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM Comments", [], |row| row.get(0))
            .wrap_err("failed to count comments")
    }

    pub fn scored_comment_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM scores", [], |row| row.get(0))
            .wrap_err("failed to count scores")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_tmp() -> (Store, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        (Store::open(&path, false).unwrap(), dir)
    }

    #[test]
    fn creates_schema_idempotently() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        Store::open(&path, false).unwrap();
        // Re-opening must not fail even though the schema already exists.
        Store::open(&path, false).unwrap();
    }

    #[test]
    fn insert_and_read_story() {
        let (mut store, _dir) = open_tmp();
        store
            .transaction(|tx| {
                Store::insert_story(tx, 1, 0, "part1", "Title", &[])?;
                Ok(())
            })
            .unwrap();

        let counts = store.story_comment_counts().unwrap();
        assert_eq!(counts, vec![(1, 0)]);
    }

    #[test]
    fn known_files_tracks_both_tables() {
        let (mut store, _dir) = open_tmp();
        store
            .transaction(|tx| {
                Store::insert_story(tx, 1, 0, "part1", "Title", &[])?;
                Store::insert_comment(tx, 2, 1, "part2", "hello")?;
                Ok(())
            })
            .unwrap();

        let files = store.known_files().unwrap();
        assert!(files.contains("part1"));
        assert!(files.contains("part2"));
    }

    #[test]
    fn full_text_match_finds_inserted_content() {
        let (mut store, _dir) = open_tmp();
        store
            .transaction(|tx| {
                Store::insert_comment(tx, 1, 0, "part1", "the quick brown fox")?;
                Ok(())
            })
            .unwrap();

        let hits = store.comments_matching("quick").unwrap();
        assert!(hits.contains(&1));
        assert!(store.comments_matching("nonexistentword").unwrap().is_empty());
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let (mut store, _dir) = open_tmp();
        let result: Result<()> = store.transaction(|tx| {
            Store::insert_story(tx, 1, 0, "part1", "Title", &[])?;
            eyre::bail!("boom");
        });
        assert!(result.is_err());
        assert_eq!(store.story_comment_counts().unwrap().len(), 0);
    }
}

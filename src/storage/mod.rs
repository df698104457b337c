use crate::config::NotesConfig;
use crate::error::{MelissaError, Result};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod types;
pub use types::{Note, SaveOutcome};

const NOTE_COLUMNS: &str = "title, content, created_at, updated_at";

/// Durable note repository backed by SQLite
///
/// Every operation opens its own connection and commits before returning,
/// so reads always observe the latest committed writes. SQLite serializes
/// concurrent writers; a busy timeout covers overlapping tool calls.
#[derive(Debug, Clone)]
pub struct NoteStore {
    db_path: PathBuf,
}

impl NoteStore {
    /// Create a store in the user's data directory
    ///
    /// `MELISSA_NOTES_DB` overrides the location.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("MELISSA_NOTES_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "melissa", "melissa")
            .ok_or_else(|| MelissaError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .map_err(MelissaError::Io)
            .context("Failed to create data directory")?;

        let store = Self {
            db_path: data_dir.join("notes.db"),
        };
        store.init()?;
        Ok(store)
    }

    /// Create a store at an explicit database path
    ///
    /// Parent directories are created as needed.
    ///
    /// # Examples
    ///
    /// ```
    /// use melissa::storage::NoteStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = NoteStore::new_with_path(dir.path().join("notes.db")).unwrap();
    /// assert!(store.list().unwrap().is_empty());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(MelissaError::Io)
                .context("Failed to create parent directory for database")?;
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    /// Create a store from configuration, falling back to [`NoteStore::new`]
    pub fn from_config(config: &NotesConfig) -> Result<Self> {
        match &config.db_path {
            Some(path) => Self::new_with_path(path),
            None => Self::new(),
        }
    }

    /// Path of the backing database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .map_err(MelissaError::Database)
            .context("Failed to open database")?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(MelissaError::Database)
            .context("Failed to set busy timeout")?;
        Ok(conn)
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL UNIQUE,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes (created_at);",
        )
        .map_err(MelissaError::Database)
        .context("Failed to create tables")?;

        Ok(())
    }

    /// Save a note, overwriting the content of an existing note with the same title
    ///
    /// `created_at` of an existing note is preserved; `updated_at` is bumped.
    pub fn save(&self, title: &str, content: &str) -> Result<SaveOutcome> {
        let mut conn = self.open()?;
        let now = timestamp(Utc::now());

        let tx = conn
            .transaction()
            .map_err(MelissaError::Database)
            .context("Failed to start transaction")?;

        let updated = tx
            .execute(
                "UPDATE notes SET content = ?1, updated_at = ?2 WHERE title = ?3",
                params![content, now, title],
            )
            .map_err(MelissaError::Database)
            .context("Failed to update note")?;

        let outcome = if updated > 0 {
            SaveOutcome::Updated
        } else {
            tx.execute(
                "INSERT INTO notes (title, content, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?3)",
                params![title, content, now],
            )
            .map_err(MelissaError::Database)
            .context("Failed to insert note")?;
            SaveOutcome::Created
        };

        tx.commit()
            .map_err(MelissaError::Database)
            .context("Failed to commit transaction")?;

        tracing::debug!("Saved note '{}' ({:?})", title, outcome);
        Ok(outcome)
    }

    /// Fetch a note by exact title
    pub fn get(&self, title: &str) -> Result<Option<Note>> {
        let conn = self.open()?;
        conn.query_row(
            &format!("SELECT {} FROM notes WHERE title = ?1", NOTE_COLUMNS),
            params![title],
            note_from_row,
        )
        .optional()
        .map_err(MelissaError::Database)
        .context("Failed to query note")
    }

    /// Replace the content of an existing note
    ///
    /// Returns `false` when no note has this title.
    pub fn update(&self, title: &str, content: &str) -> Result<bool> {
        let conn = self.open()?;
        let changed = conn
            .execute(
                "UPDATE notes SET content = ?1, updated_at = ?2 WHERE title = ?3",
                params![content, timestamp(Utc::now()), title],
            )
            .map_err(MelissaError::Database)
            .context("Failed to update note")?;
        Ok(changed > 0)
    }

    /// Delete a note by exact title
    ///
    /// Returns `false` when no note has this title.
    pub fn delete(&self, title: &str) -> Result<bool> {
        let conn = self.open()?;
        let changed = conn
            .execute("DELETE FROM notes WHERE title = ?1", params![title])
            .map_err(MelissaError::Database)
            .context("Failed to delete note")?;
        Ok(changed > 0)
    }

    /// All notes, newest first
    pub fn list(&self) -> Result<Vec<Note>> {
        self.query_notes(
            &format!(
                "SELECT {} FROM notes ORDER BY created_at DESC, id DESC",
                NOTE_COLUMNS
            ),
            |_| true,
        )
    }

    /// Notes whose title or content contains `term`, ignoring case, newest first
    ///
    /// Matching is done on Unicode-lowercased text rather than with SQL
    /// `LIKE`, which only folds ASCII and treats `%` and `_` as wildcards.
    pub fn search(&self, term: &str) -> Result<Vec<Note>> {
        let needle = term.to_lowercase();
        self.query_notes(
            &format!(
                "SELECT {} FROM notes ORDER BY created_at DESC, id DESC",
                NOTE_COLUMNS
            ),
            |note| {
                note.title.to_lowercase().contains(&needle)
                    || note.content.to_lowercase().contains(&needle)
            },
        )
    }

    fn query_notes(&self, sql: &str, keep: impl Fn(&Note) -> bool) -> Result<Vec<Note>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(MelissaError::Database)
            .context("Failed to prepare statement")?;

        let rows = stmt
            .query_map([], note_from_row)
            .map_err(MelissaError::Database)
            .context("Failed to query notes")?;

        let mut notes = Vec::new();
        for row in rows {
            let note = row
                .map_err(MelissaError::Database)
                .context("Failed to read note row")?;
            if keep(&note) {
                notes.push(note);
            }
        }
        Ok(notes)
    }
}

/// Fixed-width RFC 3339 so lexical order in SQLite equals chronological order
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let created_at: String = row.get(2)?;
    let updated_at: String = row.get(3)?;
    Ok(Note {
        title: row.get(0)?,
        content: row.get(1)?,
        created_at: parse_timestamp(2, &created_at)?,
        updated_at: parse_timestamp(3, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_error_contains, create_test_file, temp_dir};
    use serial_test::serial;
    use std::env;
    use std::thread::sleep;
    use tempfile::tempdir;

    /// Returns the store and its `TempDir` so the directory outlives the test body.
    fn create_test_store() -> (NoteStore, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let store = NoteStore::new_with_path(dir.path().join("notes.db"))
            .expect("failed to create store");
        (store, dir)
    }

    #[test]
    fn test_init_creates_table() {
        let (store, _dir) = create_test_store();
        let conn = Connection::open(store.db_path()).expect("open connection");
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='notes'",
                [],
                |r| r.get(0),
            )
            .expect("query row");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_init_is_idempotent() {
        let (store, _dir) = create_test_store();
        store.save("Keep", "me").unwrap();
        let reopened = NoteStore::new_with_path(store.db_path()).unwrap();
        assert!(reopened.get("Keep").unwrap().is_some());
    }

    #[test]
    fn test_save_then_get() {
        let (store, _dir) = create_test_store();
        assert_eq!(
            store.save("Meeting", "call Bob at 3pm").unwrap(),
            SaveOutcome::Created
        );

        let note = store.get("Meeting").unwrap().expect("note present");
        assert_eq!(note.title, "Meeting");
        assert_eq!(note.content, "call Bob at 3pm");
        assert_eq!(note.created_at, note.updated_at);
    }

    #[test]
    fn test_save_existing_title_overwrites_and_keeps_created_at() {
        let (store, _dir) = create_test_store();
        store.save("Groceries", "milk").unwrap();
        let first = store.get("Groceries").unwrap().unwrap();

        sleep(Duration::from_millis(5));
        assert_eq!(
            store.save("Groceries", "eggs").unwrap(),
            SaveOutcome::Updated
        );

        let second = store.get("Groceries").unwrap().unwrap();
        assert_eq!(second.content, "eggs");
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_titles_are_case_sensitive() {
        let (store, _dir) = create_test_store();
        store.save("Todo", "a").unwrap();
        store.save("todo", "b").unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
        assert!(store.get("TODO").unwrap().is_none());
    }

    #[test]
    fn test_get_missing_returns_none() {
        let (store, _dir) = create_test_store();
        assert!(store.get("nothing").unwrap().is_none());
    }

    #[test]
    fn test_update_existing_and_missing() {
        let (store, _dir) = create_test_store();
        store.save("Plan", "v1").unwrap();
        assert!(store.update("Plan", "v2").unwrap());
        assert_eq!(store.get("Plan").unwrap().unwrap().content, "v2");
        assert!(!store.update("Ghost", "v1").unwrap());
        assert!(store.get("Ghost").unwrap().is_none());
    }

    #[test]
    fn test_delete_existing_and_missing() {
        let (store, _dir) = create_test_store();
        store.save("Temp", "x").unwrap();
        assert!(store.delete("Temp").unwrap());
        assert!(store.get("Temp").unwrap().is_none());
        assert!(!store.delete("Temp").unwrap());
    }

    #[test]
    fn test_list_newest_first_and_update_keeps_position() {
        let (store, _dir) = create_test_store();
        store.save("First", "1").unwrap();
        sleep(Duration::from_millis(5));
        store.save("Second", "2").unwrap();
        sleep(Duration::from_millis(5));
        store.save("Third", "3").unwrap();

        store.update("First", "1b").unwrap();
        store.save("Second", "2b").unwrap();

        let titles: Vec<String> = store.list().unwrap().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["Third", "Second", "First"]);
    }

    #[test]
    fn test_list_ties_break_by_insertion_order() {
        let (store, _dir) = create_test_store();
        let conn = Connection::open(store.db_path()).unwrap();
        let ts = "2025-01-01T00:00:00.000000Z";
        for title in ["a", "b", "c"] {
            conn.execute(
                "INSERT INTO notes (title, content, created_at, updated_at) VALUES (?1, '', ?2, ?2)",
                params![title, ts],
            )
            .unwrap();
        }

        let titles: Vec<String> = store.list().unwrap().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_search_matches_title_or_content_case_insensitively() {
        let (store, _dir) = create_test_store();
        store.save("Shopping", "Milk and bread").unwrap();
        sleep(Duration::from_millis(5));
        store.save("Work", "email the MILKMAN").unwrap();
        sleep(Duration::from_millis(5));
        store.save("Music", "practice scales").unwrap();

        let titles: Vec<String> = store
            .search("milk")
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["Work", "Shopping"]);

        let by_title: Vec<String> = store
            .search("MUS")
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(by_title, vec!["Music"]);
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let (store, _dir) = create_test_store();
        store.save("Discount", "50% off").unwrap();
        store.save("Other", "nothing here").unwrap();

        let found = store.search("%").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Discount");
        assert!(store.search("_").unwrap().is_empty());
    }

    #[test]
    fn test_timestamp_is_fixed_width() {
        let a = timestamp(DateTime::parse_from_rfc3339("2025-03-04T05:06:07Z").unwrap().into());
        assert_eq!(a, "2025-03-04T05:06:07.000000Z");
    }

    #[test]
    #[serial]
    fn test_new_respects_env_override() {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("nested").join("notes.db");
        env::set_var("MELISSA_NOTES_DB", db_path.to_string_lossy().to_string());

        let store = NoteStore::new();
        env::remove_var("MELISSA_NOTES_DB");

        let store = store.expect("new failed with env override");
        assert_eq!(store.db_path(), db_path.as_path());
        assert!(db_path.exists());
    }

    #[test]
    fn test_from_config_uses_explicit_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.db");
        let config = NotesConfig {
            db_path: Some(path.to_string_lossy().to_string()),
        };
        let store = NoteStore::from_config(&config).unwrap();
        assert_eq!(store.db_path(), path.as_path());
    }

    #[test]
    fn test_parent_path_that_is_a_file_is_io_error() {
        let dir = temp_dir();
        let blocker = create_test_file(&dir, "blocker", "");

        let result = NoteStore::new_with_path(blocker.join("notes.db"));
        let err = result.as_ref().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MelissaError>(),
            Some(MelissaError::Io(_))
        ));
        assert_error_contains(result, "Failed to create parent directory for database");
    }

    #[test]
    fn test_corrupt_database_is_database_error() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "notes.db", &"not a sqlite database\n".repeat(64));

        let result = NoteStore::new_with_path(path);
        let err = result.as_ref().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MelissaError>(),
            Some(MelissaError::Database(_))
        ));
        assert_error_contains(result, "Failed to create tables");
    }
}

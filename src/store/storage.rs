//! Movie store trait, SQLite implementation, and the degraded handle.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::error;

use crate::omdb::types::Movie;

/// Store failures. `Unavailable` is terminal for the operation: there is no
/// further fallback below the offline store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
  #[error("offline store unavailable")]
  Unavailable,
  #[error("offline store operation failed: {0}")]
  Sql(String),
  #[error("failed to encode record: {0}")]
  Codec(String),
}

/// Trait for the structured record store.
///
/// `find_by_id` gives callers a usable trichotomy: `Ok(Some)` record found,
/// `Ok(None)` definitively absent, `Err(Unavailable)` store down.
pub trait MovieStore: Send + Sync {
  /// Insert-or-overwrite by identifier. Idempotent; the later write wins.
  fn upsert(&self, movie: &Movie) -> Result<(), StoreError>;

  /// All records, or records whose title contains the given substring under
  /// case-insensitive comparison. Zero matches is an empty vec, not an error.
  fn find_all(&self, title_filter: Option<&str>) -> Result<Vec<Movie>, StoreError>;

  /// Exact-key lookup.
  fn find_by_id(&self, id: &str) -> Result<Option<Movie>, StoreError>;
}

const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS movies (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    data BLOB NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_movies_title ON movies(title);
"#;

/// SQLite-backed movie store. Records are serialized as JSON blobs; the
/// title column exists only to carry the secondary index.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open (or create) the store at the given path. Schema creation runs to
  /// completion before the handle exists, so no caller can upsert or query
  /// an unmigrated store.
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| StoreError::Sql(e.to_string()))?;
    }

    let conn = Connection::open(path).map_err(|e| StoreError::Sql(e.to_string()))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  fn run_migrations(&self) -> Result<(), StoreError> {
    let conn = self.lock()?;
    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| StoreError::Sql(e.to_string()))?;
    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
    self
      .conn
      .lock()
      .map_err(|e| StoreError::Sql(format!("lock poisoned: {}", e)))
  }
}

impl MovieStore for SqliteStore {
  fn upsert(&self, movie: &Movie) -> Result<(), StoreError> {
    let data = serde_json::to_vec(movie).map_err(|e| StoreError::Codec(e.to_string()))?;

    let conn = self.lock()?;
    conn
      .execute(
        "INSERT OR REPLACE INTO movies (id, title, data, stored_at)
         VALUES (?, ?, ?, datetime('now'))",
        params![movie.id, movie.title, data],
      )
      .map_err(|e| StoreError::Sql(e.to_string()))?;

    Ok(())
  }

  fn find_all(&self, title_filter: Option<&str>) -> Result<Vec<Movie>, StoreError> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare("SELECT data FROM movies")
      .map_err(|e| StoreError::Sql(e.to_string()))?;

    // Substring filtering happens after full retrieval. The store performs
    // no native substring indexing; acceptable at hundreds of entries.
    let movies: Vec<Movie> = stmt
      .query_map([], |row| {
        let data: Vec<u8> = row.get(0)?;
        Ok(data)
      })
      .map_err(|e| StoreError::Sql(e.to_string()))?
      .filter_map(|r| r.ok())
      .filter_map(|data| serde_json::from_slice(&data).ok())
      .filter(|movie: &Movie| match title_filter {
        Some(needle) => movie.title_contains(needle),
        None => true,
      })
      .collect();

    Ok(movies)
  }

  fn find_by_id(&self, id: &str) -> Result<Option<Movie>, StoreError> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare("SELECT data FROM movies WHERE id = ?")
      .map_err(|e| StoreError::Sql(e.to_string()))?;

    let data: Option<Vec<u8>> = stmt
      .query_row(params![id], |row| row.get(0))
      .optional()
      .map_err(|e| StoreError::Sql(e.to_string()))?;

    match data {
      Some(data) => {
        let movie = serde_json::from_slice(&data).map_err(|e| StoreError::Codec(e.to_string()))?;
        Ok(Some(movie))
      }
      None => Ok(None),
    }
  }
}

/// Store handle held by the cached client. A failed open degrades to
/// `Unavailable` instead of crashing the host: writes become silent no-ops
/// and reads report the store as down, which consumers surface as a
/// "no offline data" outcome.
pub enum StoreHandle {
  Sqlite(SqliteStore),
  Unavailable,
}

impl StoreHandle {
  pub fn open(path: &Path) -> Self {
    match SqliteStore::open(path) {
      Ok(store) => Self::Sqlite(store),
      Err(e) => {
        error!("failed to open movie store at {}: {}", path.display(), e);
        Self::Unavailable
      }
    }
  }
}

impl MovieStore for StoreHandle {
  fn upsert(&self, movie: &Movie) -> Result<(), StoreError> {
    match self {
      Self::Sqlite(store) => store.upsert(movie),
      // Tolerated: a write before the store is usable is dropped silently
      Self::Unavailable => Ok(()),
    }
  }

  fn find_all(&self, title_filter: Option<&str>) -> Result<Vec<Movie>, StoreError> {
    match self {
      Self::Sqlite(store) => store.find_all(title_filter),
      Self::Unavailable => Err(StoreError::Unavailable),
    }
  }

  fn find_by_id(&self, id: &str) -> Result<Option<Movie>, StoreError> {
    match self {
      Self::Sqlite(store) => store.find_by_id(id),
      Self::Unavailable => Err(StoreError::Unavailable),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::omdb::types::summary;

  fn temp_store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("movies.db")).unwrap();
    (dir, store)
  }

  #[test]
  fn test_upsert_and_find_by_id() {
    let (_dir, store) = temp_store();
    let movie = summary("tt0372784", "Batman Begins", "2005");

    store.upsert(&movie).unwrap();

    let found = store.find_by_id("tt0372784").unwrap().unwrap();
    assert_eq!(found, movie);
  }

  #[test]
  fn test_find_by_id_absent_is_none_not_error() {
    let (_dir, store) = temp_store();
    assert!(store.find_by_id("tt9999999").unwrap().is_none());
  }

  #[test]
  fn test_upsert_is_idempotent() {
    let (_dir, store) = temp_store();
    let movie = summary("tt0001", "X", "2000");

    store.upsert(&movie).unwrap();
    store.upsert(&movie).unwrap();

    let all = store.find_all(None).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0], movie);
  }

  #[test]
  fn test_detail_write_supersedes_summary() {
    let (_dir, store) = temp_store();

    store.upsert(&summary("tt0001", "X", "2000")).unwrap();

    let mut detail = summary("tt0001", "X", "2000");
    detail.plot = Some("Everything is explained.".to_string());
    store.upsert(&detail).unwrap();

    let found = store.find_by_id("tt0001").unwrap().unwrap();
    assert!(found.is_detail_complete());
    assert_eq!(found.plot.as_deref(), Some("Everything is explained."));
  }

  #[test]
  fn test_find_all_without_filter_returns_everything() {
    let (_dir, store) = temp_store();
    store.upsert(&summary("tt0001", "Batman Begins", "2005")).unwrap();
    store.upsert(&summary("tt0002", "Superman", "1978")).unwrap();

    assert_eq!(store.find_all(None).unwrap().len(), 2);
  }

  #[test]
  fn test_find_all_substring_filter_is_case_insensitive() {
    let (_dir, store) = temp_store();
    store.upsert(&summary("tt0001", "Batman Begins", "2005")).unwrap();
    store.upsert(&summary("tt0002", "THE BATTLE", "1911")).unwrap();
    store.upsert(&summary("tt0003", "Superman", "1978")).unwrap();

    let matches = store.find_all(Some("bat")).unwrap();
    let mut titles: Vec<_> = matches.iter().map(|m| m.title.as_str()).collect();
    titles.sort();
    assert_eq!(titles, vec!["Batman Begins", "THE BATTLE"]);
  }

  #[test]
  fn test_find_all_zero_matches_is_empty_not_error() {
    let (_dir, store) = temp_store();
    store.upsert(&summary("tt0001", "Batman Begins", "2005")).unwrap();

    assert!(store.find_all(Some("xyz123")).unwrap().is_empty());
  }

  #[test]
  fn test_unavailable_handle_tolerates_upsert_and_reports_reads() {
    let handle = StoreHandle::Unavailable;

    // Writes before the store is usable are silent no-ops
    assert!(handle.upsert(&summary("tt0001", "X", "2000")).is_ok());

    // Reads are distinguishable from a successful empty result
    assert!(matches!(
      handle.find_by_id("tt0001"),
      Err(StoreError::Unavailable)
    ));
    assert!(matches!(
      handle.find_all(None),
      Err(StoreError::Unavailable)
    ));
  }

  #[test]
  fn test_records_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("movies.db");

    {
      let store = SqliteStore::open(&path).unwrap();
      store.upsert(&summary("tt0001", "Batman Begins", "2005")).unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    assert!(store.find_by_id("tt0001").unwrap().is_some());
  }
}

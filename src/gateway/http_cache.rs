//! Generation-tagged raw HTTP response cache.
//!
//! Entries are keyed by request identity (method + absolute URL) and tagged
//! with the cache generation that wrote them, so a gateway upgrade can cut
//! over atomically and purge everything from older generations. This data set
//! is disjoint from the structured movie store.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use super::transport::{HttpRequest, HttpResponse};

const HTTP_CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS http_cache (
    generation TEXT NOT NULL,
    request_key TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (generation, request_key)
);
"#;

/// SQLite-backed raw HTTP cache.
pub struct HttpCache {
  conn: Mutex<Connection>,
}

impl HttpCache {
  /// Open (or create) the cache at the given path.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open HTTP cache at {}: {}", path.display(), e))?;

    let cache = Self {
      conn: Mutex::new(conn),
    };
    cache.run_migrations()?;

    Ok(cache)
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(HTTP_CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run HTTP cache migrations: {}", e))?;

    Ok(())
  }

  /// Store (or overwrite) a response under the given generation.
  pub fn put(
    &self,
    generation: &str,
    request: &HttpRequest,
    response: &HttpResponse,
  ) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO http_cache
           (generation, request_key, method, url, status, content_type, body, cached_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          generation,
          request.request_key(),
          request.method,
          request.url.as_str(),
          response.status,
          response.content_type,
          response.body,
        ],
      )
      .map_err(|e| eyre!("Failed to store cached response: {}", e))?;

    Ok(())
  }

  /// Look up a cached response by request identity within one generation.
  pub fn get(&self, generation: &str, request: &HttpRequest) -> Result<Option<HttpResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT status, content_type, body FROM http_cache
         WHERE generation = ? AND request_key = ?",
      )
      .map_err(|e| eyre!("Failed to prepare cache lookup: {}", e))?;

    let result = stmt
      .query_row(params![generation, request.request_key()], |row| {
        Ok(HttpResponse {
          status: row.get(0)?,
          content_type: row.get(1)?,
          body: row.get(2)?,
        })
      })
      .optional()
      .map_err(|e| eyre!("Failed to read cached response: {}", e))?;

    Ok(result)
  }

  /// Delete every entry whose generation is not in `keep`. Returns the number
  /// of entries removed.
  pub fn purge_except(&self, keep: &[&str]) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let placeholders = keep.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let sql = format!(
      "DELETE FROM http_cache WHERE generation NOT IN ({})",
      placeholders
    );

    let removed = conn
      .execute(&sql, rusqlite::params_from_iter(keep.iter()))
      .map_err(|e| eyre!("Failed to purge stale generations: {}", e))?;

    Ok(removed)
  }

  /// Distinct generation tags currently present.
  #[allow(dead_code)]
  pub fn generations(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT DISTINCT generation FROM http_cache ORDER BY generation")
      .map_err(|e| eyre!("Failed to prepare generation query: {}", e))?;

    let generations = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list generations: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(generations)
  }
}

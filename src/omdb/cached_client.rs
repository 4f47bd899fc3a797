//! Cached movie client: the OMDb client plus the structured record store.
//!
//! Every successful response is persisted into the store; every network
//! failure falls back to querying it. Within one operation the order is
//! strictly: attempt network, then persist on success, or query the store
//! only after the attempt has conclusively failed.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::gateway::Transport;
use crate::store::{MovieStore, StoreError};

use super::client::{FetchError, OmdbClient};
use super::types::Movie;

/// Where a lookup result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
  Network,
  Cache,
}

/// A successful lookup, tagged with its source so the shell can show an
/// offline indicator for cached data.
#[derive(Debug, Clone)]
pub struct Lookup<T> {
  pub data: T,
  pub source: Source,
}

impl<T> Lookup<T> {
  fn from_network(data: T) -> Self {
    Self {
      data,
      source: Source::Network,
    }
  }

  fn from_cache(data: T) -> Self {
    Self {
      data,
      source: Source::Cache,
    }
  }
}

/// Terminal lookup failures, after both the network and the store have been
/// consulted. Each maps to one specific user-facing message; raw technical
/// errors never surface through here.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LookupError {
  /// The API reported no match and nothing relevant was cached.
  #[error("{message}")]
  NotFound { message: String },
  /// The network was unreachable and nothing relevant was cached.
  #[error("network unreachable and nothing cached")]
  Offline,
  /// The offline store itself is inaccessible; no further fallback exists.
  #[error("offline data inaccessible")]
  StoreUnavailable,
}

/// Movie client with transparent persistence and offline fallback.
pub struct CachedClient<T: Transport, S: MovieStore> {
  client: OmdbClient<T>,
  store: Arc<S>,
  recommendation_term: String,
}

impl<T: Transport, S: MovieStore> CachedClient<T, S> {
  pub fn new(client: OmdbClient<T>, store: Arc<S>, recommendation_term: String) -> Self {
    Self {
      client,
      store,
      recommendation_term,
    }
  }

  /// Search by term: network-first, record-store fallback.
  pub async fn search(&self, term: &str) -> Result<Lookup<Vec<Movie>>, LookupError> {
    match self.client.search(term).await {
      Ok(movies) => {
        self.persist_all(&movies);
        Ok(Lookup::from_network(movies))
      }
      Err(err) => {
        debug!(term, "search failed, falling back to store: {}", err);
        self.fallback_search(term, err)
      }
    }
  }

  /// The default curated query, with no user-supplied term.
  pub async fn recommendations(&self) -> Result<Lookup<Vec<Movie>>, LookupError> {
    self.search(&self.recommendation_term).await
  }

  /// Detail by id. A detail-complete stored record answers without any
  /// network call; otherwise exactly one fetch runs and its result
  /// supersedes whatever summary was stored for that id.
  pub async fn get_detail(&self, id: &str) -> Result<Lookup<Movie>, LookupError> {
    let store_failed = match self.store.find_by_id(id) {
      Ok(Some(movie)) if movie.is_detail_complete() => {
        return Ok(Lookup::from_cache(movie));
      }
      Ok(_) => false,
      Err(e) => {
        warn!(id, "store lookup failed before detail fetch: {}", e);
        true
      }
    };

    match self.client.detail(id).await {
      Ok(movie) => {
        self.persist(&movie);
        Ok(Lookup::from_network(movie))
      }
      Err(err) if store_failed => {
        debug!(id, "detail fetch failed with store down: {}", err);
        Err(LookupError::StoreUnavailable)
      }
      Err(FetchError::NoMatch(message)) => Err(LookupError::NotFound { message }),
      Err(err) => {
        debug!(id, "detail fetch failed: {}", err);
        Err(LookupError::Offline)
      }
    }
  }

  /// Fallback boundary for a failed search: a store error here resolves to
  /// `StoreUnavailable` rather than propagating.
  fn fallback_search(
    &self,
    term: &str,
    err: FetchError,
  ) -> Result<Lookup<Vec<Movie>>, LookupError> {
    match self.store.find_all(Some(term)) {
      Ok(movies) if !movies.is_empty() => Ok(Lookup::from_cache(movies)),
      Ok(_) => match err {
        FetchError::NoMatch(message) => Err(LookupError::NotFound { message }),
        _ => Err(LookupError::Offline),
      },
      Err(store_err) => {
        warn!(term, "offline fallback failed: {}", store_err);
        Err(LookupError::StoreUnavailable)
      }
    }
  }

  fn persist_all(&self, movies: &[Movie]) {
    for movie in movies {
      self.persist(movie);
    }
  }

  /// A failed write never fails the operation that produced the data.
  fn persist(&self, movie: &Movie) {
    if let Err(e) = self.store.upsert(movie) {
      match e {
        StoreError::Unavailable => {}
        other => warn!(id = %movie.id, "failed to persist record: {}", other),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::omdb::client::test_support::CannedTransport;
  use crate::omdb::types::summary;
  use crate::store::{SqliteStore, StoreHandle};
  use url::Url;

  const SEARCH_BATMAN: &str = "https://www.omdbapi.com/?apikey=k&s=batman";
  const DETAIL_TT0372784: &str = "https://www.omdbapi.com/?apikey=k&i=tt0372784&plot=full";

  fn canned_search_body() -> &'static str {
    r#"{"Search":[
      {"Title":"Batman Begins","Year":"2005","imdbID":"tt0372784","Poster":"N/A"},
      {"Title":"The Batman","Year":"2022","imdbID":"tt1877830","Poster":"N/A"}
    ],"totalResults":"2","Response":"True"}"#
  }

  fn canned_detail_body() -> &'static str {
    r#"{"Title":"Batman Begins","Year":"2005","imdbID":"tt0372784","Poster":"N/A",
        "Plot":"Bruce Wayne trains in the mountains.","Director":"Christopher Nolan",
        "Ratings":[{"Source":"Internet Movie Database","Value":"8.2/10"}],
        "Response":"True"}"#
  }

  struct Fixture {
    _dir: tempfile::TempDir,
    transport: Arc<CannedTransport>,
    cached: CachedClient<CannedTransport, SqliteStore>,
  }

  fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("movies.db")).unwrap());
    let transport = Arc::new(CannedTransport::new());
    let client = OmdbClient::new(
      Arc::clone(&transport),
      Url::parse("https://www.omdbapi.com/").unwrap(),
      "k".to_string(),
    );
    Fixture {
      _dir: dir,
      transport,
      cached: CachedClient::new(client, store, "avengers".to_string()),
    }
  }

  #[tokio::test]
  async fn test_search_from_network_persists_every_item() {
    let f = fixture();
    f.transport.serve(SEARCH_BATMAN, canned_search_body());

    let lookup = f.cached.search("batman").await.unwrap();
    assert_eq!(lookup.source, Source::Network);
    assert_eq!(lookup.data.len(), 2);

    // Every returned item is subsequently retrievable by id
    for movie in &lookup.data {
      let stored = f.cached.store.find_by_id(&movie.id).unwrap();
      assert_eq!(stored.as_ref(), Some(movie));
    }
  }

  #[tokio::test]
  async fn test_search_offline_falls_back_to_store() {
    let f = fixture();
    f.cached
      .store
      .upsert(&summary("tt0372784", "Batman Begins", "2005"))
      .unwrap();
    f.transport.go_offline();

    let lookup = f.cached.search("batman").await.unwrap();
    assert_eq!(lookup.source, Source::Cache);
    assert_eq!(lookup.data.len(), 1);
    assert_eq!(lookup.data[0].title, "Batman Begins");
  }

  #[tokio::test]
  async fn test_search_offline_with_empty_store_is_offline_error() {
    let f = fixture();
    f.transport.go_offline();

    let err = f.cached.search("xyz123").await.unwrap_err();
    assert!(matches!(err, LookupError::Offline));
  }

  #[tokio::test]
  async fn test_search_logical_empty_falls_back_then_reports_not_found() {
    let f = fixture();
    f.transport.serve(
      "https://www.omdbapi.com/?apikey=k&s=zzzzz",
      r#"{"Response":"False","Error":"Movie not found!"}"#,
    );

    // HTTP 200 with Response:"False" is a logical-empty failure, not a
    // success with zero items: the store fallback runs, finds nothing, and
    // the not-found message wins over the connectivity one.
    let err = f.cached.search("zzzzz").await.unwrap_err();
    match err {
      LookupError::NotFound { message } => assert_eq!(message, "Movie not found!"),
      other => panic!("expected NotFound, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_search_store_unavailable_is_terminal() {
    let transport = Arc::new(CannedTransport::new());
    transport.go_offline();
    let client = OmdbClient::new(
      Arc::clone(&transport),
      Url::parse("https://www.omdbapi.com/").unwrap(),
      "k".to_string(),
    );
    let cached = CachedClient::new(
      client,
      Arc::new(StoreHandle::Unavailable),
      "avengers".to_string(),
    );

    let err = cached.search("batman").await.unwrap_err();
    assert!(matches!(err, LookupError::StoreUnavailable));
  }

  #[tokio::test]
  async fn test_detail_complete_record_short_circuits_network() {
    let f = fixture();
    let mut movie = summary("tt0372784", "Batman Begins", "2005");
    movie.plot = Some("Bruce Wayne trains.".to_string());
    f.cached.store.upsert(&movie).unwrap();

    let lookup = f.cached.get_detail("tt0372784").await.unwrap();
    assert_eq!(lookup.source, Source::Cache);
    assert_eq!(f.transport.calls(), 0);
  }

  #[tokio::test]
  async fn test_detail_supersedes_stored_summary() {
    let f = fixture();
    f.cached
      .store
      .upsert(&summary("tt0372784", "Batman Begins", "2005"))
      .unwrap();
    f.transport.serve(DETAIL_TT0372784, canned_detail_body());

    // Repeated id lookups beforehand must not affect the fetch count
    for _ in 0..3 {
      assert!(!f
        .cached
        .store
        .find_by_id("tt0372784")
        .unwrap()
        .unwrap()
        .is_detail_complete());
    }

    let lookup = f.cached.get_detail("tt0372784").await.unwrap();
    assert_eq!(lookup.source, Source::Network);
    assert_eq!(f.transport.calls(), 1);

    let stored = f.cached.store.find_by_id("tt0372784").unwrap().unwrap();
    assert!(stored.is_detail_complete());

    // Now cached: a second detail lookup performs no further network call
    let again = f.cached.get_detail("tt0372784").await.unwrap();
    assert_eq!(again.source, Source::Cache);
    assert_eq!(f.transport.calls(), 1);
  }

  #[tokio::test]
  async fn test_detail_offline_without_cached_plot_fails() {
    let f = fixture();
    f.cached
      .store
      .upsert(&summary("tt0372784", "Batman Begins", "2005"))
      .unwrap();
    f.transport.go_offline();

    let err = f.cached.get_detail("tt0372784").await.unwrap_err();
    assert!(matches!(err, LookupError::Offline));
  }

  #[tokio::test]
  async fn test_recommendations_use_default_term() {
    let f = fixture();
    f.transport.serve(
      "https://www.omdbapi.com/?apikey=k&s=avengers",
      r#"{"Search":[{"Title":"The Avengers","Year":"2012","imdbID":"tt0848228","Poster":"N/A"}],"totalResults":"1","Response":"True"}"#,
    );

    let lookup = f.cached.recommendations().await.unwrap();
    assert_eq!(lookup.source, Source::Network);
    assert_eq!(lookup.data[0].id, "tt0848228");
  }
}

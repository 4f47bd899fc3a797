//! Typed client for the OMDb search/detail API.

use std::sync::Arc;
use url::Url;

use crate::gateway::{HttpRequest, Transport};

use super::api_types::{
  normalize_search_results, ApiDetailResponse, ApiSearchResponse, RESPONSE_FALSE,
};
use super::types::Movie;

/// Failure taxonomy for one API call. Transport failures, non-2xx statuses
/// and the body-level "no match" signal all take the same fallback path in
/// the cached client; only the user-facing message differs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
  #[error("network request failed: {0}")]
  Transport(String),
  #[error("server returned HTTP {0}")]
  Status(u16),
  /// Logical-empty: the API answered but reports no match. Classified by the
  /// structural `Response: "False"` flag, never by message text; the message
  /// is carried for display only.
  #[error("{0}")]
  NoMatch(String),
  #[error("failed to decode response: {0}")]
  Decode(String),
}

/// OMDb API client over a [`Transport`]. In production the transport is the
/// caching gateway, so API calls are network-first without this client
/// knowing it.
pub struct OmdbClient<T: Transport> {
  transport: Arc<T>,
  base: Url,
  api_key: String,
}

impl<T: Transport> OmdbClient<T> {
  pub fn new(transport: Arc<T>, base: Url, api_key: String) -> Self {
    Self {
      transport,
      base,
      api_key,
    }
  }

  fn request_url(&self, pairs: &[(&str, &str)]) -> Url {
    let mut url = self.base.clone();
    {
      let mut query = url.query_pairs_mut();
      query.append_pair("apikey", &self.api_key);
      for (name, value) in pairs {
        query.append_pair(name, value);
      }
    }
    url
  }

  async fn fetch_body(&self, url: Url) -> Result<Vec<u8>, FetchError> {
    let request = HttpRequest::get(url);
    let response = self
      .transport
      .fetch(&request)
      .await
      .map_err(|e| FetchError::Transport(e.to_string()))?;

    if !response.is_success() {
      return Err(FetchError::Status(response.status));
    }

    Ok(response.body)
  }

  /// Search by term. Returns the normalized, validated summary list.
  pub async fn search(&self, term: &str) -> Result<Vec<Movie>, FetchError> {
    let url = self.request_url(&[("s", term)]);
    let body = self.fetch_body(url).await?;

    let parsed: ApiSearchResponse =
      serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

    if parsed.response == RESPONSE_FALSE {
      let message = parsed.error.unwrap_or_else(|| "Movie not found!".to_string());
      return Err(FetchError::NoMatch(message));
    }

    Ok(normalize_search_results(parsed.search))
  }

  /// Fetch the full-plot detail record for one identifier.
  pub async fn detail(&self, id: &str) -> Result<Movie, FetchError> {
    let url = self.request_url(&[("i", id), ("plot", "full")]);
    let body = self.fetch_body(url).await?;

    let parsed: ApiDetailResponse =
      serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

    if parsed.response == RESPONSE_FALSE {
      let message = parsed.error.unwrap_or_else(|| "Movie not found!".to_string());
      return Err(FetchError::NoMatch(message));
    }

    parsed
      .movie
      .into_movie()
      .ok_or_else(|| FetchError::Decode("detail record without an imdbID".to_string()))
  }
}

impl FetchError {
  /// True when the API itself reported "no match", as opposed to the network
  /// or server being unreachable.
  #[allow(dead_code)]
  pub fn is_no_match(&self) -> bool {
    matches!(self, FetchError::NoMatch(_))
  }
}


#[cfg(test)]
mod tests {
  use super::test_support::CannedTransport;
  use super::*;

  fn client(transport: Arc<CannedTransport>) -> OmdbClient<CannedTransport> {
    OmdbClient::new(
      transport,
      Url::parse("https://www.omdbapi.com/").unwrap(),
      "testkey".to_string(),
    )
  }

  #[tokio::test]
  async fn test_search_parses_summaries() {
    let transport = Arc::new(CannedTransport::new());
    transport.serve(
      "https://www.omdbapi.com/?apikey=testkey&s=batman",
      r#"{"Search":[{"Title":"Batman Begins","Year":"2005","imdbID":"tt0372784","Poster":"N/A"}],"totalResults":"1","Response":"True"}"#,
    );

    let movies = client(transport).search("batman").await.unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].id, "tt0372784");
    assert!(!movies[0].is_detail_complete());
  }

  #[tokio::test]
  async fn test_search_response_false_is_logical_empty() {
    let transport = Arc::new(CannedTransport::new());
    transport.serve(
      "https://www.omdbapi.com/?apikey=testkey&s=zzzzz",
      r#"{"Response":"False","Error":"Movie not found!"}"#,
    );

    let err = client(transport).search("zzzzz").await.unwrap_err();
    assert!(err.is_no_match());
    assert_eq!(err.to_string(), "Movie not found!");
  }

  #[tokio::test]
  async fn test_search_transport_failure() {
    let transport = Arc::new(CannedTransport::new());
    transport.go_offline();

    let err = client(transport).search("batman").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
  }

  #[tokio::test]
  async fn test_search_non_2xx_status() {
    let transport = Arc::new(CannedTransport::new());
    transport.serve_status(
      "https://www.omdbapi.com/?apikey=testkey&s=batman",
      503,
      "unavailable",
    );

    let err = client(transport).search("batman").await.unwrap_err();
    assert!(matches!(err, FetchError::Status(503)));
  }

  #[tokio::test]
  async fn test_detail_fetches_full_plot() {
    let transport = Arc::new(CannedTransport::new());
    transport.serve(
      "https://www.omdbapi.com/?apikey=testkey&i=tt0372784&plot=full",
      r#"{"Title":"Batman Begins","Year":"2005","imdbID":"tt0372784","Poster":"N/A","Plot":"Bruce Wayne trains.","Response":"True"}"#,
    );

    let movie = client(transport).detail("tt0372784").await.unwrap();
    assert!(movie.is_detail_complete());
  }

  #[tokio::test]
  async fn test_detail_unknown_id_is_logical_empty() {
    let transport = Arc::new(CannedTransport::new());
    transport.serve(
      "https://www.omdbapi.com/?apikey=testkey&i=tt0000000&plot=full",
      r#"{"Response":"False","Error":"Incorrect IMDb ID."}"#,
    );

    let err = client(transport).detail("tt0000000").await.unwrap_err();
    assert!(err.is_no_match());
  }
}

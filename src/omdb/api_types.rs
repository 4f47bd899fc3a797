//! Serde-deserializable types matching OMDb API responses.
//!
//! These types are separate from domain types so that the wire format stays
//! contained here: records are validated and normalized at this boundary
//! before anything is persisted or displayed.

use serde::Deserialize;
use std::collections::HashSet;
use tracing::warn;

use super::types::{Movie, Rating};

/// Body-level success flag used by the API. A logical failure ("Movie not
/// found!") arrives as `Response: "False"` on an HTTP 200, independent of
/// status code.
pub const RESPONSE_FALSE: &str = "False";

#[derive(Debug, Deserialize)]
pub struct ApiRating {
  #[serde(rename = "Source")]
  pub source: String,
  #[serde(rename = "Value")]
  pub value: String,
}

/// A movie object as returned by both the search (summary fields only) and
/// the id (full detail) endpoints.
#[derive(Debug, Deserialize)]
pub struct ApiMovie {
  #[serde(rename = "imdbID", default)]
  pub imdb_id: String,
  #[serde(rename = "Title", default)]
  pub title: String,
  #[serde(rename = "Year", default)]
  pub year: String,
  #[serde(rename = "Poster", default)]
  pub poster: String,
  #[serde(rename = "Plot")]
  pub plot: Option<String>,
  #[serde(rename = "Genre")]
  pub genre: Option<String>,
  #[serde(rename = "Runtime")]
  pub runtime: Option<String>,
  #[serde(rename = "Rated")]
  pub rated: Option<String>,
  #[serde(rename = "Director")]
  pub director: Option<String>,
  #[serde(rename = "Actors")]
  pub actors: Option<String>,
  #[serde(rename = "Ratings", default)]
  pub ratings: Vec<ApiRating>,
}

/// Search endpoint response. The detail endpoint reuses [`ApiMovie`] at the
/// top level with the same `Response`/`Error` pair, parsed via
/// [`ApiDetailResponse`].
#[derive(Debug, Deserialize)]
pub struct ApiSearchResponse {
  #[serde(rename = "Search", default)]
  pub search: Vec<ApiMovie>,
  #[serde(rename = "Response", default)]
  pub response: String,
  #[serde(rename = "Error")]
  pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiDetailResponse {
  #[serde(rename = "Response", default)]
  pub response: String,
  #[serde(rename = "Error")]
  pub error: Option<String>,
  #[serde(flatten)]
  pub movie: ApiMovie,
}

impl ApiMovie {
  /// Convert into a domain record. Returns `None` for records without an
  /// identifier; the store keys everything by id and must never persist an
  /// unkeyable entry.
  pub fn into_movie(self) -> Option<Movie> {
    if self.imdb_id.is_empty() {
      return None;
    }
    Some(Movie {
      id: self.imdb_id,
      title: self.title,
      year: self.year,
      poster: self.poster,
      plot: self.plot,
      genre: self.genre,
      runtime: self.runtime,
      rated: self.rated,
      director: self.director,
      actors: self.actors,
      ratings: self
        .ratings
        .into_iter()
        .map(|r| Rating {
          source: r.source,
          value: r.value,
        })
        .collect(),
    })
  }
}

/// Normalize a search result list: drop entries without an identifier and
/// deduplicate identifiers within the response (first occurrence wins), so
/// the per-item upserts that follow are deterministic.
pub fn normalize_search_results(items: Vec<ApiMovie>) -> Vec<Movie> {
  let mut seen: HashSet<String> = HashSet::new();
  let mut movies = Vec::with_capacity(items.len());

  for item in items {
    let Some(movie) = item.into_movie() else {
      warn!("dropping search result without an imdbID");
      continue;
    };
    if !seen.insert(movie.id.clone()) {
      warn!(id = %movie.id, "dropping duplicate id within one search response");
      continue;
    }
    movies.push(movie);
  }

  movies
}

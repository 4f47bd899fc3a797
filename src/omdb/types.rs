use serde::{Deserialize, Serialize};

/// A single rating from one review source (e.g. "Internet Movie Database", "8.1/10").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
  pub source: String,
  pub value: String,
}

/// One movie record.
///
/// A search result and its later-fetched detail are the same logical entity at
/// different completeness levels; the detail fields are simply absent on a
/// summary. A detail write replaces a prior summary write for the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
  /// Stable unique identifier (IMDb id, e.g. "tt0372784")
  pub id: String,
  pub title: String,
  pub year: String,
  /// Poster URL; the remote sentinel "N/A" means no art is available
  pub poster: String,

  // Detail-level fields, absent on summaries
  pub plot: Option<String>,
  pub genre: Option<String>,
  pub runtime: Option<String>,
  pub rated: Option<String>,
  pub director: Option<String>,
  pub actors: Option<String>,
  #[serde(default)]
  pub ratings: Vec<Rating>,
}

impl Movie {
  /// A record is detail-complete iff its plot is present and non-empty.
  /// This is the sole signal that no refetch is needed.
  pub fn is_detail_complete(&self) -> bool {
    self.plot.as_deref().is_some_and(|p| !p.is_empty())
  }

  /// Case-insensitive substring match on the title.
  pub fn title_contains(&self, needle: &str) -> bool {
    self.title.to_lowercase().contains(&needle.to_lowercase())
  }
}

#[cfg(test)]
pub(crate) fn summary(id: &str, title: &str, year: &str) -> Movie {
  Movie {
    id: id.to_string(),
    title: title.to_string(),
    year: year.to_string(),
    poster: "N/A".to_string(),
    plot: None,
    genre: None,
    runtime: None,
    rated: None,
    director: None,
    actors: None,
    ratings: Vec::new(),
  }
}

//! Presentation shell around the cached client.
//!
//! Three-tier message precedence per operation: a fresh network result prints
//! plainly, a cache fallback prints data under an offline indicator, and a
//! total failure prints one specific message. Raw technical errors never
//! reach the output.

use tokio::sync::watch;
use tracing::info;

use crate::gateway::Transport;
use crate::omdb::{CachedClient, Lookup, LookupError, Movie, Source};
use crate::store::MovieStore;

const OFFLINE_INDICATOR: &str = "You are offline. Showing cached data.";

pub struct App<T: Transport, S: MovieStore> {
  client: CachedClient<T, S>,
}

impl<T: Transport, S: MovieStore> App<T, S> {
  pub fn new(client: CachedClient<T, S>) -> Self {
    Self { client }
  }

  /// Run a search and render its outcome as output lines.
  pub async fn search(&self, term: &str) -> Vec<String> {
    let heading = format!("Search results for \"{}\"", term);
    match self.client.search(term).await {
      Ok(lookup) => render_list(&heading, &lookup),
      Err(err) => vec![failure_message(&err, Some(term))],
    }
  }

  /// Render the detail record for one identifier.
  pub async fn detail(&self, id: &str) -> Vec<String> {
    match self.client.get_detail(id).await {
      Ok(lookup) => render_detail(&lookup),
      Err(LookupError::NotFound { message }) => vec![message],
      Err(LookupError::StoreUnavailable) => {
        vec![failure_message(&LookupError::StoreUnavailable, None)]
      }
      Err(LookupError::Offline) => {
        vec!["Could not load details. Try again when online.".to_string()]
      }
    }
  }

  /// The default recommendation view.
  pub async fn home(&self) -> Vec<String> {
    match self.client.recommendations().await {
      Ok(lookup) => render_list("Recommended movies", &lookup),
      Err(err) => vec![failure_message(&err, None)],
    }
  }

  /// Follow the connectivity signal: on every offline→online transition,
  /// refresh the recommendation view. Runs until the signal is dropped.
  pub async fn watch(&self, mut signal: watch::Receiver<bool>) {
    // Initial view, the equivalent of the page-load recommendation query
    for line in self.home().await {
      println!("{}", line);
    }
    signal.borrow_and_update();

    loop {
      if signal.changed().await.is_err() {
        break;
      }

      if *signal.borrow_and_update() {
        info!("connectivity: back online, refreshing recommendations");
        println!("Back online.");
        for line in self.home().await {
          println!("{}", line);
        }
      } else {
        println!("You are now offline.");
      }
    }
  }
}

fn render_list(heading: &str, lookup: &Lookup<Vec<Movie>>) -> Vec<String> {
  let mut lines = Vec::new();
  if lookup.source == Source::Cache {
    lines.push(OFFLINE_INDICATOR.to_string());
  }
  lines.push(heading.to_string());
  for movie in &lookup.data {
    lines.push(format!("  {}  {} ({})", movie.id, movie.title, movie.year));
  }
  lines
}

fn render_detail(lookup: &Lookup<Movie>) -> Vec<String> {
  let movie = &lookup.data;
  let mut lines = Vec::new();
  if lookup.source == Source::Cache {
    lines.push(OFFLINE_INDICATOR.to_string());
  }

  lines.push(format!("{} ({})", movie.title, movie.year));
  if let Some(genre) = &movie.genre {
    lines.push(format!("Genre: {}", genre));
  }
  if let Some(runtime) = &movie.runtime {
    lines.push(format!("Runtime: {}", runtime));
  }
  if let Some(rated) = &movie.rated {
    lines.push(format!("Rated: {}", rated));
  }
  if let Some(director) = &movie.director {
    lines.push(format!("Director: {}", director));
  }
  if let Some(actors) = &movie.actors {
    lines.push(format!("Actors: {}", actors));
  }
  if let Some(plot) = &movie.plot {
    lines.push(String::new());
    lines.push(plot.clone());
  }
  if !movie.ratings.is_empty() {
    lines.push(String::new());
    lines.push("Ratings:".to_string());
    for rating in &movie.ratings {
      lines.push(format!("  {}: {}", rating.source, rating.value));
    }
  }

  lines
}

/// One specific user-facing message per terminal failure.
fn failure_message(err: &LookupError, term: Option<&str>) -> String {
  match err {
    LookupError::NotFound { .. } => match term {
      Some(term) => format!("Movie \"{}\" not found.", term),
      None => "No movies found.".to_string(),
    },
    LookupError::Offline => "Could not reach the movie service. Check your connection.".to_string(),
    LookupError::StoreUnavailable => "Offline data is inaccessible.".to_string(),
  }
}

mod app;
mod config;
mod connectivity;
mod gateway;
mod omdb;
mod store;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use gateway::{FetchGateway, HttpCache, HttpRequest, HttpTransport, Transport};

#[derive(Parser, Debug)]
#[command(name = "filmdex")]
#[command(about = "An offline-first movie lookup client for the OMDb API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/filmdex/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Search movies by title
  Search {
    /// Search term (words are joined with spaces)
    #[arg(required = true)]
    term: Vec<String>,
  },
  /// Show the full detail record for one IMDb id
  Detail { id: String },
  /// Show the default recommendations
  Home,
  /// Follow the connectivity signal and refresh recommendations when back online
  Watch {
    /// Reachability probe interval in seconds
    #[arg(long, default_value_t = 30)]
    interval: u64,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = init_tracing(&config)?;

  let api_key = config.api_key()?;

  // The gateway is installed and activated back to back (the explicit
  // equivalent of skip-waiting): a failed precache is logged, not fatal,
  // since request routing works regardless.
  let cache = HttpCache::open(&config.http_cache_path()?)?;
  let gateway = FetchGateway::new(
    HttpTransport::new(),
    cache,
    &config.api_host()?,
    &config.cache.version,
  );
  if let Err(e) = gateway.install(&config.precache_manifest()).await {
    tracing::warn!("gateway install failed, continuing without precache: {}", e);
  }
  gateway.activate()?;

  let store = Arc::new(store::StoreHandle::open(&config.store_path()?));
  let client = omdb::OmdbClient::new(Arc::new(gateway), config.api_url()?, api_key);
  let cached = omdb::CachedClient::new(client, store, config.recommendation_term.clone());
  let app = app::App::new(cached);

  match args.command {
    Command::Search { term } => print_lines(app.search(&term.join(" ")).await),
    Command::Detail { id } => print_lines(app.detail(&id).await),
    Command::Home => print_lines(app.home().await),
    Command::Watch { interval } => {
      let signal = connectivity::Connectivity::new(true);
      let receiver = signal.subscribe();
      tokio::spawn(probe_connectivity(
        signal,
        config.api_url()?,
        Duration::from_secs(interval),
      ));
      app.watch(receiver).await;
    }
  }

  Ok(())
}

fn print_lines(lines: Vec<String>) {
  for line in lines {
    println!("{}", line);
  }
}

/// Periodically probe the API host and feed the connectivity signal. Any
/// HTTP answer counts as online; only a transport failure counts as offline.
async fn probe_connectivity(
  signal: connectivity::Connectivity,
  probe_url: url::Url,
  interval: Duration,
) {
  let transport = HttpTransport::new();
  let request = HttpRequest::get(probe_url);

  loop {
    let online = transport.fetch(&request).await.is_ok();
    if let Some(transition) = signal.set_online(online) {
      tracing::info!(?transition, "connectivity changed");
    }
    tokio::time::sleep(interval).await;
  }
}

fn init_tracing(config: &config::Config) -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let data_dir = config.data_dir()?;
  std::fs::create_dir_all(&data_dir)?;

  let file_appender = tracing_appender::rolling::never(&data_dir, "filmdex.log");
  let (writer, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

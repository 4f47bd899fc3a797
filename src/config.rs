use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Term behind the default recommendation query
  #[serde(default = "default_recommendation_term")]
  pub recommendation_term: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api: ApiConfig::default(),
      cache: CacheConfig::default(),
      recommendation_term: default_recommendation_term(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_api_url")]
  pub url: String,
  /// API key; the FILMDEX_API_KEY / OMDB_API_KEY env vars take precedence
  pub key: Option<String>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
      key: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Cache generation version; bump to force a wholesale cutover of the raw
  /// HTTP caches on the next activation
  #[serde(default = "default_cache_version")]
  pub version: String,
  /// Data directory override (defaults to the platform data dir)
  pub dir: Option<PathBuf>,
  /// Asset URLs precached at gateway install time
  #[serde(default)]
  pub precache: Vec<String>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      version: default_cache_version(),
      dir: None,
      precache: Vec::new(),
    }
  }
}

fn default_api_url() -> String {
  "https://www.omdbapi.com/".to_string()
}

fn default_cache_version() -> String {
  "v1".to_string()
}

fn default_recommendation_term() -> String {
  "avengers".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./filmdex.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/filmdex/config.yaml
  ///
  /// Every field has a default, so a missing file yields the default
  /// configuration rather than an error.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("filmdex.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("filmdex").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Resolve the API key: environment variables first, then the config file.
  pub fn api_key(&self) -> Result<String> {
    std::env::var("FILMDEX_API_KEY")
      .or_else(|_| std::env::var("OMDB_API_KEY"))
      .ok()
      .or_else(|| self.api.key.clone())
      .ok_or_else(|| {
        eyre!("OMDb API key not found. Set FILMDEX_API_KEY or OMDB_API_KEY, or put api.key in the config file.")
      })
  }

  pub fn api_url(&self) -> Result<Url> {
    Url::parse(&self.api.url).map_err(|e| eyre!("Invalid API URL {}: {}", self.api.url, e))
  }

  /// Hostname that selects the network-first gateway policy.
  pub fn api_host(&self) -> Result<String> {
    let url = self.api_url()?;
    url
      .host_str()
      .map(String::from)
      .ok_or_else(|| eyre!("API URL has no host: {}", self.api.url))
  }

  pub fn data_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.cache.dir {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("filmdex"))
  }

  pub fn store_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("movies.db"))
  }

  pub fn http_cache_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("http_cache.db"))
  }

  /// Parsed precache manifest; invalid entries are skipped with a warning.
  pub fn precache_manifest(&self) -> Vec<Url> {
    self
      .cache
      .precache
      .iter()
      .filter_map(|raw| match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(e) => {
          tracing::warn!("skipping invalid precache URL {}: {}", raw, e);
          None
        }
      })
      .collect()
  }
}

//! Request gateway: transparent per-request caching policies.
//!
//! The gateway sits between the application and the network and applies one
//! of two policies by destination:
//! - requests to the remote data API are network-first, mirrored into the
//!   API-generation cache and replayed from it when the network fails;
//! - everything else is cache-first, fetched and cached opportunistically on
//!   a miss.
//!
//! Unlike a load-time singleton, the gateway is an explicit handle with an
//! observable lifecycle: `install` precaches a fixed asset manifest,
//! `activate` purges stale cache generations and takes over request routing.

mod http_cache;
mod transport;

pub use http_cache::HttpCache;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport, TransportError};

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use url::Url;

/// Gateway lifecycle, observable from the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
  Unregistered,
  Installing,
  Installed,
  Active,
  Retired,
}

/// Caching gateway wrapping an inner transport.
///
/// Implements [`Transport`] itself, so callers issue requests through it
/// without being aware interception occurred.
pub struct FetchGateway<T: Transport> {
  transport: T,
  cache: Arc<HttpCache>,
  /// Hostname of the remote data API; selects the network-first policy
  api_host: String,
  static_generation: String,
  api_generation: String,
  state: Mutex<LifecycleState>,
}

impl<T: Transport> FetchGateway<T> {
  pub fn new(transport: T, cache: HttpCache, api_host: &str, cache_version: &str) -> Self {
    Self {
      transport,
      cache: Arc::new(cache),
      api_host: api_host.to_string(),
      static_generation: format!("static-{}", cache_version),
      api_generation: format!("api-{}", cache_version),
      state: Mutex::new(LifecycleState::Unregistered),
    }
  }

  #[allow(dead_code)]
  pub fn state(&self) -> LifecycleState {
    *self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn set_state(&self, state: LifecycleState) {
    *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
  }

  /// Durably write the fixed asset manifest into the static-generation
  /// cache. Succeeds only if every asset was fetched and stored; on failure
  /// the gateway returns to `Unregistered` and can be retried.
  pub async fn install(&self, manifest: &[Url]) -> color_eyre::Result<()> {
    self.set_state(LifecycleState::Installing);
    info!(assets = manifest.len(), "installing gateway, precaching manifest");

    for url in manifest {
      let request = HttpRequest::get(url.clone());
      let result = match self.transport.fetch(&request).await {
        Ok(response) => self.cache.put(&self.static_generation, &request, &response),
        Err(e) => Err(color_eyre::eyre::eyre!("precache fetch failed: {}", e)),
      };

      if let Err(e) = result {
        warn!(url = %url, "gateway install failed: {}", e);
        self.set_state(LifecycleState::Unregistered);
        return Err(e);
      }
    }

    self.set_state(LifecycleState::Installed);
    Ok(())
  }

  /// Take over request routing: delete every cache generation except the
  /// current static and API generations. The shell calls this immediately
  /// after a successful install rather than waiting for anything.
  pub fn activate(&self) -> color_eyre::Result<()> {
    let removed = self
      .cache
      .purge_except(&[&self.static_generation, &self.api_generation])?;
    if removed > 0 {
      info!(removed, "purged stale cache generations");
    }
    self.set_state(LifecycleState::Active);
    Ok(())
  }

  /// Mark this gateway as superseded by a newer generation.
  #[allow(dead_code)]
  pub fn retire(&self) {
    self.set_state(LifecycleState::Retired);
  }

  fn is_api_request(&self, request: &HttpRequest) -> bool {
    request.host() == Some(self.api_host.as_str())
  }

  /// Network-first with cache fallback: one network attempt, then at most
  /// one cache lookup.
  async fn network_first(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    match self.transport.fetch(request).await {
      Ok(response) => {
        // Mirror a clone into the API-generation cache; a failed write must
        // not fail the live response.
        if let Err(e) = self.cache.put(&self.api_generation, request, &response) {
          warn!(url = %request.url, "failed to mirror API response: {}", e);
        }
        Ok(response)
      }
      Err(network_err) => {
        debug!(url = %request.url, "network failed, trying API cache: {}", network_err);
        match self.cache.get(&self.api_generation, request) {
          Ok(Some(cached)) => Ok(cached),
          Ok(None) => Err(TransportError::CacheMiss(network_err.to_string())),
          Err(e) => {
            warn!(url = %request.url, "API cache lookup failed: {}", e);
            Err(TransportError::CacheMiss(network_err.to_string()))
          }
        }
      }
    }
  }

  /// Cache-first with network fallback; assets not in the install manifest
  /// become cached opportunistically after their first fetch.
  async fn cache_first(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    match self.cache.get(&self.static_generation, request) {
      Ok(Some(cached)) => return Ok(cached),
      Ok(None) => {}
      Err(e) => warn!(url = %request.url, "static cache lookup failed: {}", e),
    }

    let response = self.transport.fetch(request).await?;
    if let Err(e) = self.cache.put(&self.static_generation, request, &response) {
      warn!(url = %request.url, "failed to cache static asset: {}", e);
    }
    Ok(response)
  }
}

#[async_trait]
impl<T: Transport> Transport for FetchGateway<T> {
  async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    if self.is_api_request(request) {
      self.network_first(request).await
    } else {
      self.cache_first(request).await
    }
  }
}

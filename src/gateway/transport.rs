//! Transport seam between the gateway and the actual network.
//!
//! Everything above this trait issues requests without knowing whether they
//! are answered live or from a cache generation.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use url::Url;

/// Errors from a transport attempt. Connection failures and offline cache
/// misses are distinct variants, but callers treat both as one failure path.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
  #[error("connection failed: {0}")]
  Connection(String),
  /// Network attempt failed and no cached response existed for the request.
  #[error("offline with no cached response: {0}")]
  CacheMiss(String),
}

/// An outgoing HTTP request, identified by method + absolute URL.
#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: String,
  pub url: Url,
}

impl HttpRequest {
  pub fn get(url: Url) -> Self {
    Self {
      method: "GET".to_string(),
      url,
    }
  }

  /// Stable fixed-length cache key for the request identity.
  pub fn request_key(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.method.as_bytes());
    hasher.update(b" ");
    hasher.update(self.url.as_str().as_bytes());
    hex::encode(hasher.finalize())
  }

  pub fn host(&self) -> Option<&str> {
    self.url.host_str()
  }
}

/// A raw HTTP response, as stored and replayed by the gateway.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Trait for anything that can answer an HTTP request.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by reqwest.
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
    }
  }
}

impl Default for HttpTransport {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    let method = reqwest::Method::from_bytes(request.method.as_bytes())
      .map_err(|e| TransportError::Connection(format!("invalid method: {}", e)))?;

    let response = self
      .client
      .request(method, request.url.clone())
      .send()
      .await
      .map_err(|e| TransportError::Connection(e.to_string()))?;

    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let body = response
      .bytes()
      .await
      .map_err(|e| TransportError::Connection(e.to_string()))?
      .to_vec();

    Ok(HttpResponse {
      status,
      content_type,
      body,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_request_key_includes_method_and_url() {
    let url = Url::parse("https://www.omdbapi.com/?s=batman").unwrap();
    let get = HttpRequest::get(url.clone());
    let head = HttpRequest {
      method: "HEAD".to_string(),
      url,
    };

    assert_ne!(get.request_key(), head.request_key());
    // Stable across calls
    assert_eq!(get.request_key(), get.request_key());
  }

  #[test]
  fn test_request_key_differs_per_url() {
    let a = HttpRequest::get(Url::parse("https://www.omdbapi.com/?s=batman").unwrap());
    let b = HttpRequest::get(Url::parse("https://www.omdbapi.com/?s=superman").unwrap());
    assert_ne!(a.request_key(), b.request_key());
  }
}

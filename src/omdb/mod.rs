//! OMDb API integration: wire types, the typed client, and the cached client
//! that layers the structured record store on top of it.

pub mod api_types;
pub mod cached_client;
pub mod client;
pub mod types;

pub use cached_client::{CachedClient, Lookup, LookupError, Source};
pub use client::{FetchError, OmdbClient};
pub use types::{Movie, Rating};

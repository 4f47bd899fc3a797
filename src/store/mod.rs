//! Structured record store: durable, queryable local persistence of movie
//! records, and the canonical fallback data source when a network-dependent
//! operation fails.
//!
//! Records are keyed by identifier (last write wins) with a non-unique
//! secondary index on title used only for substring-filtered retrieval.

mod storage;

pub use storage::{MovieStore, SqliteStore, StoreError, StoreHandle};

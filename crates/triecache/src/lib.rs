//! # triecache
//!
//! Read-through lookup cache in front of the triedb prefix index.
//!
//! ## Architecture
//! - **LookupCache**: AHash map of query signature to result, TTL per entry
//! - **QuerySignature**: normalized key covering prefix, filter and window
//! - **TrieCache**: case folding, cache probe, index fallback, invalidation
//!
//! Mutations invalidate before they return, and a generation check keeps
//! results computed before a mutation from entering the cache after it.

#![warn(missing_docs)]

mod cache;
mod lookup;
mod query;
mod signature;
mod stats;

pub use cache::{CacheConfig, InvalidationPolicy, TrieCache, DEFAULT_TTL};
pub use lookup::LookupCache;
pub use query::{normalize, Query, SearchPage};
pub use signature::QuerySignature;
pub use stats::{CacheStats, StatsSnapshot};

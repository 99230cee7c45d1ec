//! Cache Module
//!
//! Storage key derivation, content classification and the on-disk response
//! store with exact and approximate lookup.

mod backend;
mod entry;
mod format;
pub mod fuzzy;
mod key;
mod locks;
mod stats;
mod store;


// Re-export public types
pub use backend::{FsBackend, StorageBackend, PARTIAL_PREFIX};
pub use entry::{CacheEntry, MatchKind};
pub use format::FormatTag;
pub use fuzzy::{FuzzyMatch, SIMILARITY_THRESHOLD};
pub use key::{canonicalize_query, StorageKey};
pub use locks::{KeyGuard, KeyLocks};
pub use stats::{CacheCounters, CacheStats};
pub use store::CacheStore;

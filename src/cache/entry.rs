//! Cache Entry Module
//!
//! A stored response body as read back from the store.

use bytes::Bytes;

use crate::cache::FormatTag;

// == Match Kind ==
/// How a lookup located the entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    /// The storage key itself
    Exact,
    /// A sibling accepted by the fuzzy matcher
    Fuzzy { ratio: f64 },
}

// == Cache Entry ==
/// A cached response body with the format recovered from its extension.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Storage path the body was read from
    pub path: String,
    /// Stored body, byte-for-byte as received from upstream
    pub body: Bytes,
    /// Format derived from the artifact's extension
    pub format: FormatTag,
    /// Lookup route that produced this entry
    pub matched: MatchKind,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry for a body stored at `path`.
    ///
    /// Paths without a known extension are treated as `Default` format.
    pub fn new(path: impl Into<String>, body: Bytes, matched: MatchKind) -> Self {
        let path = path.into();
        let format = path
            .rsplit_once('.')
            .and_then(|(_, ext)| FormatTag::from_extension(ext))
            .unwrap_or(FormatTag::Default);

        Self {
            path,
            body,
            format,
            matched,
        }
    }

    /// Content type to serve this entry with.
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// True if the entry came from the fuzzy matcher.
    pub fn is_fuzzy(&self) -> bool {
        matches!(self.matched, MatchKind::Fuzzy { .. })
    }
}

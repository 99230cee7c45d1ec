//! Fuzzy Matcher Module
//!
//! Approximate key lookup: picks the stored sibling whose base name is
//! closest to the target by edit-distance similarity.

use std::path::Path;

use crate::cache::{FormatTag, StorageBackend};
use crate::error::Result;

/// A sibling is accepted only when its similarity is strictly above this.
pub const SIMILARITY_THRESHOLD: f64 = 0.9;

// == Fuzzy Match ==
/// Best sibling found for a target storage path.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    /// Storage path of the matched artifact
    pub path: String,
    /// Similarity in `[0, 1]`
    pub ratio: f64,
}

// == Similarity ==
/// Similarity ratio `1 - distance / max(len(a), len(b))`, lengths in chars.
///
/// Two empty names are identical (ratio 1.0).
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    let distance = strsim::levenshtein(a, b);
    1.0 - distance as f64 / longest as f64
}

/// File name without its final extension.
pub fn base_name(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
}

// == Select Best ==
/// Picks the candidate with the highest similarity to `target`.
///
/// Candidates are scanned in the order given; on equal ratios the first one
/// wins. Returns `None` unless the best ratio exceeds [`SIMILARITY_THRESHOLD`].
pub fn select_best<'a, I>(target: &str, candidates: I) -> Option<FuzzyMatch>
where
    I: IntoIterator<Item = &'a str>,
{
    let target_base = base_name(target);
    let mut best: Option<FuzzyMatch> = None;

    for candidate in candidates {
        let ratio = similarity(target_base, base_name(candidate));
        if best.as_ref().map_or(true, |b| ratio > b.ratio) {
            best = Some(FuzzyMatch {
                path: candidate.to_string(),
                ratio,
            });
        }
    }

    best.filter(|b| b.ratio > SIMILARITY_THRESHOLD)
}

// == Nearest Match ==
/// Scans the siblings of `target` in `backend` and returns the closest one.
///
/// The backend lists siblings sorted by name, so ties resolve
/// lexicographically regardless of directory enumeration order.
pub async fn nearest_match(backend: &dyn StorageBackend, target: &str) -> Result<Option<FuzzyMatch>> {
    let siblings = backend.list_siblings(target).await?;
    let candidates = siblings.iter().map(String::as_str).filter(|sibling| {
        sibling
            .rsplit_once('.')
            .is_some_and(|(_, ext)| FormatTag::from_extension(ext).is_some())
    });
    Ok(select_best(target, candidates))
}

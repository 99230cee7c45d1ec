//! Key Builder Module
//!
//! Derives the deterministic storage key for a proxied request.
//!
//! A key serializes as `ENV/TYPE/METHOD/client/path?canonical-query`; the
//! format extension is appended later, once the response content is known.

use std::fmt;

use crate::cache::FormatTag;
use crate::config::Config;

// == Storage Key ==
/// Canonical storage key of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    method: String,
    rendered: String,
}

impl StorageKey {
    // == Constructor ==
    /// Builds a key from the raw request attributes.
    ///
    /// `environment` and `resource_type` are upper-cased, the trailing
    /// separator of `path` is stripped and `raw_query` is canonicalized
    /// with [`canonicalize_query`]. An empty `client_id` is a valid segment.
    pub fn new(
        environment: &str,
        resource_type: &str,
        method: &str,
        client_id: &str,
        path: &str,
        raw_query: &str,
    ) -> Self {
        let environment = environment.to_uppercase();
        let resource_type = resource_type.to_uppercase();
        let path = path.trim_end_matches('/').trim_start_matches('/').to_string();
        let query = canonicalize_query(raw_query);

        let mut rendered = format!("{}/{}/{}/{}", environment, resource_type, method, client_id);
        if !path.is_empty() {
            rendered.push('/');
            rendered.push_str(&path);
        }
        if !query.is_empty() {
            rendered.push('?');
            rendered.push_str(&query);
        }

        Self {
            method: method.to_string(),
            rendered,
        }
    }

    /// Builds a key using the environment and resource tags from `config`.
    pub fn build(
        config: &Config,
        method: &str,
        client_id: &str,
        path: &str,
        raw_query: Option<&str>,
    ) -> Self {
        Self::new(
            &config.environment,
            &config.resource_type,
            method,
            client_id,
            path,
            raw_query.unwrap_or_default(),
        )
    }

    /// Serialized key without extension.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// HTTP method segment.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Storage path of the artifact holding `format` content.
    pub fn with_extension(&self, format: FormatTag) -> String {
        format!("{}{}", self.rendered, format.extension())
    }

    /// Every storage path this key may occupy, in lookup order.
    pub fn candidate_paths(&self) -> impl Iterator<Item = String> + '_ {
        FormatTag::STORED_EXTENSIONS
            .iter()
            .map(move |ext| format!("{}{}", self.rendered, ext))
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

// == Query Canonicalization ==
/// Canonicalizes a raw query string.
///
/// Pairs without `=` are dropped, as are pairs whose name or value holds a
/// malformed percent escape or decodes to invalid UTF-8. Surviving names and
/// values are decoded (`+` as space) and re-encoded, then sorted by
/// `(name, value)` and joined with `&`. Applying this to its own output is a
/// no-op.
pub fn canonicalize_query(raw_query: &str) -> String {
    let mut pairs: Vec<(String, String)> = raw_query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter_map(|(name, value)| Some((reencode(name)?, reencode(value)?)))
        .collect();

    pairs.sort();

    pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Decodes one query component and encodes it back in canonical form.
fn reencode(component: &str) -> Option<String> {
    if has_malformed_escape(component) {
        return None;
    }
    let spaced = component.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).ok()?;
    Some(urlencoding::encode(&decoded).replace("%20", "+"))
}

/// True when a `%` is not followed by two hex digits.
fn has_malformed_escape(component: &str) -> bool {
    let bytes = component.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !(bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(method: &str, client: &str, path: &str, query: &str) -> StorageKey {
        StorageKey::new("dev", "api", method, client, path, query)
    }

    #[test]
    fn test_key_layout() {
        let k = key("GET", "U1", "/items", "b=2&a=1");
        assert_eq!(k.as_str(), "DEV/API/GET/U1/items?a=1&b=2");
        assert_eq!(k.with_extension(FormatTag::Json), "DEV/API/GET/U1/items?a=1&b=2.json");
    }

    #[test]
    fn test_trailing_separator_stripped() {
        assert_eq!(key("GET", "U1", "/items/", "").as_str(), "DEV/API/GET/U1/items");
        assert_eq!(key("GET", "U1", "/", "").as_str(), "DEV/API/GET/U1");
    }

    #[test]
    fn test_empty_client_id_is_valid() {
        assert_eq!(key("GET", "", "/items", "").as_str(), "DEV/API/GET//items");
    }

    #[test]
    fn test_no_query_suffix_when_empty() {
        assert_eq!(key("GET", "U1", "/items", "").as_str(), "DEV/API/GET/U1/items");
        assert_eq!(key("GET", "U1", "/items", "junk&more").as_str(), "DEV/API/GET/U1/items");
    }

    #[test]
    fn test_build_uses_config_tags() {
        let config = Config {
            environment: "staging".to_string(),
            resource_type: "web".to_string(),
            ..Config::default()
        };
        let k = StorageKey::build(&config, "POST", "abc", "/orders", Some("id=7"));
        assert_eq!(k.as_str(), "STAGING/WEB/POST/abc/orders?id=7");
        assert_eq!(k.method(), "POST");
    }

    #[test]
    fn test_candidate_paths_order() {
        let k = key("GET", "U1", "/items", "");
        let paths: Vec<String> = k.candidate_paths().collect();
        assert_eq!(
            paths,
            vec![
                "DEV/API/GET/U1/items.json",
                "DEV/API/GET/U1/items.html",
                "DEV/API/GET/U1/items.xml",
            ]
        );
    }

    #[test]
    fn test_canonicalize_drops_pairs_without_equals() {
        assert_eq!(canonicalize_query("a=1&flag&b=2"), "a=1&b=2");
        assert_eq!(canonicalize_query(""), "");
        assert_eq!(canonicalize_query("&&"), "");
    }

    #[test]
    fn test_canonicalize_keeps_empty_values() {
        assert_eq!(canonicalize_query("a=&b=1"), "a=&b=1");
    }

    #[test]
    fn test_canonicalize_normalizes_space_encodings() {
        assert_eq!(canonicalize_query("q=hello%20world"), "q=hello+world");
        assert_eq!(canonicalize_query("q=hello+world"), "q=hello+world");
    }

    #[test]
    fn test_canonicalize_encodes_reserved_characters() {
        assert_eq!(canonicalize_query("path=a/b"), "path=a%2Fb");
        assert_eq!(canonicalize_query("plus=%2B"), "plus=%2B");
        assert_eq!(canonicalize_query("x=a%2fb"), "x=a%2Fb");
    }

    #[test]
    fn test_canonicalize_drops_malformed_escapes() {
        assert_eq!(canonicalize_query("bad=%zz&good=1"), "good=1");
        assert_eq!(canonicalize_query("bad=50%&good=1"), "good=1");
        assert_eq!(canonicalize_query("%G1=x"), "");
    }

    #[test]
    fn test_canonicalize_drops_invalid_utf8() {
        assert_eq!(canonicalize_query("bin=%FF%FE&ok=1"), "ok=1");
    }

    #[test]
    fn test_canonicalize_value_with_equals() {
        assert_eq!(canonicalize_query("expr=a=b"), "expr=a%3Db");
    }

    #[test]
    fn test_canonicalize_sorts_repeated_names() {
        assert_eq!(canonicalize_query("t=2&t=1&a=9"), "a=9&t=1&t=2");
    }

    #[test]
    fn test_canonicalize_idempotent() {
        let once = canonicalize_query("z=%7E&y=a b&x=%E2%9C%93");
        assert_eq!(canonicalize_query(&once), once);
    }

    #[test]
    fn test_has_malformed_escape() {
        assert!(!has_malformed_escape("abc%2F"));
        assert!(has_malformed_escape("abc%2"));
        assert!(has_malformed_escape("%"));
    }
}

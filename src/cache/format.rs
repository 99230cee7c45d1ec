//! Content Classifier Module
//!
//! Maps an upstream media type to the storage format of the cached body.

use std::fmt;

// == Format Tag ==
/// Storage format of a cached response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    Json,
    Html,
    Xml,
    /// Absent or unrecognized media type
    Default,
}

impl FormatTag {
    /// Extensions probed on lookup, in classifier priority order.
    pub const STORED_EXTENSIONS: [&'static str; 3] = [".json", ".html", ".xml"];

    // == Classify ==
    /// Classifies a declared media type by substring containment.
    ///
    /// Priority is `application/json`, then `text/html`, then `application/xml`.
    pub fn classify(media_type: &str) -> Self {
        if media_type.contains("application/json") {
            FormatTag::Json
        } else if media_type.contains("text/html") {
            FormatTag::Html
        } else if media_type.contains("application/xml") {
            FormatTag::Xml
        } else {
            FormatTag::Default
        }
    }

    /// File extension (with leading dot) for this format.
    ///
    /// `Default` shares the JSON extension.
    pub fn extension(self) -> &'static str {
        match self {
            FormatTag::Json | FormatTag::Default => ".json",
            FormatTag::Html => ".html",
            FormatTag::Xml => ".xml",
        }
    }

    /// Recovers the format from a stored file extension (without the dot).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "json" => Some(FormatTag::Json),
            "html" => Some(FormatTag::Html),
            "xml" => Some(FormatTag::Xml),
            _ => None,
        }
    }

    /// Content type used when serving a stored artifact.
    pub fn content_type(self) -> &'static str {
        match self {
            FormatTag::Json | FormatTag::Default => "application/json",
            FormatTag::Html => "text/html; charset=utf-8",
            FormatTag::Xml => "application/xml",
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatTag::Json => "json",
            FormatTag::Html => "html",
            FormatTag::Xml => "xml",
            FormatTag::Default => "default",
        };
        f.write_str(name)
    }
}

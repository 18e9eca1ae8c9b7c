//! In-memory view of an HLS media playlist as the rewriter sees it.
//!
//! Only the pieces the interception layer cares about are modelled: how each
//! line is classified, the `#EXTINF` / URI pairs, and the summed duration.

use thiserror::Error;

/// Duration tag prefix (`#EXTINF:<duration>,[<title>]`)
pub const EXTINF_PREFIX: &str = "#EXTINF:";

/// A single line of manifest text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManifestLine<'a> {
    /// Empty or whitespace-only line
    Blank,
    /// `#` line that is not an `#EXT` tag
    Comment(&'a str),
    /// Any `#EXT` directive other than `#EXTINF`
    Tag(&'a str),
    /// `#EXTINF:` line, with the raw payload after the prefix
    Duration(&'a str),
    /// Segment (or playlist) reference
    Uri(&'a str),
}

impl<'a> ManifestLine<'a> {
    /// Classify a raw line. A trailing `\r` is ignored.
    pub fn classify(line: &'a str) -> Self {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            ManifestLine::Blank
        } else if let Some(payload) = line.strip_prefix(EXTINF_PREFIX) {
            ManifestLine::Duration(payload)
        } else if line.starts_with("#EXT") {
            ManifestLine::Tag(line)
        } else if line.starts_with('#') {
            ManifestLine::Comment(line)
        } else {
            ManifestLine::Uri(line)
        }
    }
}

/// A duration tag and the URI it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEntry {
    /// Segment duration in seconds
    pub duration: f64,
    /// URI exactly as it appeared upstream
    pub raw_uri: String,
}

/// Output of a rewrite pass.
///
/// Built once per session and then shared read-only between every request
/// that reads the session cache.
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenManifest {
    /// Full manifest text with segment URIs made absolute
    pub text: String,
    /// Sum of every segment duration, in encounter order
    pub total_duration: f64,
    /// Segment entries in encounter order
    pub segments: Vec<SegmentEntry>,
}

impl RewrittenManifest {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

/// Reasons a manifest cannot be rewritten. Line numbers are 1-based.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManifestError {
    #[error("#EXTINF on line {line} is not followed by a segment URI")]
    MissingUri { line: usize },

    #[error("#EXTINF on line {line} has an invalid duration {value:?}")]
    InvalidDuration { line: usize, value: String },

    #[error("base URL {0:?} is not an absolute URL")]
    InvalidBaseUrl(String),

    #[error("manifest is not valid UTF-8")]
    InvalidUtf8,
}

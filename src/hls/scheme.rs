//! Virtual URL scheme used to route intercepted manifest requests.
//!
//! The three endpoints of a session share the real manifest URL and differ
//! only in their scheme token, e.g. `https://h/st/playlist.m3u8` becomes
//! `main://h/st/playlist.m3u8`, `fragments://h/st/playlist.m3u8` and
//! `subtitles://h/st/playlist.m3u8`.

use crate::error::{Result, SubstitchError};
use serde::Serialize;
use std::fmt;

/// Scheme restored when mapping a virtual URL back to the network.
pub const ORIGINAL_SCHEME: &str = "https";

/// Endpoint kind, carried as the URL scheme token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualScheme {
    /// Synthesized master playlist
    Main,
    /// Rewritten upstream media playlist
    Fragments,
    /// Synthesized subtitle playlist
    Subtitles,
}

impl VirtualScheme {
    pub const ALL: [VirtualScheme; 3] = [Self::Main, Self::Fragments, Self::Subtitles];

    pub fn token(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Fragments => "fragments",
            Self::Subtitles => "subtitles",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|scheme| scheme.token().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for VirtualScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// An inbound request for a virtual endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualRequest {
    pub scheme: VirtualScheme,
    pub original_url: String,
}

/// The three virtual endpoints derived from one real manifest URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualUrls {
    pub main_url: String,
    pub fragments_url: String,
    pub subtitles_url: String,
}

impl VirtualUrls {
    /// Derive all virtual endpoints of `url`. `None` if it has no scheme separator.
    pub fn derive(url: &str) -> Option<Self> {
        Some(Self {
            main_url: to_virtual(url, VirtualScheme::Main)?,
            fragments_url: to_virtual(url, VirtualScheme::Fragments)?,
            subtitles_url: to_virtual(url, VirtualScheme::Subtitles)?,
        })
    }
}

/// Replace the scheme token of `url`, keeping everything from the first `:`.
pub fn to_virtual(url: &str, scheme: VirtualScheme) -> Option<String> {
    let idx = url.find(':')?;
    Some(format!("{}{}", scheme.token(), &url[idx..]))
}

/// Map a virtual URL back to its network location (always `https`).
pub fn to_original(url: &str) -> Option<String> {
    let idx = url.find(':')?;
    Some(format!("{}{}", ORIGINAL_SCHEME, &url[idx..]))
}

/// Classify an inbound URL by its scheme token.
///
/// # Errors
/// [`SubstitchError::InvalidVirtualUrl`] when the URL has no scheme separator
/// or its scheme is not one of the reserved tokens.
pub fn classify(url: &str) -> Result<VirtualRequest> {
    let (token, _) = url
        .split_once(':')
        .ok_or_else(|| SubstitchError::InvalidVirtualUrl(format!("no scheme in {:?}", url)))?;

    let scheme = VirtualScheme::from_token(token).ok_or_else(|| {
        SubstitchError::InvalidVirtualUrl(format!("unknown scheme {:?} in {:?}", token, url))
    })?;

    Ok(VirtualRequest {
        scheme,
        original_url: url.to_string(),
    })
}

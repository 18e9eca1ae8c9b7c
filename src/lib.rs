//! Substitch attaches an externally hosted subtitle track to an on-demand HLS
//! stream without touching the origin manifest.
//!
//! A player-side resource loader forwards requests for three virtual URLs
//! (`main://`, `fragments://`, `subtitles://`) to an [`session::InterceptSession`],
//! which fetches the real media playlist once, rewrites its segment URIs to
//! absolute form, and answers with a synthesized master playlist, the
//! rewritten media playlist, or a single-entry subtitle playlist.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod hls;
pub mod metrics;
pub mod server;
pub mod session;

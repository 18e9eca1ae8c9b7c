use crate::hls::synth::{DEFAULT_BANDWIDTH, DEFAULT_LANGUAGE, DEFAULT_NAME, SubtitleTrack};
use crate::session::SessionOptions;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub is_dev: bool,
    /// Real manifest used when a session is created without one
    pub manifest_url: String,
    /// Subtitle resource used when a session is created without one
    pub subtitle_url: String,
    /// Session TTL in seconds (default: 300)
    pub session_ttl_secs: u64,
    /// Worker threads of the interception runtime (default: 4)
    pub worker_threads: usize,
    /// How long Fragments/Subtitles wait for an in-flight fetch; 0 waits indefinitely
    pub ready_timeout_secs: u64,
    /// Transport timeout for the upstream manifest fetch; 0 disables it
    pub fetch_timeout_secs: u64,
    /// Subtitle rendition name advertised in the master playlist
    pub subtitle_name: String,
    /// Subtitle rendition language advertised in the master playlist
    pub subtitle_language: String,
    /// Bandwidth advertised for the single variant stream
    pub stream_bandwidth: u64,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, PORT, MANIFEST_URL
    /// and SUBTITLE_URL are required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        // Dev defaults point at the built-in demo content
        let manifest_url = if is_dev {
            env::var("MANIFEST_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}/demo/playlist.m3u8", port))
        } else {
            env::var("MANIFEST_URL").map_err(|_| "MANIFEST_URL is required in production")?
        };

        let subtitle_url = if is_dev {
            env::var("SUBTITLE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}/demo/subtitles.vtt", port))
        } else {
            env::var("SUBTITLE_URL").map_err(|_| "SUBTITLE_URL is required in production")?
        };

        let session_ttl_secs: u64 = env::var("SESSION_TTL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        let worker_threads: usize = env::var("WORKER_THREADS")
            .unwrap_or_else(|_| "4".to_string())
            .parse::<usize>()
            .unwrap_or(4)
            .max(1);

        let ready_timeout_secs: u64 = env::var("READY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .unwrap_or(0);

        let fetch_timeout_secs: u64 = env::var("FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let subtitle_name = env::var("SUBTITLE_NAME").unwrap_or_else(|_| DEFAULT_NAME.to_string());
        let subtitle_language =
            env::var("SUBTITLE_LANGUAGE").unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string());

        let stream_bandwidth: u64 = env::var("STREAM_BANDWIDTH")
            .unwrap_or_else(|_| DEFAULT_BANDWIDTH.to_string())
            .parse()
            .unwrap_or(DEFAULT_BANDWIDTH);

        Ok(Config {
            port,
            is_dev,
            manifest_url,
            subtitle_url,
            session_ttl_secs,
            worker_threads,
            ready_timeout_secs,
            fetch_timeout_secs,
            subtitle_name,
            subtitle_language,
            stream_bandwidth,
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }

    /// Options applied to every session created by the server
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            track: SubtitleTrack {
                name: self.subtitle_name.clone(),
                language: self.subtitle_language.clone(),
                bandwidth: self.stream_bandwidth,
                ..Default::default()
            },
            ready_timeout: (self.ready_timeout_secs > 0)
                .then(|| Duration::from_secs(self.ready_timeout_secs)),
        }
    }
}

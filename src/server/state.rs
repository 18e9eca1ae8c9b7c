use crate::{config::Config, fetcher::HttpFetcher, session::SessionManager};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Live interception sessions
    pub sessions: SessionManager,
    /// Process start, for health reporting
    pub started_at: Instant,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: Config) -> Self {
        let http_client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to create HTTP client");

        let fetcher = HttpFetcher::new(http_client, config.fetch_timeout());
        let sessions = SessionManager::new(
            Arc::new(fetcher),
            config.session_options(),
            config.session_ttl(),
        );

        Self {
            config: Arc::new(config),
            sessions,
            started_at: Instant::now(),
        }
    }
}

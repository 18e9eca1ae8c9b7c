use crate::{
    error::{Result, SubstitchError},
    fetcher::ManifestFetcher,
    metrics,
    session::intercept::{InterceptSession, SessionOptions},
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::info;
use uuid::Uuid;

/// Registry entry for one live session
#[derive(Debug, Clone)]
struct Entry {
    session: Arc<InterceptSession>,
    last_accessed: SystemTime,
}

/// Tracks live interception sessions and expires idle ones.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<DashMap<String, Entry>>,
    fetcher: Arc<dyn ManifestFetcher>,
    options: SessionOptions,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(fetcher: Arc<dyn ManifestFetcher>, options: SessionOptions, ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            fetcher,
            options,
            ttl,
        }
    }

    /// Start a new session for the given manifest and subtitle resource.
    pub fn create(&self, manifest_url: &str, subtitle_url: &str) -> Result<Arc<InterceptSession>> {
        let session_id = Uuid::new_v4().simple().to_string();
        let session = Arc::new(InterceptSession::new(
            session_id.clone(),
            manifest_url,
            subtitle_url,
            self.options.clone(),
            Arc::clone(&self.fetcher),
        )?);

        self.sessions.insert(
            session_id.clone(),
            Entry {
                session: Arc::clone(&session),
                last_accessed: SystemTime::now(),
            },
        );
        metrics::set_active_sessions(self.sessions.len());
        info!(
            "Session {} created for {} with subtitles {}",
            session_id, manifest_url, subtitle_url
        );

        Ok(session)
    }

    /// Look up a session and refresh its last-accessed time.
    pub fn get(&self, session_id: &str) -> Result<Arc<InterceptSession>> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SubstitchError::SessionNotFound(session_id.to_string()))?;
        entry.last_accessed = SystemTime::now();
        Ok(Arc::clone(&entry.session))
    }

    /// End a session. Its cache is dropped once in-flight requests finish.
    pub fn remove(&self, session_id: &str) -> Option<Arc<InterceptSession>> {
        let removed = self.sessions.remove(session_id).map(|(_, entry)| entry.session);
        if removed.is_some() {
            info!("Session {} ended", session_id);
            metrics::set_active_sessions(self.sessions.len());
        }
        removed
    }

    /// Remove sessions idle for longer than the TTL
    pub fn cleanup_expired(&self) {
        let now = SystemTime::now();
        self.sessions.retain(|_, entry| {
            if let Ok(elapsed) = now.duration_since(entry.last_accessed) {
                elapsed < self.ttl
            } else {
                true
            }
        });
        metrics::set_active_sessions(self.sessions.len());
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

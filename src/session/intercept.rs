//! Per-session interception state machine.
//!
//! ```text
//! Idle --Main--> FetchInFlight --fetch ok + rewrite ok--> Ready
//!                              \--fetch or rewrite error--> Failed
//! ```
//!
//! Phase and cache share one `watch` channel. The fetch task is the only
//! writer and publishes the finished [`RewrittenManifest`] in a single store,
//! so a reader observes either an unsettled phase or the complete value.

use crate::{
    error::{Result, SubstitchError},
    fetcher::{FetchError, ManifestFetcher},
    hls::{
        model::RewrittenManifest,
        rewriter,
        scheme::{self, VirtualRequest, VirtualScheme, VirtualUrls},
        synth::{self, SubtitleTrack},
    },
    metrics,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Lifecycle of a session's upstream manifest.
#[derive(Debug, Clone)]
pub enum Phase {
    Idle,
    FetchInFlight,
    Ready(Arc<RewrittenManifest>),
    /// Terminal. Every later request replays this error.
    Failed(SubstitchError),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::FetchInFlight => "fetch_in_flight",
            Phase::Ready(_) => "ready",
            Phase::Failed(_) => "failed",
        }
    }

    /// Outcome of a settled phase, `None` while still idle or fetching.
    fn outcome(&self) -> Option<Result<Arc<RewrittenManifest>>> {
        match self {
            Phase::Ready(manifest) => Some(Ok(Arc::clone(manifest))),
            Phase::Failed(e) => Some(Err(e.clone())),
            Phase::Idle | Phase::FetchInFlight => None,
        }
    }
}

/// Per-session tunables.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub track: SubtitleTrack,
    /// Upper bound on how long Fragments/Subtitles wait for an in-flight
    /// fetch. `None` waits until the fetch settles.
    pub ready_timeout: Option<Duration>,
}

/// One playback session: the real manifest, the subtitle resource and the
/// fetch-once cache of the rewritten manifest.
pub struct InterceptSession {
    id: String,
    manifest_url: String,
    subtitle_url: String,
    urls: VirtualUrls,
    options: SessionOptions,
    fetcher: Arc<dyn ManifestFetcher>,
    phase: Arc<watch::Sender<Phase>>,
    fetches: Arc<AtomicUsize>,
}

impl InterceptSession {
    /// # Errors
    /// [`SubstitchError::InvalidOrigin`] if the manifest URL has no scheme
    /// separator and no virtual endpoints can be derived from it.
    pub fn new(
        id: impl Into<String>,
        manifest_url: impl Into<String>,
        subtitle_url: impl Into<String>,
        options: SessionOptions,
        fetcher: Arc<dyn ManifestFetcher>,
    ) -> Result<Self> {
        let manifest_url = manifest_url.into();
        let urls = VirtualUrls::derive(&manifest_url).ok_or_else(|| {
            SubstitchError::InvalidOrigin(format!("No scheme in manifest URL: {}", manifest_url))
        })?;

        Ok(Self {
            id: id.into(),
            manifest_url,
            subtitle_url: subtitle_url.into(),
            urls,
            options,
            fetcher,
            phase: Arc::new(watch::Sender::new(Phase::Idle)),
            fetches: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }

    pub fn subtitle_url(&self) -> &str {
        &self.subtitle_url
    }

    pub fn urls(&self) -> &VirtualUrls {
        &self.urls
    }

    /// Snapshot of the current phase.
    pub fn phase(&self) -> Phase {
        self.phase.borrow().clone()
    }

    /// Number of upstream fetches started by this session (0 or 1).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Classify `url` and answer it.
    pub async fn load(&self, url: &str) -> Result<Bytes> {
        let request = scheme::classify(url)?;
        self.handle(&request).await
    }

    /// Answer one virtual request with manifest bytes.
    pub async fn handle(&self, request: &VirtualRequest) -> Result<Bytes> {
        debug!(
            "Session {}: {} request for {}",
            self.id, request.scheme, request.original_url
        );

        match request.scheme {
            VirtualScheme::Main => {
                self.await_main().await?;
                Ok(Bytes::from(self.master_playlist()))
            }
            VirtualScheme::Fragments => {
                let manifest = self.await_ready(request.scheme).await?;
                Ok(Bytes::from(manifest.text.clone()))
            }
            VirtualScheme::Subtitles => {
                let manifest = self.await_ready(request.scheme).await?;
                Ok(Bytes::from(synth::build_subtitle_playlist(
                    manifest.total_duration,
                    &self.subtitle_url,
                )))
            }
        }
    }

    /// Master playlist text. Deterministic, so repeated Main requests are
    /// byte-identical.
    pub fn master_playlist(&self) -> String {
        synth::build_master(
            &self.urls.fragments_url,
            &self.urls.subtitles_url,
            &self.options.track,
        )
    }

    /// Start the upstream fetch if nobody has yet, then wait for it to settle.
    async fn await_main(&self) -> Result<Arc<RewrittenManifest>> {
        let mut start = false;
        self.phase.send_if_modified(|phase| {
            if matches!(phase, Phase::Idle) {
                *phase = Phase::FetchInFlight;
                start = true;
                true
            } else {
                false
            }
        });

        if start {
            self.spawn_fetch();
        }

        self.wait_settled(None).await
    }

    /// Fragments/Subtitles: serve from cache, wait on an in-flight fetch, or
    /// fail fast when no Main request has been seen.
    async fn await_ready(&self, scheme: VirtualScheme) -> Result<Arc<RewrittenManifest>> {
        let current = self.phase();
        if let Some(outcome) = current.outcome() {
            return outcome;
        }
        if matches!(current, Phase::Idle) {
            return Err(SubstitchError::NotReady(format!(
                "{} requested before the main playlist of session {}",
                scheme, self.id
            )));
        }

        debug!(
            "Session {}: {} request waiting for upstream fetch",
            self.id, scheme
        );
        self.wait_settled(self.options.ready_timeout).await
    }

    async fn wait_settled(&self, limit: Option<Duration>) -> Result<Arc<RewrittenManifest>> {
        let mut rx = self.phase.subscribe();
        let settled = async {
            rx.wait_for(|phase| phase.outcome().is_some())
                .await
                .map(|phase| phase.clone())
                .map_err(|_| SubstitchError::NotReady(format!("session {} closed", self.id)))
        };

        let phase = match limit {
            Some(limit) => tokio::time::timeout(limit, settled).await.map_err(|_| {
                SubstitchError::NotReady(format!(
                    "upstream fetch for session {} still in flight after {:?}",
                    self.id, limit
                ))
            })??,
            None => settled.await?,
        };

        phase.outcome().unwrap_or_else(|| {
            Err(SubstitchError::NotReady(format!(
                "session {} is {}",
                self.id,
                phase.name()
            )))
        })
    }

    /// Run the fetch on its own task so it completes (and populates the
    /// cache) even if the Main request that triggered it is dropped.
    fn spawn_fetch(&self) {
        let fetcher = Arc::clone(&self.fetcher);
        let phase = Arc::clone(&self.phase);
        let url = self.manifest_url.clone();
        let session_id = self.id.clone();

        self.fetches.fetch_add(1, Ordering::Relaxed);
        metrics::record_upstream_fetch();
        info!("Session {}: fetching manifest {}", session_id, url);

        tokio::spawn(async move {
            // Inner task so a panicking fetcher still settles the phase
            let fetch_url = url.clone();
            let fetched = tokio::spawn(async move { fetcher.fetch(&fetch_url).await })
                .await
                .unwrap_or_else(|e| {
                    Err(FetchError::Aborted {
                        url: url.clone(),
                        reason: e.to_string(),
                    })
                });

            let next = match fetched {
                Ok(body) => match rewriter::rewrite_bytes(&body, &url) {
                    Ok(manifest) => {
                        info!(
                            "Session {}: ready with {} segments, {:.3}s total",
                            session_id,
                            manifest.segment_count(),
                            manifest.total_duration
                        );
                        Phase::Ready(Arc::new(manifest))
                    }
                    Err(e) => {
                        error!("Session {}: cannot rewrite {}: {}", session_id, url, e);
                        Phase::Failed(e.into())
                    }
                },
                Err(e) => {
                    error!("Session {}: {}", session_id, e);
                    metrics::record_origin_error();
                    Phase::Failed(e.into())
                }
            };
            phase.send_replace(next);
        });
    }
}

impl std::fmt::Debug for InterceptSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptSession")
            .field("id", &self.id)
            .field("manifest_url", &self.manifest_url)
            .field("subtitle_url", &self.subtitle_url)
            .field("phase", &self.phase.borrow().name())
            .finish()
    }
}

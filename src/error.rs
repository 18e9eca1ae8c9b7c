use crate::{fetcher::FetchError, hls::model::ManifestError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, SubstitchError>;

/// Errors surfaced by the interception layer.
///
/// The type is `Clone` so that a session which failed during its Main fetch
/// can replay the same failure to every later request.
#[derive(Error, Debug, Clone)]
pub enum SubstitchError {
    /// Upstream manifest fetch failed (network or non-2xx status)
    #[error("Upstream fetch failed: {0}")]
    Transport(Arc<FetchError>),

    /// Upstream manifest could not be rewritten
    #[error("Malformed manifest: {0}")]
    MalformedManifest(#[from] ManifestError),

    /// Fragments/Subtitles requested before the session cache was populated
    #[error("Session not ready: {0}")]
    NotReady(String),

    /// Inbound URL does not carry one of the reserved virtual schemes
    #[error("Invalid virtual URL: {0}")]
    InvalidVirtualUrl(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// User-supplied manifest or subtitle URL rejected
    #[error("Invalid origin: {0}")]
    InvalidOrigin(String),
}

impl From<FetchError> for SubstitchError {
    fn from(e: FetchError) -> Self {
        Self::Transport(Arc::new(e))
    }
}

impl SubstitchError {
    /// HTTP status reported to the request channel for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Transport(_) | Self::MalformedManifest(_) => StatusCode::BAD_GATEWAY,
            Self::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidVirtualUrl(_) | Self::InvalidOrigin(_) => StatusCode::BAD_REQUEST,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for SubstitchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        (status, format!("{}\n", self)).into_response()
    }
}

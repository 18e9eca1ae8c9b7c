use crate::{
    error::{Result, SubstitchError},
    hls::scheme::VirtualUrls,
    server::{
        state::AppState,
        url_validation::{validate_origin_url, validate_resource_url},
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Body of `POST /sessions`. Missing URLs fall back to the configured ones.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    pub manifest_url: Option<String>,
    pub subtitle_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub manifest_url: String,
    pub subtitle_url: String,
    #[serde(flatten)]
    pub urls: VirtualUrls,
}

/// Start a playback session.
///
/// A user-supplied manifest URL is fetched by this service, so it goes
/// through SSRF validation. The subtitle URL is only handed to the player and
/// merely has to be an absolute http(s) URL. Configured URLs are trusted.
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Response> {
    let manifest_url = match body.manifest_url {
        Some(url) => {
            validate_origin_url(&url)?;
            url
        }
        None => state.config.manifest_url.clone(),
    };
    let subtitle_url = match body.subtitle_url {
        Some(url) => {
            validate_resource_url(&url)?;
            url
        }
        None => state.config.subtitle_url.clone(),
    };

    let session = state.sessions.create(&manifest_url, &subtitle_url)?;
    info!("Created session {} -> {}", session.id(), session.urls().main_url);

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id().to_string(),
            manifest_url: session.manifest_url().to_string(),
            subtitle_url: session.subtitle_url().to_string(),
            urls: session.urls().clone(),
        }),
    )
        .into_response())
}

/// End a playback session
pub async fn end_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode> {
    state
        .sessions
        .remove(&session_id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(SubstitchError::SessionNotFound(session_id))
}

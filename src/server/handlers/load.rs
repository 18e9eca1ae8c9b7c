use crate::{error::Result, hls::scheme, metrics, server::state::AppState};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct LoadParams {
    /// Virtual URL the player asked for
    pub url: String,
}

/// Answer an intercepted manifest request.
///
/// The player-side loader forwards the virtual URL it was asked for; the
/// scheme token decides whether the master, rewritten media or subtitle
/// playlist is returned.
pub async fn load_resource(
    Path(session_id): Path<String>,
    Query(params): Query<LoadParams>,
    State(state): State<AppState>,
) -> Result<Response> {
    let start = Instant::now();
    let session = state.sessions.get(&session_id)?;
    let request = scheme::classify(&params.url)?;
    let endpoint = request.scheme.token();

    info!("Session {}: loading {}", session_id, params.url);

    match session.handle(&request).await {
        Ok(body) => {
            metrics::record_request(endpoint, 200);
            metrics::record_duration(endpoint, start);

            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/vnd.apple.mpegurl"),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                Body::from(body),
            )
                .into_response())
        }
        Err(e) => {
            metrics::record_request(endpoint, e.status_code().as_u16());
            metrics::record_duration(endpoint, start);
            Err(e)
        }
    }
}

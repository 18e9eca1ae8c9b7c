pub mod handlers;
pub mod state;
pub mod url_validation;

use crate::{config::Config, metrics};
use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use state::AppState;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

/// How often idle sessions are swept
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Build the Axum router with all routes and middleware.
///
/// Spawns the session sweeper, so it must be called from within a tokio runtime.
pub async fn build_router(config: Config) -> Router {
    metrics::init();

    let state = AppState::new(config);

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sessions.cleanup_expired();
            debug!("Session sweep: {} active", sessions.session_count());
        }
    });

    Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::serve_metrics))
        .route("/sessions", post(handlers::session::create_session))
        .route(
            "/sessions/{session_id}",
            delete(handlers::session::end_session),
        )
        .route(
            "/sessions/{session_id}/load",
            get(handlers::load::load_resource),
        )
        .route("/demo/playlist.m3u8", get(handlers::demo::serve_demo_playlist))
        .route("/demo/subtitles.vtt", get(handlers::demo::serve_demo_subtitles))
        .layer(middleware::from_fn(version_header))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Tag every response with the running version
async fn version_header(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response.headers_mut().insert(
        "x-substitch-version",
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}

/// Start the Axum HTTP server
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);

    let app = build_router(config).await;

    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("🚀 Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

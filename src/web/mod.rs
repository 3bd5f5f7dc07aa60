//! HTTP server: the chat page plus the JSON API it talks to.
//!
//! Every browser tab gets its own session. The page ends its session when
//! it is closed; sessions that go quiet are reaped in the background, and
//! all remaining sessions are ended on shutdown. Ending a session removes
//! its index.

mod handlers;

use crate::error::TubechatError;
use crate::orchestrator::Orchestrator;
use crate::session::SessionManager;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let idle_timeout =
            Duration::from_secs(orchestrator.settings().server.session_idle_timeout_secs);
        Self {
            orchestrator,
            sessions: SessionManager::new(idle_timeout),
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/sessions", post(handlers::create_session))
        .route(
            "/api/sessions/{id}",
            get(handlers::get_session).delete(handlers::end_session),
        )
        .route("/api/sessions/{id}/end", post(handlers::end_session))
        .route("/api/sessions/{id}/api-key", put(handlers::set_api_key))
        .route("/api/sessions/{id}/video", post(handlers::load_video))
        .route("/api/sessions/{id}/chat", post(handlers::chat))
        .route("/api/sessions/{id}/messages", get(handlers::messages))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until Ctrl+C, then end every session.
pub async fn serve(orchestrator: Orchestrator, host: &str, port: u16) -> anyhow::Result<()> {
    let reap_interval =
        Duration::from_secs(orchestrator.settings().server.reap_interval_secs.max(1));
    let state = Arc::new(AppState::new(orchestrator));

    let reaper = tokio::spawn(reap_idle_sessions(state.clone(), reap_interval));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.abort();
    info!("Ending {} open sessions", state.sessions.len());
    state.sessions.shutdown().await;

    Ok(())
}

async fn reap_idle_sessions(state: Arc<AppState>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        state.sessions.reap_idle().await;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// A `TubechatError` rendered as `{ "error": { "kind", "message" } }`.
pub struct ApiError(TubechatError);

impl From<TubechatError> for ApiError {
    fn from(err: TubechatError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            TubechatError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TubechatError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            TubechatError::TranscriptUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            TubechatError::Authentication(_) => StatusCode::UNAUTHORIZED,
            TubechatError::Generation(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        let body = serde_json::json!({
            "error": {
                "kind": self.0.kind(),
                "message": self.0.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

use super::handlers;
use super::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        // Transcription
        .route(
            "/v1/audio/transcriptions",
            post(handlers::transcribe_audio),
        )
        // Health belief, as seen by clients
        .route(
            "/v1/local_service_status",
            get(handlers::local_service_status),
        )
        // Daily usage counters
        .route("/usage", get(handlers::usage))
        // Audio uploads exceed the default multipart limit
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
